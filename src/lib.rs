//! hostbuild - Incremental RPM package builds
//!
//! This library builds sets of interdependent packages for a target Linux
//! distribution: it decides which packages need rebuilding, orders them by
//! dependency, drives each through an isolated mock build, and assembles
//! the results into a package repository.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Scheduling and orchestration logic
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;

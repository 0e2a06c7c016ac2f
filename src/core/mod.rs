//! Core business logic module
//!
//! Package scheduling and incremental-build orchestration. Process spawning
//! and other side effects are delegated to [`crate::infra`] through the
//! [`builder::Builder`], [`lock::LockManager`], and
//! [`rebuild::MetadataStore`] seams.
//!
//! # Submodules
//!
//! - [`distro`] - Target distribution identity and support checks
//! - [`package`] - Package definitions and the runtime package entity
//! - [`packages_manager`] - Package set construction and dependency expansion
//! - [`scheduler`] - Dependency-ordered build batches
//! - [`rebuild`] - Rebuild-need evaluation and build records
//! - [`lifecycle`] - Per-package lifecycle states
//! - [`lock`] - Per-package lock guard
//! - [`builder`] - Builder interface and registry
//! - [`build_manager`] - Build run orchestration
//! - [`report`] - Run reports
//! - [`config`] - `hostbuild.toml` configuration

pub mod build_manager;
pub mod builder;
pub mod config;
pub mod distro;
pub mod lifecycle;
pub mod lock;
pub mod package;
pub mod packages_manager;
pub mod rebuild;
pub mod report;
pub mod scheduler;

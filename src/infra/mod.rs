//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, and external processes.
//! This module is the only place where side effects occur.

pub mod detect;
pub mod dirs;
pub mod download;
pub mod filesystem;
pub mod fingerprint;
pub mod lock;
pub mod metadata;
pub mod mock;
pub mod sources;

//! Error types for hostbuild
//!
//! Domain-specific error types using thiserror. Errors that end a run are
//! collected under [`RunError`]; per-package failures never propagate as
//! errors and are recorded in the build report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Target distribution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// Distribution family is not supported at all
    #[error("Distribution '{name}' is not supported (supported: {})", supported.join(", "))]
    NotSupported { name: String, supported: Vec<String> },

    /// Family is supported but this version is not
    #[error("Version '{version}' of distribution '{name}' is not supported (supported: {})", supported.join(", "))]
    VersionNotSupported {
        name: String,
        version: String,
        supported: Vec<String>,
    },

    /// Host distribution could not be determined
    #[error("Failed to detect host distribution: {reason}")]
    Detection { reason: String },

    /// Malformed `name:version:arch` triple
    #[error("Invalid distribution '{value}': expected NAME:VERSION:ARCH")]
    InvalidFormat { value: String },
}

/// Package definition errors
#[derive(Error, Debug)]
pub enum PackageError {
    /// No definition in the versions repository
    #[error("Package '{name}' not found at {}", path.display())]
    NotFound { name: String, path: PathBuf },

    /// Definition could not be read
    #[error("Failed to read package '{name}': {error}")]
    ReadError { name: String, error: String },

    /// Definition is not valid TOML or misses fields
    #[error("Failed to parse package '{name}': {error}")]
    ParseError { name: String, error: String },

    /// Definition name differs from its directory name
    #[error("Package definition at '{name}' declares name '{declared}'")]
    NameMismatch { name: String, declared: String },

    /// Package has no build files for the target distribution
    #[error("Package '{package}' does not support distribution {distro}")]
    DistroNotSupported { package: String, distro: String },

    /// Declared local source path does not exist
    #[error("Source path '{}' of package '{package}' does not exist", path.display())]
    SourceMissing { package: String, path: PathBuf },
}

/// Build ordering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Dependency outside the package set
    #[error("Missing dependency: '{dependency}' required by '{package}'")]
    MissingDependency { package: String, dependency: String },

    /// Two packages share a name
    #[error("Package '{name}' appears more than once in the build set")]
    DuplicatePackage { name: String },
}

impl SchedulerError {
    /// Distinct package names implicated in a cycle, sorted
    pub fn cycle_members(&self) -> Vec<String> {
        match self {
            Self::CircularDependency { cycle } => {
                let mut members: Vec<String> = cycle.clone();
                members.sort();
                members.dedup();
                members
            }
            _ => Vec::new(),
        }
    }
}

/// Local configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No build environment definition for the distribution
    #[error("Build environment definition for {distro} not found at {}", path.display())]
    MissingEnvironment { distro: String, path: PathBuf },

    /// No builder registered for the distribution family
    #[error("No builder registered for distribution '{name}'")]
    NoBuilder { name: String },

    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Per-package lock errors
#[derive(Error, Debug)]
pub enum LockError {
    /// Another process holds the package lock
    #[error("Package '{package}' is locked by another build ({})", path.display())]
    Contention { package: String, path: PathBuf },

    /// IO error on the lock file
    #[error("Lock IO error for '{}': {error}", path.display())]
    Io { path: PathBuf, error: String },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum verification failed for '{file}'")]
    ChecksumFailed { file: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded { url: String, retries: u32 },
}

/// Source staging errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Copying local sources failed
    #[error("Failed to stage '{}': {error}", path.display())]
    Io { path: PathBuf, error: String },

    /// Fetching a remote source failed
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Builder errors
#[derive(Error, Debug)]
pub enum BuilderError {
    /// External tool missing from PATH
    #[error("Tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// External command exited unsuccessfully
    #[error("Command '{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Command could not be spawned
    #[error("Failed to run '{command}': {error}")]
    Spawn { command: String, error: String },

    /// Build produced no artifacts
    #[error("No artifacts for package '{package}' in {}", dir.display())]
    NoArtifacts { package: String, dir: PathBuf },

    /// Step called out of order
    #[error("Package '{package}' has no prepared sources")]
    NotPrepared { package: String },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Build record store errors
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Store could not be read
    #[error("Failed to read build records '{}': {error}", path.display())]
    Read { path: PathBuf, error: String },

    /// Store contents are malformed
    #[error("Failed to parse build records '{}': {error}", path.display())]
    Parse { path: PathBuf, error: String },

    /// Store could not be written
    #[error("Failed to write build records '{}': {error}", path.display())]
    Write { path: PathBuf, error: String },
}

/// Errors that end a build run before or outside per-package work
#[derive(Error, Debug)]
pub enum RunError {
    /// Unsupported or undetectable distribution
    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    /// Package definitions could not be loaded
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Dependency cycle or incomplete package set
    #[error("Scheduling error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Local configuration problem
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build records could not be read
    #[error("Build record error: {0}")]
    Metadata(#[from] MetadataError),

    /// Builder environment setup failed
    #[error("Failed to initialize builder: {0}")]
    Initialize(#[source] BuilderError),
}

//! Platform-specific directory management
//!
//! Provides default locations for work, lock, result, and state
//! directories, following the XDG Base Directory Specification.
//!
//! Environment variables can override default directories:
//! - `HOSTBUILD_CACHE_DIR` - Override cache directory
//! - `HOSTBUILD_CONFIG_DIR` - Override config directory
//! - `HOSTBUILD_DATA_DIR` - Override data directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "HOSTBUILD_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "HOSTBUILD_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "HOSTBUILD_DATA_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "hostbuild";

/// Subdirectory names
const WORK_SUBDIR: &str = "work";
const LOCKS_SUBDIR: &str = "locks";
const RESULT_SUBDIR: &str = "result";
const STATE_SUBDIR: &str = "state";

/// Platform-specific directory provider for hostbuild
#[derive(Debug, Clone)]
pub struct HostbuildDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl HostbuildDirs {
    /// Create a new `HostbuildDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::resolve(ENV_CACHE_DIR, dirs::cache_dir(), &[".cache"]),
            config_dir: Self::resolve(ENV_CONFIG_DIR, dirs::config_dir(), &[".config"]),
            data_dir: Self::resolve(ENV_DATA_DIR, dirs::data_dir(), &[".local", "share"]),
        }
    }

    /// Cache directory, for data that can be regenerated
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Config directory
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Data directory, for results and build records
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Transient build state (staged sources, builder scratch space)
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.cache_dir.join(WORK_SUBDIR)
    }

    /// Per-package lock files
    #[must_use]
    pub fn lock_dir(&self) -> PathBuf {
        self.cache_dir.join(LOCKS_SUBDIR)
    }

    /// Timestamped run results and the `latest` pointer
    #[must_use]
    pub fn result_dir(&self) -> PathBuf {
        self.data_dir.join(RESULT_SUBDIR)
    }

    /// Build records
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join(STATE_SUBDIR)
    }

    /// Default config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("hostbuild.toml")
    }

    /// Resolve a directory from its environment override or platform default
    fn resolve(var: &str, platform: Option<PathBuf>, home_fallback: &[&str]) -> PathBuf {
        if let Ok(path) = env::var(var) {
            return PathBuf::from(path);
        }

        platform.map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
            let mut base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            for part in home_fallback {
                base.push(part);
            }
            base.join(APP_NAME)
        })
    }
}

impl Default for HostbuildDirs {
    fn default() -> Self {
        Self::new()
    }
}

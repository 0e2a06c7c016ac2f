//! Build configuration
//!
//! Reads `hostbuild.toml`. The loaded value is passed explicitly to the
//! packages manager and build manager; there is no process-wide config.
//! Relative paths are resolved against the directory holding the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::defaults;
use crate::error::ConfigError;
use crate::infra::dirs::HostbuildDirs;

/// Configuration for hostbuild
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Build policy
    #[serde(default)]
    pub build: BuildSection,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsSection,

    /// Mock builder settings
    #[serde(default)]
    pub mock: MockSection,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Build policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSection {
    /// Packages built when none are named on the command line
    #[serde(default)]
    pub packages: Vec<String>,

    /// Rebuild every package regardless of build records
    pub force_rebuild: Option<bool>,

    /// Rebuild these packages regardless of build records
    #[serde(default)]
    pub force_rebuild_packages: Vec<String>,

    /// Continue with independent packages after a failure
    pub keep_going: Option<bool>,

    /// Time limit for each per-package build step
    pub step_timeout_secs: Option<u64>,
}

/// Input and output locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    /// Package definitions
    pub versions_repo: Option<PathBuf>,
    /// Build environment definitions
    pub mock_config_dir: Option<PathBuf>,
    /// Transient build state
    pub work_dir: Option<PathBuf>,
    /// Run results
    pub result_dir: Option<PathBuf>,
    /// Package locks
    pub lock_dir: Option<PathBuf>,
    /// Build records
    pub state_dir: Option<PathBuf>,
}

/// Mock builder settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockSection {
    /// Mock executable
    pub binary: Option<String>,
    /// Repository metadata generator
    pub createrepo_binary: Option<String>,
    /// Extra arguments passed to every mock invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Which packages skip rebuild-need evaluation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForceRebuild {
    /// Evaluate every package
    #[default]
    None,
    /// Rebuild every package
    All,
    /// Rebuild only these packages
    Only(BTreeSet<String>),
}

impl ForceRebuild {
    /// Whether the policy forces `name` to rebuild
    pub fn applies_to(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    ///
    /// If the file doesn't exist, returns the default configuration rooted
    /// at the file's directory.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if !path.exists() {
            return Ok(Self::default().with_base_dir(base_dir));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Ok(config.with_base_dir(base_dir))
    }

    /// Set the directory relative paths are resolved against
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: PathBuf) -> Self {
        self.base_dir = base_dir;
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn resolve_or(&self, path: Option<&PathBuf>, default: impl FnOnce() -> PathBuf) -> PathBuf {
        path.map_or_else(default, |p| self.resolve(p))
    }

    /// Effective force-rebuild policy
    ///
    /// The global flag wins over the per-package list.
    #[must_use]
    pub fn force_rebuild(&self) -> ForceRebuild {
        if self.build.force_rebuild.unwrap_or(false) {
            ForceRebuild::All
        } else if self.build.force_rebuild_packages.is_empty() {
            ForceRebuild::None
        } else {
            ForceRebuild::Only(self.build.force_rebuild_packages.iter().cloned().collect())
        }
    }

    /// Whether to continue after a package fails (default: true)
    #[must_use]
    pub fn keep_going(&self) -> bool {
        self.build.keep_going.unwrap_or(true)
    }

    /// Per-step time limit, if any
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        self.build
            .step_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Package definitions directory
    #[must_use]
    pub fn versions_repo(&self) -> PathBuf {
        self.resolve_or(self.paths.versions_repo.as_ref(), || {
            self.base_dir.join(defaults::VERSIONS_REPO)
        })
    }

    /// Build environment definitions directory
    #[must_use]
    pub fn mock_config_dir(&self) -> PathBuf {
        self.resolve_or(self.paths.mock_config_dir.as_ref(), || {
            self.base_dir.join(defaults::MOCK_CONFIG_DIR)
        })
    }

    /// Transient build state directory
    #[must_use]
    pub fn work_dir(&self, dirs: &HostbuildDirs) -> PathBuf {
        self.resolve_or(self.paths.work_dir.as_ref(), || dirs.work_dir())
    }

    /// Run results directory
    #[must_use]
    pub fn result_dir(&self, dirs: &HostbuildDirs) -> PathBuf {
        self.resolve_or(self.paths.result_dir.as_ref(), || dirs.result_dir())
    }

    /// Package lock directory
    #[must_use]
    pub fn lock_dir(&self, dirs: &HostbuildDirs) -> PathBuf {
        self.resolve_or(self.paths.lock_dir.as_ref(), || dirs.lock_dir())
    }

    /// Build record directory
    #[must_use]
    pub fn state_dir(&self, dirs: &HostbuildDirs) -> PathBuf {
        self.resolve_or(self.paths.state_dir.as_ref(), || dirs.state_dir())
    }

    /// Mock executable
    #[must_use]
    pub fn mock_binary(&self) -> &str {
        self.mock.binary.as_deref().unwrap_or(defaults::MOCK_BINARY)
    }

    /// Repository metadata generator
    #[must_use]
    pub fn createrepo_binary(&self) -> &str {
        self.mock
            .createrepo_binary
            .as_deref()
            .unwrap_or(defaults::CREATEREPO_BINARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.build.packages.is_empty());
        assert_eq!(config.force_rebuild(), ForceRebuild::None);
        assert!(config.keep_going());
        assert!(config.step_timeout().is_none());
        assert_eq!(config.mock_binary(), "mock");
        assert_eq!(config.createrepo_binary(), "createrepo");
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hostbuild.toml");

        let config = Config::load_from_path(&config_path).unwrap();
        assert!(config.build.packages.is_empty());
        assert_eq!(config.versions_repo(), temp_dir.path().join("versions"));
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hostbuild.toml");

        let content = r#"
[build]
packages = ["kernel", "qemu"]
force_rebuild_packages = ["qemu"]
keep_going = false
step_timeout_secs = 3600

[paths]
versions_repo = "repo"
result_dir = "/srv/results"

[mock]
binary = "/usr/bin/mock"
extra_args = ["--verbose"]
"#;
        fs::write(&config_path, content).unwrap();

        let config = Config::load_from_path(&config_path).unwrap();
        assert_eq!(config.build.packages, vec!["kernel", "qemu"]);
        assert!(config.force_rebuild().applies_to("qemu"));
        assert!(!config.force_rebuild().applies_to("kernel"));
        assert!(!config.keep_going());
        assert_eq!(config.step_timeout(), Some(Duration::from_secs(3600)));
        assert_eq!(config.versions_repo(), temp_dir.path().join("repo"));
        assert_eq!(
            config.result_dir(&HostbuildDirs::new()),
            PathBuf::from("/srv/results")
        );
        assert_eq!(config.mock_binary(), "/usr/bin/mock");
        assert_eq!(config.mock.extra_args, vec!["--verbose"]);
    }

    #[test]
    fn test_global_force_wins_over_list() {
        let mut config = Config::default();
        config.build.force_rebuild = Some(true);
        config.build.force_rebuild_packages = vec!["qemu".to_string()];
        assert_eq!(config.force_rebuild(), ForceRebuild::All);
        assert!(config.force_rebuild().applies_to("anything"));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let mut config = Config::default();
        config.build.step_timeout_secs = Some(0);
        assert!(config.step_timeout().is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hostbuild.toml");

        fs::write(&config_path, "invalid toml [[[").unwrap();

        assert!(matches!(
            Config::load_from_path(&config_path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}

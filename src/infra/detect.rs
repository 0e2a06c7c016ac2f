//! Host distribution detection
//!
//! Reads `ID` and `VERSION_ID` from os-release and the machine architecture
//! from the running binary's target.

use std::path::PathBuf;

use crate::core::distro::Distribution;
use crate::error::DistributionError;

/// Default os-release location
pub const OS_RELEASE: &str = "/etc/os-release";

/// Fallback os-release location
const OS_RELEASE_FALLBACK: &str = "/usr/lib/os-release";

/// Determines the distribution builds target by default
pub trait DistroDetector {
    /// Detect the host distribution
    fn detect(&self) -> Result<Distribution, DistributionError>;
}

/// Detection from an os-release file
#[derive(Debug, Clone)]
pub struct OsReleaseDetector {
    paths: Vec<PathBuf>,
    arch: String,
}

impl OsReleaseDetector {
    /// Detector reading the standard os-release locations
    pub fn new() -> Self {
        Self {
            paths: vec![PathBuf::from(OS_RELEASE), PathBuf::from(OS_RELEASE_FALLBACK)],
            arch: host_arch(),
        }
    }

    /// Detector reading a specific file with a fixed architecture
    pub fn with_path(path: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            arch: arch.into(),
        }
    }
}

impl Default for OsReleaseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DistroDetector for OsReleaseDetector {
    fn detect(&self) -> Result<Distribution, DistributionError> {
        let path = self
            .paths
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| DistributionError::Detection {
                reason: format!("no os-release file found (tried {})", display_paths(&self.paths)),
            })?;

        let content = std::fs::read_to_string(path).map_err(|e| DistributionError::Detection {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let distro = detect_from(&content, &self.arch)?;
        tracing::debug!("Detected distribution {distro} from {}", path.display());
        Ok(distro)
    }
}

/// Parse os-release content into a distribution for `arch`
pub fn detect_from(content: &str, arch: &str) -> Result<Distribution, DistributionError> {
    let mut id = None;
    let mut version = None;

    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        match key {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version = Some(value.to_string()),
            _ => {}
        }
    }

    let missing = |key: &str| DistributionError::Detection {
        reason: format!("os-release has no {key}"),
    };
    let id = id.filter(|v| !v.is_empty()).ok_or_else(|| missing("ID"))?;
    let version = version
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing("VERSION_ID"))?;

    Ok(Distribution::new(id, version, arch))
}

/// RPM architecture name of the running binary's target
pub fn host_arch() -> String {
    match std::env::consts::ARCH {
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le".to_string(),
        "powerpc64" => "ppc64".to_string(),
        other => other.to_string(),
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

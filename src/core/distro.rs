//! Target distribution identity
//!
//! A [`Distribution`] names the family, version, and architecture a build is
//! performed for. Only the families in [`DistroFamily`] are supported, each
//! with a fixed set of versions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DistributionError;

/// Supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    /// `CentOS` Linux
    CentOs,
    /// Fedora
    Fedora,
}

impl DistroFamily {
    /// All supported families
    pub const ALL: [DistroFamily; 2] = [DistroFamily::CentOs, DistroFamily::Fedora];

    /// Canonical lowercase name, as found in os-release `ID`
    pub fn name(self) -> &'static str {
        match self {
            Self::CentOs => "centos",
            Self::Fedora => "fedora",
        }
    }

    /// Versions this family is supported at
    pub fn supported_versions(self) -> &'static [&'static str] {
        match self {
            Self::CentOs => &["7"],
            Self::Fedora => &["26", "27", "28"],
        }
    }

    /// Look a family up by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.name() == lower)
    }
}

impl fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A target Linux distribution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Distribution {
    /// Family name (e.g. "centos")
    pub name: String,
    /// Release version (e.g. "7")
    pub version: String,
    /// Machine architecture (e.g. "ppc64le")
    pub architecture: String,
}

impl Distribution {
    /// Create a distribution identity
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        architecture: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            version: version.into(),
            architecture: architecture.into(),
        }
    }

    /// Check that this distribution is supported and return its family
    ///
    /// An unknown family and a known family at an unknown version are
    /// reported as distinct errors.
    pub fn validate(&self) -> Result<DistroFamily, DistributionError> {
        let family =
            DistroFamily::from_name(&self.name).ok_or_else(|| DistributionError::NotSupported {
                name: self.name.clone(),
                supported: DistroFamily::ALL
                    .iter()
                    .map(|f| f.name().to_string())
                    .collect(),
            })?;

        if !family.supported_versions().contains(&self.version.as_str()) {
            return Err(DistributionError::VersionNotSupported {
                name: self.name.clone(),
                version: self.version.clone(),
                supported: family
                    .supported_versions()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }

        Ok(family)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.version, self.architecture)
    }
}

impl FromStr for Distribution {
    type Err = DistributionError;

    /// Parse `NAME:VERSION:ARCH`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [name, version, arch] if !name.is_empty() && !version.is_empty() && !arch.is_empty() => {
                Ok(Self::new(*name, *version, *arch))
            }
            _ => Err(DistributionError::InvalidFormat {
                value: s.to_string(),
            }),
        }
    }
}

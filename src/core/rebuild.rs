//! Rebuild-need evaluation
//!
//! A package needs rebuilding when there is no record of a previous
//! successful build, or when the recorded fingerprint or distribution
//! differs from the current one. The force-rebuild flag overrides the
//! computed answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::distro::Distribution;
use crate::core::package::Package;
use crate::error::MetadataError;

/// Record of a successful package build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Package name
    pub name: String,
    /// Version that was built
    pub version: String,
    /// Release that was built
    pub release: String,
    /// Source fingerprint at build time
    pub fingerprint: String,
    /// Distribution built for
    pub distro: Distribution,
    /// When the build finished
    pub built_at: DateTime<Utc>,
    /// Run timestamp tag
    pub run: String,
}

/// Lookup of prior build records
pub trait MetadataStore: Send + Sync {
    /// Last successful build of `name`
    fn lookup(&self, name: &str) -> Result<Option<BuildRecord>, MetadataError>;

    /// Store the record of a successful build
    fn record(&self, record: BuildRecord) -> Result<(), MetadataError>;
}

/// Why a package is rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    /// Force-rebuild flag set
    Forced,
    /// No previous build on record
    NeverBuilt,
    /// Source fingerprint changed
    SourcesChanged,
    /// Last build was for another distribution
    DistroChanged,
}

impl std::fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Forced => "forced",
            Self::NeverBuilt => "never built",
            Self::SourcesChanged => "sources changed",
            Self::DistroChanged => "distribution changed",
        };
        f.write_str(text)
    }
}

/// Outcome of rebuild-need evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildDecision {
    /// Build the package
    Rebuild(RebuildReason),
    /// Outputs are current
    UpToDate,
}

impl RebuildDecision {
    /// Whether the package will be built
    pub fn is_rebuild(self) -> bool {
        matches!(self, Self::Rebuild(_))
    }
}

/// Compare the package's current state with its last build record
///
/// Ignores the force-rebuild flag.
pub fn needs_rebuild(package: &Package, distro: &Distribution) -> Option<RebuildReason> {
    let Some(record) = package.last_build.as_ref() else {
        return Some(RebuildReason::NeverBuilt);
    };
    if &record.distro != distro {
        return Some(RebuildReason::DistroChanged);
    }
    if record.fingerprint != package.fingerprint {
        return Some(RebuildReason::SourcesChanged);
    }
    None
}

/// Decide whether to build the package, honoring force-rebuild
pub fn evaluate(package: &Package, distro: &Distribution) -> RebuildDecision {
    if package.force_rebuild {
        tracing::info!("{}: Forcing rebuild.", package.name);
        return RebuildDecision::Rebuild(RebuildReason::Forced);
    }
    match needs_rebuild(package, distro) {
        Some(reason) => {
            tracing::debug!("{}: rebuild needed ({reason})", package.name);
            RebuildDecision::Rebuild(reason)
        }
        None => RebuildDecision::UpToDate,
    }
}

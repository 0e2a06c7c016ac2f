//! Package definition handling
//!
//! Parses `package.toml` files from the versions repository and holds the
//! runtime [`Package`] entity that the scheduler orders and the build
//! manager carries through its lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::distro::Distribution;
use crate::core::lifecycle::PackageStatus;
use crate::core::rebuild::BuildRecord;

/// Complete package definition as stored in `<repo>/<name>/package.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageDefinition {
    /// Package metadata
    pub package: PackageMetadata,

    /// Source files, staged before the build
    #[serde(default)]
    pub sources: Vec<SourceSpec>,

    /// Build files per distribution family
    #[serde(default)]
    pub distros: BTreeMap<String, DistroTarget>,
}

/// Package metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,

    /// Upstream version
    pub version: String,

    /// Package release
    #[serde(default = "default_release")]
    pub release: String,

    /// Package description
    #[serde(default)]
    pub description: Option<String>,

    /// Packages that must be built before this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Always rebuild this package
    #[serde(default)]
    pub force_rebuild: bool,
}

fn default_release() -> String {
    "1".to_string()
}

/// A single source entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SourceSpec {
    /// Remote archive with checksum
    Url { url: String, sha256: String },

    /// File or directory relative to the package directory
    Local { path: PathBuf },
}

/// Build files for one distribution family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistroTarget {
    /// Supported versions of the family
    pub versions: Vec<String>,

    /// RPM spec file, relative to the package directory
    pub spec: PathBuf,
}

impl PackageDefinition {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Build files for the given distribution, if the package supports it
    pub fn target_for(&self, distro: &Distribution) -> Option<&DistroTarget> {
        self.distros
            .get(&distro.name)
            .filter(|target| target.versions.iter().any(|v| v == &distro.version))
    }
}

/// Where a package's sources come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Package directory in the versions repository
    pub package_dir: PathBuf,
    /// RPM spec file for the target distribution
    pub spec_file: PathBuf,
    /// Declared sources
    pub sources: Vec<SourceSpec>,
}

impl SourceLocation {
    /// Create a source location
    pub fn new(package_dir: PathBuf, spec_file: PathBuf, sources: Vec<SourceSpec>) -> Self {
        Self {
            package_dir,
            spec_file,
            sources,
        }
    }

    /// Absolute paths of local sources
    pub fn local_paths(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .filter_map(|s| match s {
                SourceSpec::Local { path } => Some(self.resolve(path)),
                SourceSpec::Url { .. } => None,
            })
            .collect()
    }

    /// Resolve a path relative to the package directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.package_dir.join(path)
        }
    }
}

/// One buildable unit within a build run
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Unique name within the run
    pub name: String,
    /// Upstream version
    pub version: String,
    /// Package release
    pub release: String,
    /// Names of packages built before this one (sorted, deduplicated)
    pub dependencies: Vec<String>,
    /// Skip rebuild-need evaluation and always build
    pub force_rebuild: bool,
    /// Source location
    pub source: SourceLocation,
    /// Content fingerprint of the current sources
    pub fingerprint: String,
    /// Record of the last successful build, if any
    pub last_build: Option<BuildRecord>,
    status: PackageStatus,
}

impl Package {
    /// Create a package with no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: default_release(),
            dependencies: Vec::new(),
            force_rebuild: false,
            source: SourceLocation::default(),
            fingerprint: String::new(),
            last_build: None,
            status: PackageStatus::Pending,
        }
    }

    /// Set the release
    #[must_use]
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = release.into();
        self
    }

    /// Set the dependencies
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deps: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        deps.sort();
        deps.dedup();
        self.dependencies = deps;
        self
    }

    /// Set the force-rebuild flag
    #[must_use]
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }

    /// Set the source location
    #[must_use]
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }

    /// Set the current source fingerprint
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Set the last build record
    #[must_use]
    pub fn with_last_build(mut self, record: Option<BuildRecord>) -> Self {
        self.last_build = record;
        self
    }

    /// `name-version-release`
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// Current lifecycle state
    pub fn status(&self) -> &PackageStatus {
        &self.status
    }

    /// Move to the next lifecycle state
    pub(crate) fn advance(&mut self, next: PackageStatus) {
        debug_assert!(
            self.status.can_advance_to(&next),
            "invalid transition for {}: {} -> {}",
            self.name,
            self.status,
            next
        );
        tracing::debug!("{}: {} -> {}", self.name, self.status, next);
        self.status = next;
    }
}

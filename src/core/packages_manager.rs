//! Package set construction
//!
//! Turns requested package names into [`Package`] values for one target
//! distribution. Dependencies are pulled in breadth-first and deduplicated
//! by name; the result is sorted by name so that expansion does not depend
//! on request order.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::defaults;
use crate::core::config::ForceRebuild;
use crate::core::distro::Distribution;
use crate::core::package::{Package, PackageDefinition, SourceLocation};
use crate::core::rebuild::MetadataStore;
use crate::error::{PackageError, RunError};
use crate::infra::fingerprint::fingerprint;

/// Loads package definitions from the versions repository
pub struct PackagesManager {
    versions_repo: PathBuf,
    force: ForceRebuild,
    store: Arc<dyn MetadataStore>,
}

impl PackagesManager {
    /// Create a packages manager
    pub fn new(versions_repo: PathBuf, force: ForceRebuild, store: Arc<dyn MetadataStore>) -> Self {
        Self {
            versions_repo,
            force,
            store,
        }
    }

    /// Versions repository root
    pub fn versions_repo(&self) -> &Path {
        &self.versions_repo
    }

    /// Build the package set for `names` and their transitive dependencies
    ///
    /// Fails before touching any package definition if the distribution is
    /// not supported.
    pub fn prepare(
        &self,
        names: &[String],
        distro: &Distribution,
    ) -> Result<Vec<Package>, RunError> {
        distro.validate()?;

        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        let mut queue: VecDeque<String> = names.iter().cloned().collect();

        while let Some(name) = queue.pop_front() {
            if packages.contains_key(&name) {
                continue;
            }
            let package = self.load(&name, distro)?;
            for dependency in &package.dependencies {
                if !packages.contains_key(dependency) {
                    queue.push_back(dependency.clone());
                }
            }
            packages.insert(name, package);
        }

        tracing::debug!(
            "Prepared {} packages for {distro} ({} requested)",
            packages.len(),
            names.len()
        );
        Ok(packages.into_values().collect())
    }

    /// Load one package definition for `distro`
    pub fn load(&self, name: &str, distro: &Distribution) -> Result<Package, RunError> {
        let package_dir = self.versions_repo.join(name);
        let path = package_dir.join(defaults::PACKAGE_FILE_NAME);
        if name.is_empty() || name.contains(['/', '\\']) || !path.is_file() {
            return Err(PackageError::NotFound {
                name: name.to_string(),
                path,
            }
            .into());
        }

        let content = std::fs::read(&path).map_err(|e| PackageError::ReadError {
            name: name.to_string(),
            error: e.to_string(),
        })?;
        let text = String::from_utf8_lossy(&content);
        let definition =
            PackageDefinition::from_toml(&text).map_err(|e| PackageError::ParseError {
                name: name.to_string(),
                error: e.to_string(),
            })?;

        if definition.package.name != name {
            return Err(PackageError::NameMismatch {
                name: name.to_string(),
                declared: definition.package.name,
            }
            .into());
        }

        let target = definition
            .target_for(distro)
            .ok_or_else(|| PackageError::DistroNotSupported {
                package: name.to_string(),
                distro: distro.to_string(),
            })?;

        let source = SourceLocation::new(
            package_dir.clone(),
            package_dir.join(&target.spec),
            definition.sources.clone(),
        );
        for required in std::iter::once(source.spec_file.clone()).chain(source.local_paths()) {
            if !required.exists() {
                return Err(PackageError::SourceMissing {
                    package: name.to_string(),
                    path: required,
                }
                .into());
            }
        }

        let fingerprint = fingerprint(&content, &source).map_err(|e| PackageError::ReadError {
            name: name.to_string(),
            error: e.to_string(),
        })?;
        let last_build = self.store.lookup(name)?;
        let force = definition.package.force_rebuild || self.force.applies_to(name);

        Ok(Package::new(name, definition.package.version)
            .with_release(definition.package.release)
            .with_dependencies(definition.package.dependencies)
            .with_force_rebuild(force)
            .with_source(source)
            .with_fingerprint(fingerprint)
            .with_last_build(last_build))
    }
}

impl std::fmt::Debug for PackagesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagesManager")
            .field("versions_repo", &self.versions_repo)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

//! Builder interface and selection
//!
//! A [`Builder`] performs the distribution-specific mechanics of a run.
//! The [`BuilderRegistry`] maps distribution family names to factories, so
//! selection is an explicit lookup keyed by the target distribution.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::distro::Distribution;
use crate::core::package::Package;
use crate::error::{BuilderError, ConfigError};
use crate::infra::sources::StagedSources;

/// Distribution-specific build mechanics for one run
///
/// Methods are called in this order: `initialize` once, then per package
/// `prepare_sources`, `build`, `copy_results` (skipped packages only get
/// `copy_results`), and finally `create_repository`, `publish_latest` and
/// `clean`.
#[async_trait]
pub trait Builder: Send {
    /// Set up the build environment once for the whole run
    async fn initialize(&mut self) -> Result<(), BuilderError>;

    /// Turn staged sources into build input
    async fn prepare_sources(
        &mut self,
        package: &Package,
        staged: &StagedSources,
    ) -> Result<(), BuilderError>;

    /// Compile and package one package
    async fn build(&mut self, package: &Package) -> Result<(), BuilderError>;

    /// Copy the package's artifacts into the run result directory
    async fn copy_results(&mut self, package: &Package) -> Result<(), BuilderError>;

    /// Generate repository metadata for the run result directory
    async fn create_repository(&mut self) -> Result<(), BuilderError>;

    /// Point the "latest" link at this run's result directory
    async fn publish_latest(&mut self) -> Result<(), BuilderError>;

    /// Remove transient build state
    async fn clean(&mut self) -> Result<(), BuilderError>;
}

/// Run-scoped inputs shared by every builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderContext {
    /// Target distribution
    pub distro: Distribution,
    /// Run timestamp, tags the result directory
    pub timestamp: String,
    /// Transient build state
    pub work_dir: PathBuf,
    /// Parent of per-run result directories
    pub result_dir: PathBuf,
}

impl BuilderContext {
    /// This run's result directory
    pub fn run_dir(&self) -> PathBuf {
        self.result_dir.join(&self.timestamp)
    }
}

/// Creates a builder for a run, or reports a local configuration problem
pub type BuilderFactory =
    Box<dyn Fn(&BuilderContext) -> Result<Box<dyn Builder>, ConfigError> + Send + Sync>;

/// Builder factories keyed by distribution family name
#[derive(Default)]
pub struct BuilderRegistry {
    factories: BTreeMap<String, BuilderFactory>,
}

impl BuilderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a distribution family, replacing any earlier one
    pub fn register<F>(&mut self, family: &str, factory: F)
    where
        F: Fn(&BuilderContext) -> Result<Box<dyn Builder>, ConfigError> + Send + Sync + 'static,
    {
        self.factories
            .insert(family.to_ascii_lowercase(), Box::new(factory));
    }

    /// Registered family names, sorted
    pub fn families(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Create the builder for the context's distribution
    pub fn select(&self, context: &BuilderContext) -> Result<Box<dyn Builder>, ConfigError> {
        let factory =
            self.factories
                .get(&context.distro.name)
                .ok_or_else(|| ConfigError::NoBuilder {
                    name: context.distro.name.clone(),
                })?;
        tracing::debug!("Selected builder for {}", context.distro);
        factory(context)
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("families", &self.families())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Builder for Noop {
        async fn initialize(&mut self) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn prepare_sources(
            &mut self,
            _package: &Package,
            _staged: &StagedSources,
        ) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn build(&mut self, _package: &Package) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn copy_results(&mut self, _package: &Package) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn create_repository(&mut self) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn publish_latest(&mut self) -> Result<(), BuilderError> {
            Ok(())
        }
        async fn clean(&mut self) -> Result<(), BuilderError> {
            Ok(())
        }
    }

    fn context(name: &str) -> BuilderContext {
        BuilderContext {
            distro: Distribution::new(name, "7", "ppc64le"),
            timestamp: "2017-03-01T101500".to_string(),
            work_dir: PathBuf::from("/work"),
            result_dir: PathBuf::from("/result"),
        }
    }

    #[test]
    fn test_select_registered_family() {
        let mut registry = BuilderRegistry::new();
        registry.register("CentOS", |_| -> Result<Box<dyn Builder>, ConfigError> {
            Ok(Box::new(Noop))
        });

        assert_eq!(registry.families(), vec!["centos"]);
        assert!(registry.select(&context("centos")).is_ok());
    }

    #[test]
    fn test_unknown_family_is_no_builder() {
        let registry = BuilderRegistry::new();
        assert!(matches!(
            registry.select(&context("fedora")),
            Err(ConfigError::NoBuilder { name }) if name == "fedora"
        ));
    }

    #[test]
    fn test_factory_error_is_returned() {
        let mut registry = BuilderRegistry::new();
        registry.register("centos", |ctx| {
            Err(ConfigError::MissingEnvironment {
                distro: ctx.distro.to_string(),
                path: PathBuf::from("/missing.cfg"),
            })
        });
        assert!(matches!(
            registry.select(&context("centos")),
            Err(ConfigError::MissingEnvironment { .. })
        ));
    }

    #[test]
    fn test_run_dir_is_tagged_with_timestamp() {
        assert_eq!(
            context("centos").run_dir(),
            PathBuf::from("/result/2017-03-01T101500")
        );
    }
}

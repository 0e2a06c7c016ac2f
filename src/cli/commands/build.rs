//! Build command implementation
//!
//! Implements `hostbuild build`: wires the file-backed collaborators into a
//! [`BuildManager`], runs it, and prints the report.

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use crate::cli::commands::{package_names, resolve_distro};
use crate::cli::output::{self, OutputConfig};
use crate::core::build_manager::{BuildManager, BuildOptions, BuildPaths};
use crate::core::builder::BuilderRegistry;
use crate::core::config::Config;
use crate::core::distro::Distribution;
use crate::core::packages_manager::PackagesManager;
use crate::core::rebuild::MetadataStore;
use crate::core::report::RunOutcome;
use crate::infra::dirs::HostbuildDirs;
use crate::infra::lock::FileLockManager;
use crate::infra::metadata::JsonMetadataStore;
use crate::infra::mock;

/// Build arguments
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    /// Packages to build
    pub packages: Vec<String>,
    /// Target distribution override
    pub distro: Option<Distribution>,
    /// Rebuild everything
    pub force_rebuild: bool,
    /// Stop after the first failure
    pub abort_on_failure: bool,
}

/// Apply command-line overrides to the loaded configuration
pub fn apply_overrides(mut config: Config, args: &BuildArgs) -> Config {
    if args.force_rebuild {
        config.build.force_rebuild = Some(true);
    }
    if args.abort_on_failure {
        config.build.keep_going = Some(false);
    }
    config
}

/// Create a build manager from configuration
pub fn build_manager(config: &Config, dirs: &HostbuildDirs) -> Result<BuildManager> {
    let state_dir = config.state_dir(dirs);
    let store: Arc<dyn MetadataStore> = Arc::new(
        JsonMetadataStore::open(&state_dir)
            .with_context(|| format!("Failed to open build records in {}", state_dir.display()))?,
    );

    let mut registry = BuilderRegistry::new();
    mock::register(&mut registry, config);

    let packages = PackagesManager::new(config.versions_repo(), config.force_rebuild(), store.clone());
    let paths = BuildPaths {
        work_dir: config.work_dir(dirs),
        result_dir: config.result_dir(dirs),
    };

    Ok(BuildManager::new(
        packages,
        registry,
        Arc::new(FileLockManager::new(config.lock_dir(dirs))),
        store,
        paths,
    )
    .with_options(BuildOptions {
        keep_going: config.keep_going(),
        step_timeout: config.step_timeout(),
    }))
}

/// Execute the build command
pub async fn execute(
    config: Config,
    dirs: &HostbuildDirs,
    args: BuildArgs,
    output: &OutputConfig,
) -> Result<()> {
    let config = apply_overrides(config, &args);
    let names = package_names(args.packages, &config)?;
    let distro = resolve_distro(args.distro)?;

    let mut manager = build_manager(&config, dirs)?;
    if output.show_progress() {
        manager = manager.with_progress(output::create_build_bar(names.len() as u64));
    }

    let token = manager.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            token.cancel();
        }
    });

    tracing::info!("Building {} for {distro}", names.join(", "));
    let result = manager.run(&names, &distro).await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if output.json {
                output::print_fatal_json(&e)?;
            }
            return Err(e.into());
        }
    };

    output::print_report(&report, output)?;

    match report.outcome() {
        RunOutcome::Success => Ok(()),
        outcome => bail!(
            "Build finished with {outcome}: {} of {} packages failed",
            report.failed().count(),
            report.packages.len()
        ),
    }
}

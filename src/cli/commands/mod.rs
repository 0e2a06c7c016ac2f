//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod detect;
pub mod order;

use anyhow::{bail, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::cli::output::OutputConfig;
use crate::config::defaults;
use crate::core::config::Config;
use crate::core::distro::Distribution;
use crate::infra::detect::{DistroDetector, OsReleaseDetector};
use crate::infra::dirs::HostbuildDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build packages and assemble a repository
    Build {
        /// Packages to build (default: [build] packages from the config)
        packages: Vec<String>,

        /// Target distribution as NAME:VERSION:ARCH instead of the host's
        #[arg(long, value_name = "NAME:VERSION:ARCH")]
        distro: Option<Distribution>,

        /// Rebuild every package regardless of build records
        #[arg(long)]
        force_rebuild: bool,

        /// Stop after the first failed package
        #[arg(long)]
        abort_on_failure: bool,
    },

    /// Print the build order without building
    Order {
        /// Packages to order (default: [build] packages from the config)
        packages: Vec<String>,

        /// Target distribution as NAME:VERSION:ARCH instead of the host's
        #[arg(long, value_name = "NAME:VERSION:ARCH")]
        distro: Option<Distribution>,
    },

    /// Print the detected host distribution
    Detect,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, config_path: Option<&Path>, output: &OutputConfig) -> Result<()> {
        let dirs = HostbuildDirs::new();

        match self {
            Self::Build {
                packages,
                distro,
                force_rebuild,
                abort_on_failure,
            } => {
                let config = load_config(config_path, &dirs)?;
                let options = build::BuildArgs {
                    packages,
                    distro,
                    force_rebuild,
                    abort_on_failure,
                };
                build::execute(config, &dirs, options, output).await
            }
            Self::Order { packages, distro } => {
                let config = load_config(config_path, &dirs)?;
                order::execute(&config, &dirs, &packages, distro, output)
            }
            Self::Detect => detect::execute(&OsReleaseDetector::new(), output),
        }
    }
}

/// Load the configuration
///
/// Uses the explicit path if given, otherwise `./hostbuild.toml`, then the
/// user config file. With no file at all, defaults are rooted at the
/// current directory.
pub fn load_config(explicit: Option<&Path>, dirs: &HostbuildDirs) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let local = std::env::current_dir()?.join(defaults::CONFIG_FILE_NAME);
            let global = dirs.global_config_path();
            if !local.exists() && global.exists() {
                global
            } else {
                local
            }
        }
    };

    tracing::debug!("Using config {}", path.display());
    Ok(Config::load_from_path(&absolute(&path)?)?)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    })
}

/// The requested distribution, or the detected host distribution
pub fn resolve_distro(requested: Option<Distribution>) -> Result<Distribution> {
    match requested {
        Some(distro) => Ok(distro),
        None => Ok(OsReleaseDetector::new().detect()?),
    }
}

/// Package names from the command line, falling back to the config
pub fn package_names(requested: Vec<String>, config: &Config) -> Result<Vec<String>> {
    let names = if requested.is_empty() {
        config.build.packages.clone()
    } else {
        requested
    };
    if names.is_empty() {
        bail!(
            "No packages to build. Name packages on the command line or set [build] packages in {}",
            defaults::CONFIG_FILE_NAME
        );
    }
    Ok(names)
}

//! Order command implementation
//!
//! Implements `hostbuild order`: prints the scheduled build order and the
//! rebuild decision for each package without building anything.

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::{build, package_names, resolve_distro};
use crate::cli::output::OutputConfig;
use crate::core::config::Config;
use crate::core::distro::Distribution;
use crate::core::package::Package;
use crate::core::rebuild::{self, RebuildDecision, RebuildReason};
use crate::infra::dirs::HostbuildDirs;

/// One line of the planned order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPackage {
    pub name: String,
    pub nvr: String,
    pub dependencies: Vec<String>,
    /// Why the package would be rebuilt, or `None` if it is up to date
    pub rebuild: Option<RebuildReason>,
}

impl PlannedPackage {
    fn from_package(package: &Package, distro: &Distribution) -> Self {
        let rebuild = match rebuild::evaluate(package, distro) {
            RebuildDecision::Rebuild(reason) => Some(reason),
            RebuildDecision::UpToDate => None,
        };
        Self {
            name: package.name.clone(),
            nvr: package.nvr(),
            dependencies: package.dependencies.clone(),
            rebuild,
        }
    }
}

/// Execute the order command
pub fn execute(
    config: &Config,
    dirs: &HostbuildDirs,
    packages: &[String],
    distro: Option<Distribution>,
    output: &OutputConfig,
) -> Result<()> {
    let names = package_names(packages.to_vec(), config)?;
    let distro = resolve_distro(distro)?;

    let manager = build::build_manager(config, dirs)?;
    let planned: Vec<PlannedPackage> = manager
        .plan(&names, &distro)?
        .iter()
        .map(|p| PlannedPackage::from_package(p, &distro))
        .collect();

    if output.json {
        let value = serde_json::json!({
            "distro": distro,
            "packages": planned,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (index, package) in planned.iter().enumerate() {
        let decision = match package.rebuild {
            Some(reason) => format!("rebuild ({reason})"),
            None => "up to date".to_string(),
        };
        println!("{:>3}. {} {decision}", index + 1, package.nvr);
    }
    Ok(())
}

//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commands::Commands;
use output::OutputConfig;

/// hostbuild - Incremental RPM package builds
///
/// Builds interdependent packages for a host distribution in dependency
/// order, skipping packages whose sources are unchanged.
#[derive(Parser, Debug)]
#[command(name = "hostbuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: ./hostbuild.toml, then the user config)
    #[arg(short, long, global = true, env = "HOSTBUILD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self, output: &OutputConfig) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run(self.config.as_deref(), output).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distro::Distribution;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "hostbuild",
            "-vv",
            "build",
            "kernel",
            "qemu",
            "--distro",
            "centos:7:ppc64le",
            "--force-rebuild",
            "--abort-on-failure",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Build {
                packages,
                distro,
                force_rebuild,
                abort_on_failure,
            }) => {
                assert_eq!(packages, vec!["kernel", "qemu"]);
                assert_eq!(distro, Some(Distribution::new("centos", "7", "ppc64le")));
                assert!(force_rebuild);
                assert!(abort_on_failure);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_distro_is_rejected() {
        assert!(Cli::try_parse_from(["hostbuild", "order", "--distro", "centos-7"]).is_err());
    }
}

//! hostbuild - Incremental RPM package builds
//!
//! Entry point for the hostbuild command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostbuild::cli::output::{display_error, OutputConfig};
use hostbuild::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(output_config.log_level().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    match cli.run(&output_config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e, &output_config);
            std::process::exit(1);
        }
    }
}

//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! build reports, and error messages to the user.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::lifecycle::PackageStatus;
use crate::core::report::{BuildReport, RunOutcome};
use crate::error::RunError;

/// How results are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Only errors are printed
    pub quiet: bool,
    /// Machine-readable output on stdout
    pub json: bool,
    /// Verbosity level from repeated `-v`
    pub verbose: u8,
}

impl OutputConfig {
    /// Create output settings from the global flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Whether progress bars should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Log level implied by the flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error, output: &OutputConfig) {
    if output.json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let value = serde_json::json!({
            "error": error.to_string(),
            "causes": causes,
        });
        eprintln!("{value}");
        return;
    }

    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    pb.set_style(style);
    pb
}

/// Print a finished run's report
pub fn print_report(report: &BuildReport, output: &OutputConfig) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    println!("Build for {} (run {})", report.distro, report.timestamp);
    for package in &report.packages {
        let nvr = format!("{}-{}-{}", package.name, package.version, package.release);
        match &package.status {
            PackageStatus::Done => {
                let reason = package
                    .rebuild_reason
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default();
                println!("  {} {nvr} built{reason}", status::SUCCESS);
            }
            PackageStatus::Skipped => println!("  {} {nvr} up to date", status::INFO),
            other => println!("  {} {nvr} {other}", status::ERROR),
        }
    }

    for warning in &report.warnings {
        println!("{} {warning}", status::WARNING);
    }
    for error in &report.finalize_errors {
        println!("{} {error}", status::ERROR);
    }

    let built = report.built().count();
    let skipped = report.skipped().count();
    let failed = report.failed().count();
    println!("{built} built, {skipped} up to date, {failed} failed");
    if report.published {
        println!("{} Repository: {}", status::SUCCESS, report.result_dir.display());
    }
    Ok(())
}

/// Print a fatal run error as a JSON report
pub fn print_fatal_json(error: &RunError) -> Result<()> {
    let mut value = serde_json::json!({
        "outcome": RunOutcome::Failure,
        "error": error.to_string(),
    });
    if let RunError::Scheduler(e) = error {
        let members = e.cycle_members();
        if !members.is_empty() {
            value["cycle"] = serde_json::json!(members);
        }
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

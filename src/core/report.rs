//! Build run reports
//!
//! One [`BuildReport`] per run: every package's terminal status plus the
//! problems raised while assembling the repository and cleaning up.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::distro::Distribution;
use crate::core::lifecycle::PackageStatus;
use crate::core::package::Package;
use crate::core::rebuild::RebuildReason;

/// Overall result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every package was built or skipped and the repository was published
    Success,
    /// Some packages failed or finalization reported errors
    PartialFailure,
    /// The run stopped before any package was attempted
    Failure,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::PartialFailure => "partial failure",
            Self::Failure => "failure",
        })
    }
}

/// Terminal state of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOutcome {
    pub name: String,
    pub version: String,
    pub release: String,
    pub status: PackageStatus,
    /// Why the package was rebuilt, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild_reason: Option<RebuildReason>,
}

impl PackageOutcome {
    /// Snapshot a package at the end of its lifecycle
    pub fn from_package(package: &Package, rebuild_reason: Option<RebuildReason>) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            release: package.release.clone(),
            status: package.status().clone(),
            rebuild_reason,
        }
    }
}

/// Aggregate report of a build run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Target distribution
    pub distro: Distribution,
    /// Run timestamp
    pub timestamp: String,
    /// Run result directory
    pub result_dir: PathBuf,
    /// Per-package outcomes in build order
    pub packages: Vec<PackageOutcome>,
    /// Non-fatal problems, such as failing to carry forward a skipped package
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Repository assembly, publishing, and cleanup errors
    #[serde(default)]
    pub finalize_errors: Vec<String>,
    /// Whether the "latest" link now points at this run
    pub published: bool,
}

impl BuildReport {
    /// Create an empty report
    pub fn new(distro: Distribution, timestamp: String, result_dir: PathBuf) -> Self {
        Self {
            distro,
            timestamp,
            result_dir,
            packages: Vec::new(),
            warnings: Vec::new(),
            finalize_errors: Vec::new(),
            published: false,
        }
    }

    /// Overall outcome
    pub fn outcome(&self) -> RunOutcome {
        if self.failed().next().is_some() || !self.finalize_errors.is_empty() {
            RunOutcome::PartialFailure
        } else {
            RunOutcome::Success
        }
    }

    /// Packages that reached `Done`
    pub fn built(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.packages
            .iter()
            .filter(|p| p.status == PackageStatus::Done)
    }

    /// Packages that were skipped as up to date
    pub fn skipped(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.packages
            .iter()
            .filter(|p| p.status == PackageStatus::Skipped)
    }

    /// Packages that failed or were not attempted
    pub fn failed(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.packages.iter().filter(|p| p.status.is_failed())
    }

    /// Outcome of a package by name
    pub fn package(&self, name: &str) -> Option<&PackageOutcome> {
        self.packages.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::FailureReason;

    fn outcome(name: &str, status: PackageStatus) -> PackageOutcome {
        PackageOutcome {
            name: name.to_string(),
            version: "1.0".to_string(),
            release: "1".to_string(),
            status,
            rebuild_reason: None,
        }
    }

    fn report(packages: Vec<PackageOutcome>) -> BuildReport {
        let mut report = BuildReport::new(
            Distribution::new("centos", "7", "ppc64le"),
            "2017-03-01T101500".to_string(),
            PathBuf::from("/result/2017-03-01T101500"),
        );
        report.packages = packages;
        report
    }

    #[test]
    fn test_all_done_or_skipped_is_success() {
        let report = report(vec![
            outcome("a", PackageStatus::Skipped),
            outcome("b", PackageStatus::Done),
        ]);
        assert_eq!(report.outcome(), RunOutcome::Success);
        assert_eq!(report.built().count(), 1);
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn test_failed_package_is_partial_failure() {
        let report = report(vec![
            outcome("a", PackageStatus::Done),
            outcome(
                "b",
                PackageStatus::failed(FailureReason::DependencyFailed {
                    dependency: "c".to_string(),
                }),
            ),
        ]);
        assert_eq!(report.outcome(), RunOutcome::PartialFailure);
        assert_eq!(report.failed().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["b"]);
    }

    #[test]
    fn test_finalize_error_is_partial_failure() {
        let mut report = report(vec![outcome("a", PackageStatus::Done)]);
        report.finalize_errors.push("createrepo failed".to_string());
        assert_eq!(report.outcome(), RunOutcome::PartialFailure);
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = report(vec![outcome(
            "b",
            PackageStatus::failed(FailureReason::TimedOut {
                step: crate::core::lifecycle::Step::Build,
                seconds: 60,
            }),
        )]);
        report.packages[0].rebuild_reason = Some(RebuildReason::Forced);

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        let pkg = &json["packages"][0];
        assert_eq!(pkg["status"]["state"], "failed");
        assert_eq!(pkg["status"]["reason"]["kind"], "timed_out");
        assert_eq!(pkg["rebuild_reason"], "forced");
        assert_eq!(json["distro"]["name"], "centos");
    }
}

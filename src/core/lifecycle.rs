//! Per-package lifecycle states
//!
//! ```text
//! Pending -> Skipped
//! Pending -> Locked -> SourcesPrepared -> Built -> ResultsCopied -> Done
//! (any non-terminal state) -> Failed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A per-package build step that can fail or time out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Fetching and staging source files
    FetchSources,
    /// Builder turning staged sources into build input
    PrepareSources,
    /// Compile and package
    Build,
    /// Extracting artifacts into the result area
    CopyResults,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchSources => "fetch sources",
            Self::PrepareSources => "prepare sources",
            Self::Build => "build",
            Self::CopyResults => "copy results",
        };
        f.write_str(name)
    }
}

/// Why a package ended in [`PackageStatus::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Package lock could not be acquired
    Lock { error: String },
    /// A build step returned an error
    Step { step: Step, error: String },
    /// A build step exceeded its time limit
    TimedOut { step: Step, seconds: u64 },
    /// A dependency failed, so this package was never attempted
    DependencyFailed { dependency: String },
    /// The run stopped after an earlier failure
    Aborted,
    /// The run was cancelled before this package finished
    Cancelled,
}

impl FailureReason {
    /// Whether the package was never attempted
    pub fn is_not_attempted(&self) -> bool {
        matches!(
            self,
            Self::DependencyFailed { .. } | Self::Aborted | Self::Cancelled
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock { error } => write!(f, "lock failed: {error}"),
            Self::Step { step, error } => write!(f, "{step} failed: {error}"),
            Self::TimedOut { step, seconds } => write!(f, "{step} timed out after {seconds}s"),
            Self::DependencyFailed { dependency } => {
                write!(f, "skipped: dependency '{dependency}' failed")
            }
            Self::Aborted => write!(f, "not attempted: run aborted after a failure"),
            Self::Cancelled => write!(f, "not attempted: run cancelled"),
        }
    }
}

/// Lifecycle state of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    Skipped,
    Locked,
    SourcesPrepared,
    Built,
    ResultsCopied,
    Done,
    Failed { reason: FailureReason },
}

impl PackageStatus {
    /// Create a failed state
    pub fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Done | Self::Failed { .. })
    }

    /// Whether this is a failed state
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: &PackageStatus) -> bool {
        use PackageStatus::{
            Built, Done, Failed, Locked, Pending, ResultsCopied, Skipped, SourcesPrepared,
        };

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Failed { .. })
                | (Pending, Skipped | Locked)
                | (Locked, SourcesPrepared)
                | (SourcesPrepared, Built)
                | (Built, ResultsCopied)
                | (ResultsCopied, Done)
        )
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Skipped => f.write_str("skipped"),
            Self::Locked => f.write_str("locked"),
            Self::SourcesPrepared => f.write_str("sources prepared"),
            Self::Built => f.write_str("built"),
            Self::ResultsCopied => f.write_str("results copied"),
            Self::Done => f.write_str("done"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

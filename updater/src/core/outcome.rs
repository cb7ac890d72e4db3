//! Terminal states of an update run and how they are reported.

use serde::Serialize;

use crate::core::types::{BuildReport, LogStatus};
use crate::exit_codes;

/// Where an update run stopped.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// git could not be started for fetch or pull; nothing was modified.
    VersionControlMissing { detail: String },
    /// `git fetch` did not succeed; nothing was merged. `None` when the
    /// process was lost before reporting an exit code.
    FetchFailed { exit_code: Option<i32> },
    /// The pull failed and the merge was aborted cleanly.
    MergeFailed {
        branch: String,
        pull_exit_code: Option<i32>,
    },
    /// The pull failed and so did `git merge --abort`. The working copy may be
    /// mid-merge and needs manual attention.
    AbortFailed {
        branch: String,
        pull_exit_code: Option<i32>,
        abort_exit_code: Option<i32>,
    },
    /// Merged; the user chose not to build.
    MergedNoBuild { branch: String },
    /// Merged; the build toolchain could not be started.
    ToolchainMissing { branch: String, detail: String },
    /// Merged; the build started but the updater lost track of it.
    BuildInterrupted { branch: String, detail: String },
    BuildSucceeded { branch: String, report: BuildReport },
    BuildFailed { branch: String, report: BuildReport },
}

impl UpdateOutcome {
    /// Stable state name used in logs and JSON output.
    pub fn state(&self) -> &'static str {
        match self {
            Self::VersionControlMissing { .. } => "version_control_missing",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::MergeFailed { .. } => "merge_failed",
            Self::AbortFailed { .. } => "abort_failed",
            Self::MergedNoBuild { .. } => "merged_no_build",
            Self::ToolchainMissing { .. } => "toolchain_missing",
            Self::BuildInterrupted { .. } => "build_interrupted",
            Self::BuildSucceeded { .. } => "build_succeeded",
            Self::BuildFailed { .. } => "build_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::MergedNoBuild { .. } | Self::BuildSucceeded { .. }
        )
    }

    /// Whether the branch was merged into the working copy.
    pub fn merged(&self) -> bool {
        matches!(
            self,
            Self::MergedNoBuild { .. }
                | Self::ToolchainMissing { .. }
                | Self::BuildInterrupted { .. }
                | Self::BuildSucceeded { .. }
                | Self::BuildFailed { .. }
        )
    }

    pub fn build_report(&self) -> Option<&BuildReport> {
        match self {
            Self::BuildSucceeded { report, .. } | Self::BuildFailed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MergedNoBuild { .. } | Self::BuildSucceeded { .. } => exit_codes::OK,
            Self::FetchFailed { .. } => exit_codes::FETCH_FAILED,
            Self::MergeFailed { .. } => exit_codes::MERGE_FAILED,
            Self::AbortFailed { .. } => exit_codes::ABORT_FAILED,
            Self::VersionControlMissing { .. } | Self::ToolchainMissing { .. } => {
                exit_codes::TOOL_MISSING
            }
            Self::BuildInterrupted { .. } | Self::BuildFailed { .. } => exit_codes::BUILD_FAILED,
        }
    }

    /// Human-readable report, one or more lines.
    pub fn message(&self) -> String {
        match self {
            Self::VersionControlMissing { detail } => {
                format!("git is required for updating but could not be run: {detail}")
            }
            Self::FetchFailed { exit_code } => {
                format!("The fetch failed! git {}.", describe_exit(*exit_code))
            }
            Self::MergeFailed {
                branch,
                pull_exit_code,
            } => format!(
                "The merge of '{branch}' failed! git {}. The merge was aborted and the working copy restored.",
                describe_exit(*pull_exit_code)
            ),
            Self::AbortFailed {
                branch,
                pull_exit_code,
                abort_exit_code,
            } => format!(
                "The merge of '{branch}' failed (git {}) and the merge abort failed too (git {}). \
                 The working copy may be left mid-merge; resolve it manually before building.",
                describe_exit(*pull_exit_code),
                describe_exit(*abort_exit_code)
            ),
            Self::MergedNoBuild { branch } => {
                format!("The merge of '{branch}' was a success. Build skipped.")
            }
            Self::ToolchainMissing { branch, detail } => format!(
                "The merge of '{branch}' was a success, but the build toolchain is not installed: {detail}"
            ),
            Self::BuildInterrupted { branch, detail } => format!(
                "The merge of '{branch}' was a success, but the build was interrupted: {detail}"
            ),
            Self::BuildSucceeded { report, .. } | Self::BuildFailed { report, .. } => {
                describe_build(report)
            }
        }
    }

    pub fn summary(&self) -> OutcomeSummary {
        let report = self.build_report();
        OutcomeSummary {
            state: self.state(),
            success: self.is_success(),
            merged: self.merged(),
            message: self.message(),
            build_exit_code: report.map(BuildReport::exit_code),
            build_elapsed_ms: report.map(BuildReport::elapsed_millis),
            build_log: report.and_then(|r| r.log.path()).map(|p| p.display().to_string()),
            build_log_error: report.and_then(|r| match &r.log {
                LogStatus::Failed(err) => Some(err.to_string()),
                _ => None,
            }),
        }
    }
}

/// Report a finished build, including what happened to its log.
pub fn describe_build(report: &BuildReport) -> String {
    let mut msg = if report.success() {
        format!(
            "Build finished in {:.3} second(s).",
            report.elapsed.as_secs_f64()
        )
    } else {
        format!(
            "Something went wrong! Build exited with code {} after {:.3} second(s).",
            report.exit_code(),
            report.elapsed.as_secs_f64()
        )
    };
    match &report.log {
        LogStatus::Disabled => {}
        LogStatus::Written(path) => {
            msg.push_str(&format!("\nBuild log written to {}.", path.display()));
        }
        LogStatus::Failed(err) => {
            msg.push_str(&format!("\nWarning: {err}"));
        }
    }
    msg
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "did not report an exit code".to_string(),
    }
}

/// Serializable view of an [`UpdateOutcome`] for `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub state: &'static str,
    pub success: bool,
    pub merged: bool,
    pub message: String,
    pub build_exit_code: Option<i32>,
    pub build_elapsed_ms: Option<u128>,
    pub build_log: Option<String>,
    pub build_log_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::outcome;
    use std::path::PathBuf;
    use std::time::Duration;

    fn report(exit_code: i32, log: LogStatus) -> BuildReport {
        BuildReport {
            outcome: outcome(exit_code),
            elapsed: Duration::from_millis(1500),
            combined_log: None,
            log,
        }
    }

    #[test]
    fn fetch_failure_reports_exit_code() {
        let out = UpdateOutcome::FetchFailed { exit_code: Some(128) };
        assert!(out.message().contains("code 128"));
        assert_eq!(out.exit_code(), exit_codes::FETCH_FAILED);
        assert!(!out.merged());
    }

    #[test]
    fn build_success_reports_seconds_and_log_path() {
        let out = UpdateOutcome::BuildSucceeded {
            branch: "feature".to_string(),
            report: report(0, LogStatus::Written(PathBuf::from("build.log"))),
        };
        let msg = out.message();
        assert!(msg.contains("1.500 second(s)"), "{msg}");
        assert!(msg.contains("build.log"), "{msg}");
        assert!(out.is_success());

        let summary = out.summary();
        assert_eq!(summary.state, "build_succeeded");
        assert_eq!(summary.build_elapsed_ms, Some(1500));
        assert_eq!(summary.build_log.as_deref(), Some("build.log"));
    }

    #[test]
    fn build_failure_keeps_exit_code_alongside_log_error() {
        let err = crate::error::LogWriteError {
            path: PathBuf::from("build.log"),
            source: std::io::Error::other("file in use"),
        };
        let out = UpdateOutcome::BuildFailed {
            branch: "feature".to_string(),
            report: report(1, LogStatus::Failed(err)),
        };
        let summary = out.summary();
        assert_eq!(summary.build_exit_code, Some(1));
        assert!(summary.build_log_error.expect("log error").contains("file in use"));
        assert!(out.message().starts_with("Something went wrong! Build exited with code 1"));
        assert_eq!(out.exit_code(), exit_codes::BUILD_FAILED);
    }
}

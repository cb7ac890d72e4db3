//! Typed failures for the update flow.
//!
//! Each external step distinguishes "the tool could not be started" from "the
//! tool ran and exited non-zero", because only the former is fixed by
//! installing something. Configuration and CLI plumbing use `anyhow` instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to run a child process to completion.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be found or started.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The program started but waiting on it or draining its output failed.
    #[error("lost track of `{program}` while waiting for it: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    pub fn is_launch(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}

/// Version-control step failures.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("git fetch exited with code {code}")]
    FetchFailed { code: i32 },
    #[error("git pull origin {branch} exited with code {code}")]
    PullFailed { branch: String, code: i32 },
    #[error("git merge --abort exited with code {code}")]
    AbortFailed { code: i32 },
    /// Any other query (branch listing, current branch) that exited non-zero.
    #[error("git {command} exited with code {code}: {stderr}")]
    Query {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("detached HEAD (no current branch)")]
    DetachedHead,
}

/// Build step failures that prevent a [`BuildReport`](crate::core::types::BuildReport).
///
/// A toolchain that runs and exits non-zero is not an error here; the report
/// carries its exit code.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build toolchain `{program}` is not installed or not executable: {source}")]
    ToolchainMissing {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Interrupted(ProcessError),
}

impl From<ProcessError> for BuildError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Launch { program, source } => Self::ToolchainMissing { program, source },
            other => Self::Interrupted(other),
        }
    }
}

/// Persisting the build log failed. Never changes the build's own result.
#[derive(Debug, Error)]
#[error("failed to write build log {}: {source}", path.display())]
pub struct LogWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Run-lock acquisition failures.
#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "another update is already running for this repository (remove {} if it is stale)",
        path.display()
    )]
    Busy { path: PathBuf },
    #[error("failed to create lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

//! Shared value types passed between the process layer and the orchestrator.
//!
//! Everything here is produced once per external invocation and never mutated
//! afterwards.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LogWriteError;

/// Exit code reported for a child that terminated without one (killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// How a child's stdio is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StdioMode {
    /// Let the child's output reach the user's console.
    pub show_console: bool,
    /// Capture stdout/stderr line by line.
    pub capture: bool,
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<OsString>,
    pub workdir: Option<PathBuf>,
    pub stdio: StdioMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            workdir: None,
            stdio: StdioMode::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Arguments rendered lossily, for logs and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.args_lossy() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of one external invocation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    /// Captured stdout, present only when capture was requested.
    pub stdout: Option<String>,
    /// Captured stderr, present only when capture was requested.
    pub stderr: Option<String>,
    /// Both streams interleaved in arrival order, line by line.
    pub combined: Option<String>,
    /// Wall-clock time from spawn to exit.
    pub elapsed: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// Console/log switches read from the settings snapshot.
///
/// The four flags are independent; enabling console and log for the same tool
/// is allowed even though it is unusual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorFlags {
    pub show_vcs_console: bool,
    pub show_build_console: bool,
    pub write_vcs_log: bool,
    pub write_build_log: bool,
}

/// What happened to the build log after the toolchain exited.
#[derive(Debug)]
pub enum LogStatus {
    Disabled,
    Written(PathBuf),
    Failed(LogWriteError),
}

impl LogStatus {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Disabled => None,
            Self::Written(path) => Some(path),
            Self::Failed(err) => Some(&err.path),
        }
    }
}

/// Outcome of a build that launched and exited (successfully or not).
#[derive(Debug)]
pub struct BuildReport {
    pub outcome: CommandOutcome,
    pub elapsed: Duration,
    pub combined_log: Option<String>,
    pub log: LogStatus,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.outcome.success()
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code
    }

    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

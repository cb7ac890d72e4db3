//! Git adapter for the update flow.
//!
//! Wraps the three working-copy mutations (`fetch`, `pull origin <branch>`,
//! `merge --abort`) plus the two read-only queries the branch catalog needs.
//! Mutating steps translate a non-zero exit into a typed [`VcsError`] and never
//! decide what happens next; sequencing belongs to the orchestrator.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::core::types::{CommandOutcome, CommandSpec, StdioMode};
use crate::error::VcsError;
use crate::io::process::ProcessRunner;

pub const GIT_PROGRAM: &str = "git";
pub const REMOTE: &str = "origin";

/// The version-control operations the orchestrator sequences.
pub trait VersionControl {
    fn fetch(&self) -> Result<CommandOutcome, VcsError>;
    fn pull(&self, branch: &str) -> Result<CommandOutcome, VcsError>;
    fn abort_merge(&self) -> Result<CommandOutcome, VcsError>;
}

/// Read-only branch queries used by the branch catalog.
pub trait BranchSource {
    fn current_branch(&self) -> Result<String, VcsError>;
    fn remote_branches(&self) -> Result<Vec<String>, VcsError>;
}

/// Console and log behavior for working-copy mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsOptions {
    pub show_console: bool,
    /// Append captured output of each mutating command here when set.
    pub log_path: Option<PathBuf>,
}

/// Wrapper for executing git commands in a working copy.
#[derive(Debug, Clone)]
pub struct Git<R> {
    workdir: PathBuf,
    runner: R,
    options: VcsOptions,
}

impl<R: ProcessRunner> Git<R> {
    pub fn new(workdir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            workdir: workdir.into(),
            runner,
            options: VcsOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VcsOptions) -> Self {
        self.options = options;
        self
    }

    fn command(&self, args: &[&str], stdio: StdioMode) -> CommandSpec {
        CommandSpec::new(GIT_PROGRAM)
            .args(args.iter().copied())
            .current_dir(&self.workdir)
            .stdio(stdio)
    }

    /// Run a working-copy mutation honoring the console/log options.
    fn run_step(&self, args: &[&str]) -> Result<CommandOutcome, VcsError> {
        let stdio = StdioMode {
            show_console: self.options.show_console,
            capture: self.options.log_path.is_some(),
        };
        let spec = self.command(args, stdio);
        let outcome = self.runner.run(&spec)?;
        if let Some(path) = &self.options.log_path {
            append_step_log(path, &spec, &outcome);
        }
        Ok(outcome)
    }

    /// Run a query that must capture stdout and succeed.
    fn run_capture(&self, args: &[&str]) -> Result<String, VcsError> {
        let spec = self.command(
            args,
            StdioMode {
                show_console: false,
                capture: true,
            },
        );
        let outcome = self.runner.run(&spec)?;
        if !outcome.success() {
            return Err(VcsError::Query {
                command: args.join(" "),
                code: outcome.exit_code,
                stderr: outcome.stderr_trimmed().to_string(),
            });
        }
        Ok(outcome.stdout.unwrap_or_default())
    }
}

impl<R: ProcessRunner> VersionControl for Git<R> {
    #[instrument(skip_all, fields(workdir = %self.workdir.display()))]
    fn fetch(&self) -> Result<CommandOutcome, VcsError> {
        let outcome = self.run_step(&["fetch"])?;
        if !outcome.success() {
            warn!(exit_code = outcome.exit_code, "git fetch failed");
            return Err(VcsError::FetchFailed {
                code: outcome.exit_code,
            });
        }
        debug!("fetch complete");
        Ok(outcome)
    }

    #[instrument(skip_all, fields(branch = %branch))]
    fn pull(&self, branch: &str) -> Result<CommandOutcome, VcsError> {
        let outcome = self.run_step(&["pull", REMOTE, branch])?;
        if !outcome.success() {
            warn!(exit_code = outcome.exit_code, "git pull failed");
            return Err(VcsError::PullFailed {
                branch: branch.to_string(),
                code: outcome.exit_code,
            });
        }
        debug!("pull complete");
        Ok(outcome)
    }

    #[instrument(skip_all)]
    fn abort_merge(&self) -> Result<CommandOutcome, VcsError> {
        let outcome = self.run_step(&["merge", "--abort"])?;
        if !outcome.success() {
            warn!(exit_code = outcome.exit_code, "git merge --abort failed");
            return Err(VcsError::AbortFailed {
                code: outcome.exit_code,
            });
        }
        debug!("merge aborted");
        Ok(outcome)
    }
}

impl<R: ProcessRunner> BranchSource for Git<R> {
    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    fn current_branch(&self) -> Result<String, VcsError> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(VcsError::DetachedHead);
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Branch names under `refs/remotes/origin`, without the remote prefix.
    fn remote_branches(&self) -> Result<Vec<String>, VcsError> {
        let out = self.run_capture(&[
            "for-each-ref",
            "--format=%(refname:strip=3)",
            "refs/remotes/origin",
        ])?;
        Ok(parse_remote_branches(&out))
    }
}

fn parse_remote_branches(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "HEAD")
        .map(str::to_string)
        .collect()
}

/// Append one command's captured output to the version-control log.
///
/// Failures only warn: the log is diagnostic and must not change a step's result.
fn append_step_log(path: &Path, spec: &CommandSpec, outcome: &CommandOutcome) {
    let mut entry = format!("$ {spec} (exit code {})\n", outcome.exit_code);
    if let Some(combined) = &outcome.combined {
        entry.push_str(combined);
    }

    let result = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(path))
        .and_then(|mut file| file.write_all(entry.as_bytes()));
    if let Err(err) = result {
        warn!(path = %path.display(), err = %err, "failed to append version-control log");
    }
}

//! Test-only helpers: scripted process runners and throwaway git remotes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::core::types::{CommandOutcome, CommandSpec};
use crate::error::ProcessError;
use crate::io::process::ProcessRunner;

/// Outcome with the given exit code and nothing captured.
pub fn outcome(exit_code: i32) -> CommandOutcome {
    CommandOutcome {
        exit_code,
        stdout: None,
        stderr: None,
        combined: None,
        elapsed: Duration::from_millis(5),
    }
}

/// Outcome with captured output; `combined` is stdout followed by stderr.
pub fn outcome_with_output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutcome {
    CommandOutcome {
        exit_code,
        stdout: Some(stdout.to_string()),
        stderr: Some(stderr.to_string()),
        combined: Some(format!("{stdout}{stderr}")),
        elapsed: Duration::from_millis(5),
    }
}

/// Launch failure as produced by a missing executable.
pub fn launch_error(program: &str) -> ProcessError {
    ProcessError::Launch {
        program: program.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    }
}

/// Process runner that replays queued results in order and records every call.
///
/// Running out of queued results is a test bug and panics.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    queue: RefCell<VecDeque<Result<CommandOutcome, ProcessError>>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new(results: Vec<Result<CommandOutcome, ProcessError>>) -> Self {
        Self {
            queue: RefCell::new(results.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Calls rendered as `program arg...` strings.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn remaining(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, ProcessError> {
        self.calls.borrow_mut().push(command.clone());
        self.queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedRunner exhausted at `{command}`"))
    }
}

/// A bare `origin`, a seeding clone that publishes branches, and a working
/// copy cloned from `origin` for the updater to operate on.
pub struct TestRemote {
    _temp: tempfile::TempDir,
    pub origin: PathBuf,
    pub upstream: PathBuf,
    pub work: PathBuf,
}

impl TestRemote {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("tempdir")?;
        let origin = temp.path().join("origin.git");
        let upstream = temp.path().join("upstream");
        let work = temp.path().join("work");

        git(temp.path(), &["init", "--bare", "origin.git"])?;
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"])?;

        git(temp.path(), &["init", "upstream"])?;
        configure_identity(&upstream)?;
        git(&upstream, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        fs::write(upstream.join("README.md"), "base\n").context("write README")?;
        git(&upstream, &["add", "-A"])?;
        git(&upstream, &["commit", "-m", "initial"])?;
        let origin_str = origin.to_string_lossy().into_owned();
        git(&upstream, &["remote", "add", "origin", &origin_str])?;
        git(&upstream, &["push", "origin", "main"])?;

        git(temp.path(), &["clone", &origin_str, "work"])?;
        configure_identity(&work)?;
        git(&work, &["config", "pull.rebase", "false"])?;

        Ok(Self {
            _temp: temp,
            origin,
            upstream,
            work,
        })
    }

    /// Publish `branch` (forked from `main`) with one commit writing `file`.
    pub fn publish_branch(&self, branch: &str, file: &str, contents: &str) -> Result<()> {
        git(&self.upstream, &["checkout", "-B", branch, "main"])?;
        fs::write(self.upstream.join(file), contents)
            .with_context(|| format!("write {file}"))?;
        git(&self.upstream, &["add", "-A"])?;
        git(&self.upstream, &["commit", "-m", &format!("update {file}")])?;
        git(&self.upstream, &["push", "-f", "origin", branch])?;
        git(&self.upstream, &["checkout", "main"])?;
        Ok(())
    }

    /// Commit `file` locally in the working copy (without pushing).
    pub fn commit_in_work(&self, file: &str, contents: &str) -> Result<()> {
        fs::write(self.work.join(file), contents).with_context(|| format!("write {file}"))?;
        git(&self.work, &["add", "-A"])?;
        git(&self.work, &["commit", "-m", &format!("local {file}")])?;
        Ok(())
    }

    /// Refresh remote-tracking refs in the working copy.
    pub fn fetch_work(&self) -> Result<()> {
        git(&self.work, &["fetch", "origin"])?;
        Ok(())
    }

    /// `git status --porcelain` of the working copy.
    pub fn work_status(&self) -> Result<String> {
        git(&self.work, &["status", "--porcelain"])
    }

    pub fn work_path(&self) -> &Path {
        &self.work
    }
}

fn configure_identity(repo: &Path) -> Result<()> {
    git(repo, &["config", "user.name", "Updater Test"])?;
    git(repo, &["config", "user.email", "updater-test@local.invalid"])?;
    git(repo, &["config", "commit.gpgsign", "false"])?;
    Ok(())
}

/// Run git in `dir`, failing on non-zero exit. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !out.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

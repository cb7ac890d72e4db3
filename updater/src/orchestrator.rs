//! The fetch → pull → (abort | build) state machine.
//!
//! Each state performs at most one external step and names its successor.
//! A failed pull always passes through `Aborting`, and neither `Aborting` nor
//! any terminal state it reaches can lead to the build.

use tracing::{debug, info, instrument, warn};

use crate::core::outcome::UpdateOutcome;
use crate::error::{BuildError, VcsError};
use crate::io::build::{BuildRequest, Builder};
use crate::io::git::VersionControl;

/// Synchronous yes/no decision supplied by the caller (CLI prompt, test script).
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Non-terminal states of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Pulling,
    Aborting { pull_exit_code: Option<i32> },
    BuildPending,
}

enum Transition {
    Next(State),
    Done(UpdateOutcome),
}

/// Sequences version-control and build steps for one branch merge.
///
/// Built per invocation from a settings snapshot; holds no state between runs.
pub struct UpdateOrchestrator<V, B> {
    vcs: V,
    builder: B,
    build: BuildRequest,
}

impl<V: VersionControl, B: Builder> UpdateOrchestrator<V, B> {
    pub fn new(vcs: V, builder: B, build: BuildRequest) -> Self {
        Self {
            vcs,
            builder,
            build,
        }
    }

    /// Merge `branch` into the working copy and, if confirmed, build it.
    #[instrument(skip_all, fields(branch = %branch))]
    pub fn run<C: Confirm + ?Sized>(&self, branch: &str, confirm: &mut C) -> UpdateOutcome {
        let mut state = State::Start;
        loop {
            debug!(?state, "entering state");
            match self.step(state, branch, confirm) {
                Transition::Next(next) => state = next,
                Transition::Done(outcome) => {
                    info!(outcome = outcome.state(), "update finished");
                    return outcome;
                }
            }
        }
    }

    fn step<C: Confirm + ?Sized>(
        &self,
        state: State,
        branch: &str,
        confirm: &mut C,
    ) -> Transition {
        match state {
            State::Start => self.fetch(),
            State::Pulling => self.pull(branch),
            State::Aborting { pull_exit_code } => self.abort(branch, pull_exit_code),
            State::BuildPending => self.build(branch, confirm),
        }
    }

    fn fetch(&self) -> Transition {
        match self.vcs.fetch() {
            Ok(_) => Transition::Next(State::Pulling),
            Err(VcsError::FetchFailed { code }) => Transition::Done(UpdateOutcome::FetchFailed {
                exit_code: Some(code),
            }),
            Err(VcsError::Process(err)) if err.is_launch() => {
                Transition::Done(UpdateOutcome::VersionControlMissing {
                    detail: err.to_string(),
                })
            }
            Err(err) => {
                warn!(err = %err, "fetch did not complete");
                Transition::Done(UpdateOutcome::FetchFailed { exit_code: None })
            }
        }
    }

    fn pull(&self, branch: &str) -> Transition {
        match self.vcs.pull(branch) {
            Ok(_) => Transition::Next(State::BuildPending),
            Err(VcsError::Process(err)) if err.is_launch() => {
                Transition::Done(UpdateOutcome::VersionControlMissing {
                    detail: err.to_string(),
                })
            }
            Err(VcsError::PullFailed { code, .. }) => Transition::Next(State::Aborting {
                pull_exit_code: Some(code),
            }),
            // The pull launched, so the working copy may be mid-merge.
            Err(err) => {
                warn!(err = %err, "pull did not complete");
                Transition::Next(State::Aborting {
                    pull_exit_code: None,
                })
            }
        }
    }

    fn abort(&self, branch: &str, pull_exit_code: Option<i32>) -> Transition {
        let branch = branch.to_string();
        match self.vcs.abort_merge() {
            Ok(_) => Transition::Done(UpdateOutcome::MergeFailed {
                branch,
                pull_exit_code,
            }),
            Err(err) => {
                let abort_exit_code = match &err {
                    VcsError::AbortFailed { code } => Some(*code),
                    _ => None,
                };
                warn!(err = %err, "merge abort failed, halting");
                Transition::Done(UpdateOutcome::AbortFailed {
                    branch,
                    pull_exit_code,
                    abort_exit_code,
                })
            }
        }
    }

    fn build<C: Confirm + ?Sized>(&self, branch: &str, confirm: &mut C) -> Transition {
        let branch = branch.to_string();
        let prompt = format!("The merge of '{branch}' was a success. Build it now?");
        if !confirm.confirm(&prompt) {
            return Transition::Done(UpdateOutcome::MergedNoBuild { branch });
        }

        let outcome = match self.builder.build(&self.build) {
            Ok(report) if report.success() => UpdateOutcome::BuildSucceeded { branch, report },
            Ok(report) => UpdateOutcome::BuildFailed { branch, report },
            Err(err @ BuildError::ToolchainMissing { .. }) => UpdateOutcome::ToolchainMissing {
                branch,
                detail: err.to_string(),
            },
            Err(err @ BuildError::Interrupted(_)) => UpdateOutcome::BuildInterrupted {
                branch,
                detail: err.to_string(),
            },
        };
        Transition::Done(outcome)
    }
}

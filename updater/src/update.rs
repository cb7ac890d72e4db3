//! Entry points that wire a settings snapshot to real git and build adapters.
//!
//! These are what the CLI calls. Each one takes the immutable [`Settings`]
//! for the invocation, validates the repository once, and holds the
//! repository's run-lock for as long as the working copy may be touched.

use anyhow::{Result, anyhow, bail};
use tracing::{info, warn};

use crate::core::branch::validate_branch_name;
use crate::core::outcome::UpdateOutcome;
use crate::core::types::BuildReport;
use crate::error::BuildError;
use crate::io::branches::{BranchCatalog, BranchListing};
use crate::io::build::{Builder, ToolchainBuilder};
use crate::io::config::Settings;
use crate::io::git::Git;
use crate::io::lock::RunLock;
use crate::io::process::{ProcessRunner, SystemRunner};
use crate::orchestrator::{Confirm, UpdateOrchestrator};

/// Current branch and remote branches of the configured repository.
pub fn list_branches(settings: &Settings) -> Result<BranchListing> {
    list_branches_with(settings, SystemRunner)
}

pub fn list_branches_with<R: ProcessRunner>(settings: &Settings, runner: R) -> Result<BranchListing> {
    settings.ensure_repository()?;
    let mut catalog = BranchCatalog::new(Git::new(&settings.repository, runner));
    Ok(catalog.listing().clone())
}

/// Merge `branch` into the configured repository and optionally build it.
pub fn run_update<C: Confirm + ?Sized>(
    settings: &Settings,
    branch: &str,
    confirm: &mut C,
) -> Result<UpdateOutcome> {
    run_update_with(settings, branch, confirm, SystemRunner)
}

pub fn run_update_with<C, R>(
    settings: &Settings,
    branch: &str,
    confirm: &mut C,
    runner: R,
) -> Result<UpdateOutcome>
where
    C: Confirm + ?Sized,
    R: ProcessRunner + Clone,
{
    settings.ensure_repository()?;
    validate_branch_name(branch).map_err(|msg| anyhow!(msg))?;
    let _lock = RunLock::acquire(&settings.repository)?;

    let mut catalog = BranchCatalog::new(Git::new(&settings.repository, runner.clone()));
    check_mergeable(&mut catalog, branch)?;

    info!(branch, repository = %settings.repository.display(), "starting update");
    let orchestrator = UpdateOrchestrator::new(
        Git::new(&settings.repository, runner.clone()).with_options(settings.vcs_options()),
        ToolchainBuilder::new(settings.toolchain.clone(), runner),
        settings.build_request(),
    );
    Ok(orchestrator.run(branch, confirm))
}

/// Refuse to merge the checked-out branch into itself.
///
/// A branch missing from the remote-tracking refs is allowed: the fetch that
/// starts the update may bring it in.
fn check_mergeable<R: ProcessRunner>(catalog: &mut BranchCatalog<Git<R>>, branch: &str) -> Result<()> {
    let listing = catalog.listing();
    if listing.current.as_deref() == Some(branch) {
        bail!("'{branch}' is the current branch; pick another branch to merge");
    }
    if !listing.remote.iter().any(|b| b == branch) {
        warn!(branch, "branch not among known remote branches; relying on fetch");
    }
    Ok(())
}

/// Run the build toolchain alone against the configured repository.
pub fn run_build(settings: &Settings) -> Result<Result<BuildReport, BuildError>> {
    run_build_with(settings, SystemRunner)
}

pub fn run_build_with<R: ProcessRunner>(
    settings: &Settings,
    runner: R,
) -> Result<Result<BuildReport, BuildError>> {
    settings.ensure_repository()?;
    let _lock = RunLock::acquire(&settings.repository)?;
    let builder = ToolchainBuilder::new(settings.toolchain.clone(), runner);
    Ok(builder.build(&settings.build_request()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::UpdaterConfig;
    use crate::io::lock::lock_path;
    use crate::test_support::{ScriptedRunner, outcome, outcome_with_output};

    fn settings(root: &std::path::Path) -> Settings {
        UpdaterConfig::default().snapshot(root)
    }

    #[test]
    fn rejects_merging_current_branch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(vec![
            Ok(outcome_with_output(0, "main\n", "")),
            Ok(outcome_with_output(0, "main\nfeature\n", "")),
        ]);

        let err = run_update_with(&settings(temp.path()), "main", &mut |_: &str| true, &runner)
            .unwrap_err();
        assert!(err.to_string().contains("current branch"));
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn rejects_option_like_branch_before_running_git() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(Vec::new());

        let err = run_update_with(
            &settings(temp.path()),
            "--upload-pack=x",
            &mut |_: &str| true,
            &runner,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must not start with '-'"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn busy_repository_is_refused() {
        let temp = tempfile::tempdir().expect("tempdir");
        let _held = RunLock::acquire(temp.path()).expect("lock");
        let runner = ScriptedRunner::new(Vec::new());

        let err = run_update_with(&settings(temp.path()), "feature", &mut |_: &str| true, &runner)
            .unwrap_err();
        assert!(err.to_string().contains("already running"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn lock_is_released_after_update() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = ScriptedRunner::new(vec![
            Ok(outcome_with_output(0, "main\n", "")),
            Ok(outcome_with_output(0, "main\nfeature\n", "")),
            Ok(outcome(128)),
        ]);

        let out = run_update_with(&settings(temp.path()), "feature", &mut |_: &str| true, &runner)
            .expect("update");
        assert!(matches!(out, UpdateOutcome::FetchFailed { .. }));
        assert!(!lock_path(temp.path()).exists());
    }

    #[test]
    fn missing_repository_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gone = temp.path().join("missing");
        let runner = ScriptedRunner::new(Vec::new());

        let err = list_branches_with(&settings(&gone), &runner).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}

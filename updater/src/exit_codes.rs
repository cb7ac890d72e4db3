//! Stable exit codes for updater CLI commands.

/// Command succeeded (including a merge with the build declined).
pub const OK: i32 = 0;
/// Invalid config, arguments, busy repository, or another runner error.
pub const INVALID: i32 = 1;
/// `git fetch` failed; nothing was merged.
pub const FETCH_FAILED: i32 = 2;
/// `git pull` failed and the merge was aborted.
pub const MERGE_FAILED: i32 = 3;
/// `git merge --abort` failed; the working copy needs manual attention.
pub const ABORT_FAILED: i32 = 4;
/// git or the build toolchain could not be started.
pub const TOOL_MISSING: i32 = 5;
/// The build ran and failed, or was interrupted.
pub const BUILD_FAILED: i32 = 6;

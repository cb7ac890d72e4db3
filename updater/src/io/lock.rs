//! Per-repository run-lock.
//!
//! Fetch, pull and abort all mutate the working copy, so only one update may
//! be in flight per repository. The lock is a file created with
//! `create_new` and removed when the guard drops.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::LockError;

pub const LOCK_FILE: &str = "updater.lock";

/// Where the lock for `repository` lives: inside `.git` when it is a
/// directory, otherwise a dotfile at the repository root.
pub fn lock_path(repository: &Path) -> PathBuf {
    let git_dir = repository.join(".git");
    if git_dir.is_dir() {
        git_dir.join(LOCK_FILE)
    } else {
        repository.join(format!(".{LOCK_FILE}"))
    }
}

/// Held run-lock; dropping it releases the repository.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(repository: &Path) -> Result<Self, LockError> {
        Self::acquire_at(lock_path(repository))
    }

    pub fn acquire_at(path: PathBuf) -> Result<Self, LockError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LockError::Busy { path });
            }
            Err(source) => return Err(LockError::Io { path, source }),
        };
        if let Err(err) = writeln!(file, "{}", std::process::id()) {
            warn!(err = %err, "failed to record pid in lock file");
        }
        debug!(path = %path.display(), "run-lock acquired");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "run-lock released"),
            Err(err) => warn!(path = %self.path.display(), err = %err, "failed to remove run-lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_busy_until_release() {
        let temp = tempfile::tempdir().expect("tempdir");
        let first = RunLock::acquire(temp.path()).expect("first lock");

        let err = RunLock::acquire(temp.path()).unwrap_err();
        assert!(matches!(err, LockError::Busy { .. }));

        drop(first);
        assert!(RunLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn lock_lives_in_git_dir_when_present() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join(".git")).expect("mkdir .git");

        let lock = RunLock::acquire(temp.path()).expect("lock");
        assert_eq!(lock.path(), temp.path().join(".git").join(LOCK_FILE));
        assert!(lock.path().exists());
    }

    #[test]
    fn lock_file_is_removed_on_drop() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = {
            let lock = RunLock::acquire(temp.path()).expect("lock");
            lock.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}

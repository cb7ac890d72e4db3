//! Cached branch listing for the merge picker.
//!
//! Listing shells out to git, so results are kept until [`BranchCatalog::refresh`]
//! or [`BranchCatalog::invalidate`] is called. A path that is not a working copy
//! yields an empty listing rather than an error: there is simply nothing to offer.

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::branch::merge_candidates;
use crate::io::git::BranchSource;

/// Snapshot of the branches known to the working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BranchListing {
    pub current: Option<String>,
    pub remote: Vec<String>,
}

impl BranchListing {
    /// Remote branches other than the current one.
    pub fn candidates(&self) -> Vec<String> {
        merge_candidates(&self.remote, self.current.as_deref())
    }
}

#[derive(Debug)]
pub struct BranchCatalog<S> {
    source: S,
    cached: Option<BranchListing>,
}

impl<S: BranchSource> BranchCatalog<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    /// Cached listing, loading it on first use.
    pub fn listing(&mut self) -> &BranchListing {
        self.cached.get_or_insert_with(|| load(&self.source))
    }

    pub fn current(&mut self) -> Option<String> {
        self.listing().current.clone()
    }

    pub fn candidates(&mut self) -> Vec<String> {
        self.listing().candidates()
    }

    /// Drop the cache; the next query reloads from git.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Reload immediately and return the fresh listing.
    pub fn refresh(&mut self) -> &BranchListing {
        self.invalidate();
        self.listing()
    }
}

fn load<S: BranchSource>(source: &S) -> BranchListing {
    let current = match source.current_branch() {
        Ok(name) => Some(name),
        Err(err) => {
            warn!(err = %err, "could not determine current branch");
            None
        }
    };
    let remote = match source.remote_branches() {
        Ok(list) => list,
        Err(err) => {
            warn!(err = %err, "could not list remote branches");
            Vec::new()
        }
    };
    debug!(current = ?current, remote_count = remote.len(), "branch listing loaded");
    BranchListing { current, remote }
}

//! New-job detection.
//!
//! [`SeenIds`] remembers which job ids were in the last successful
//! strong-match snapshot and reports the ids that appeared since.  The first
//! snapshot after start-up (or after notifications are re-enabled) is adopted
//! silently as the baseline so that jobs which were already there never alert.

use std::collections::HashSet;

use crate::source::{JobId, JobItem};

/// Ids of every item in `snapshot` that has one.
pub fn snapshot_ids(snapshot: &[JobItem]) -> HashSet<JobId> {
    snapshot.iter().filter_map(|item| item.id.clone()).collect()
}

/// Ids present in `snapshot` but not in `previous`.
pub fn diff(previous: &HashSet<JobId>, snapshot: &[JobItem]) -> HashSet<JobId> {
    snapshot_ids(snapshot)
        .into_iter()
        .filter(|id| !previous.contains(id))
        .collect()
}

/// The seen-id set plus the baseline flag.
#[derive(Debug, Clone)]
pub struct SeenIds {
    ids: HashSet<JobId>,
    /// True until the first strong-match snapshot has been adopted.
    baseline: bool,
}

impl Default for SeenIds {
    fn default() -> Self {
        Self::new()
    }
}

impl SeenIds {
    pub fn new() -> Self {
        Self {
            ids: HashSet::new(),
            baseline: true,
        }
    }

    /// Forget everything and adopt the next snapshot as a fresh baseline.
    pub fn rearm(&mut self) {
        self.ids.clear();
        self.baseline = true;
    }

    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    pub fn ids(&self) -> &HashSet<JobId> {
        &self.ids
    }

    /// Compare `snapshot` with the previous one and record it as current.
    ///
    /// Returns the newly appeared ids in snapshot order.  During baseline
    /// adoption the result is always empty.  The comparison uses the set from
    /// before this call; the set is replaced afterwards.
    pub fn observe(&mut self, snapshot: &[JobItem]) -> Vec<JobId> {
        let current = snapshot_ids(snapshot);

        if self.baseline && self.ids.is_empty() {
            self.ids = current;
            self.baseline = false;
            return Vec::new();
        }

        let mut new_ids = diff(&self.ids, snapshot);
        let fresh: Vec<JobId> = snapshot
            .iter()
            .filter_map(|item| item.id.as_ref())
            .filter(|id| new_ids.remove(*id))
            .cloned()
            .collect();
        self.ids = current;
        self.baseline = false;
        fresh
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The job list shown to the user.
//!
//! [`FeedList`] is the only owner of the displayed jobs.  Fetch results are
//! folded in through [`FeedList::merge`]; the user's local edits (status,
//! assignment) are applied in place and survive background polls.

use std::collections::{BTreeMap, HashSet};

use crate::source::{FetchIntent, JobId, JobItem, Snapshot};

/// Status values a job cycles through when edited locally.
pub const STATUS_CYCLE: [&str; 4] = ["New", "Reviewed", "Applied", "Archived"];

/// What a merge did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The snapshot replaced the list wholesale.
    Replaced(usize),
    /// This many new jobs were put in front of the existing ones.
    Prepended(usize),
    /// Nothing new; the list was left exactly as it was.
    Unchanged,
}

/// Counts shown in the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub total: usize,
    pub assigned: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedList {
    items: Vec<JobItem>,
}

impl FeedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[JobItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&JobItem> {
        self.items.get(index)
    }

    pub fn position(&self, id: &JobId) -> Option<usize> {
        self.items.iter().position(|item| item.id.as_ref() == Some(id))
    }

    /// Fold a fetched snapshot into the list.
    ///
    /// Manual fetches replace the list; local edits not yet on the server are
    /// dropped on that path.  Background polls only prepend jobs whose id is
    /// not already listed, keeping existing entries (and their edits) as is.
    pub fn merge(&mut self, snapshot: Snapshot, intent: FetchIntent) -> MergeOutcome {
        match intent {
            FetchIntent::ManualAll | FetchIntent::ManualStrong => {
                self.items = snapshot;
                MergeOutcome::Replaced(self.items.len())
            }
            FetchIntent::BackgroundStrong => {
                let mut known: HashSet<JobId> =
                    self.items.iter().filter_map(|item| item.id.clone()).collect();
                let mut fresh: Vec<JobItem> = snapshot
                    .into_iter()
                    .filter(|item| match &item.id {
                        Some(id) => known.insert(id.clone()),
                        None => false,
                    })
                    .collect();

                if fresh.is_empty() {
                    return MergeOutcome::Unchanged;
                }
                let added = fresh.len();
                fresh.append(&mut self.items);
                self.items = fresh;
                MergeOutcome::Prepended(added)
            }
        }
    }

    /// Advance the status of the job at `index` to the next value in
    /// [`STATUS_CYCLE`].  Local only.
    pub fn cycle_status(&mut self, index: usize) -> Option<&JobItem> {
        let item = self.items.get_mut(index)?;
        let current = item
            .status
            .as_deref()
            .and_then(|s| STATUS_CYCLE.iter().position(|c| c.eq_ignore_ascii_case(s)))
            .unwrap_or(0);
        let next = STATUS_CYCLE[(current + 1) % STATUS_CYCLE.len()];
        item.status = Some(next.to_string());
        Some(item)
    }

    /// Assign the job at `index` to `user`, or clear the assignment if it is
    /// already theirs.  Local only.
    pub fn toggle_assignment(&mut self, index: usize, user: &str) -> Option<&JobItem> {
        let item = self.items.get_mut(index)?;
        if item.assigned_to.as_deref() == Some(user) {
            item.assigned_to = None;
        } else {
            item.assigned_to = Some(user.to_string());
        }
        Some(item)
    }

    pub fn stats(&self) -> FeedStats {
        let mut stats = FeedStats {
            total: self.items.len(),
            ..FeedStats::default()
        };
        for item in &self.items {
            if item.assigned_to.is_some() {
                stats.assigned += 1;
            }
            let status = item.status.clone().unwrap_or_else(|| "New".to_string());
            *stats.by_status.entry(status).or_default() += 1;
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

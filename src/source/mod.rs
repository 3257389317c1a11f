//! Job source abstraction layer (the relevance fetcher).
//!
//! This module defines the [`JobSource`] trait, the [`JobItem`] type, and the
//! two feed modes the dashboard can show.  Concrete sources live in
//! sub-modules: [`api`] talks to the job-listing REST API, [`sample`] holds the
//! built-in dataset shown when the API is unavailable.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory.
//! 2. Define a struct and implement [`JobSource`] for it.
//! 3. Add the `mod` line below and re-export your struct.
//! 4. Construct it in `main.rs` instead of (or in front of) `ApiSource`.
//!
//! The diffing, merging and alerting code is source-agnostic.

mod api;
mod job_item;
pub mod sample;

pub use api::ApiSource;
pub use job_item::{JobId, JobItem};

use crate::error::FetchError;

/// The ordered list of jobs returned by one fetch.  Never persisted.
pub type Snapshot = Vec<JobItem>;

/// Which server-side list the dashboard is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedMode {
    /// Every job listing, unfiltered.
    All,
    /// Only jobs the server classified as a strong match.
    #[default]
    StrongMatch,
}

impl FeedMode {
    /// Path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            FeedMode::All => "/job-listings/",
            FeedMode::StrongMatch => "/job-listings/relevance/strong",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            FeedMode::All => FeedMode::StrongMatch,
            FeedMode::StrongMatch => FeedMode::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeedMode::All => "All jobs",
            FeedMode::StrongMatch => "Strong matches",
        }
    }
}

/// Why a fetch was started.  Decides merge-vs-replace and whether the loading
/// indicator is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchIntent {
    /// Initial load, manual refresh or mode switch in "All" mode.
    ManualAll,
    /// Initial load, manual refresh or mode switch in strong-match mode.
    ManualStrong,
    /// Timer-driven poll.  Only ever runs in strong-match mode.
    BackgroundStrong,
}

impl FetchIntent {
    /// The intent for a user-initiated fetch in `mode`.
    pub fn manual(mode: FeedMode) -> Self {
        match mode {
            FeedMode::All => FetchIntent::ManualAll,
            FeedMode::StrongMatch => FetchIntent::ManualStrong,
        }
    }

    pub fn mode(self) -> FeedMode {
        match self {
            FetchIntent::ManualAll => FeedMode::All,
            FetchIntent::ManualStrong | FetchIntent::BackgroundStrong => FeedMode::StrongMatch,
        }
    }

    pub fn is_background(self) -> bool {
        matches!(self, FetchIntent::BackgroundStrong)
    }
}

/// Trait that every job source must implement.
///
/// [`fetch()`](JobSource::fetch) is called from the runtime's blocking pool,
/// so implementations must be [`Send`] + [`Sync`].  A fetch is idempotent and
/// safe to repeat; there is no retry policy inside a source.
pub trait JobSource: Send + Sync {
    /// Human-readable label shown in the status bar.
    fn name(&self) -> &str;

    /// Fetch the current server-side list for `mode`.
    fn fetch(&self, mode: FeedMode) -> Result<Snapshot, FetchError>;
}

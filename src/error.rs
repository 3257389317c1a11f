//! Error kinds for the feed subsystem.
//!
//! None of these are fatal to the dashboard.  Each one degrades to stale or
//! sample data, or to an in-app-only message.  `anyhow` is only used at the
//! application edge in `main.rs`.

use thiserror::Error;

/// A fetch from the job-listing API failed.
///
/// The next scheduled poll or manual refresh is the retry mechanism.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("API returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Failures on the notification side: permissions and alert construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification permission was denied")]
    PermissionDenied,
    #[error("permission request failed: {0}")]
    PermissionRequest(String),
    #[error("could not show desktop alert: {0}")]
    Construction(String),
}

/// The preferences file could not be read or written.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preferences I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("preferences format: {0}")]
    Json(#[from] serde_json::Error),
}

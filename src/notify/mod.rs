//! Alerting for newly matched jobs.
//!
//! Two independent channels:
//!
//! * a desktop alert, behind the platform's permission gate
//!   ([`PermissionProvider`]) and presenter ([`AlertPresenter`]);
//! * an in-app toast, which is always emitted.
//!
//! Failure of the desktop channel never suppresses the toast and never reaches
//! the caller.  The platform is only reached through the two traits so tests
//! can substitute fakes.

mod desktop;

pub use desktop::{DesktopAlerts, DesktopPermission};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::source::{JobId, JobItem};
use crate::toast::Toasts;

/// Longest title shown in an alert, in characters.
pub const TITLE_MAX: usize = 100;
/// Longest description shown in an alert, in characters.
pub const DESCRIPTION_MAX: usize = 200;
/// Desktop alerts close themselves after this long.
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(10);
/// Shared tag so the desktop coalesces our alerts instead of stacking them.
pub const ALERT_TAG: &str = "jobfeed-new-job";

const ELLIPSIS: &str = "...";

/// Platform notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; a request is needed.
    Default,
    /// The platform has no notification capability.
    Unsupported,
}

/// A desktop alert, fully built and ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub job_id: Option<JobId>,
    pub summary: String,
    pub body: String,
    pub tag: &'static str,
    pub silent: bool,
    pub timeout: Duration,
}

impl Alert {
    pub fn for_job(item: &JobItem) -> Self {
        let title = truncate(item.display_title(), TITLE_MAX);
        let summary = format!("New strong match: {title}");
        let body = match item.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => format!("{title}\n{}", truncate(d, DESCRIPTION_MAX)),
            _ => title,
        };
        Self {
            job_id: item.id.clone(),
            summary,
            body,
            tag: ALERT_TAG,
            silent: false,
            timeout: ALERT_TIMEOUT,
        }
    }
}

/// Access to the platform's permission state.
pub trait PermissionProvider: Send + Sync {
    /// Current state, without asking anyone.
    fn permission(&self) -> Permission;

    /// Ask for permission.  May block; the app calls it off the UI thread.
    fn request(&self) -> Result<Permission, NotifyError>;
}

/// Something that can put an [`Alert`] on screen.
pub trait AlertPresenter {
    /// Whether the platform has a notification capability at all.
    fn is_supported(&self) -> bool;

    fn show(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// How a notification ended up being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Desktop alert shown, plus the toast.
    Desktop,
    /// Preconditions for a desktop alert did not hold; toast only.
    InAppOnly,
    /// The desktop alert failed; an error toast was added.
    DesktopFailed(NotifyError),
}

/// Decides whether an alert may be shown and shows it.
pub struct NotificationGate {
    presenter: Box<dyn AlertPresenter>,
    permissions: Arc<dyn PermissionProvider>,
}

impl NotificationGate {
    pub fn new(presenter: Box<dyn AlertPresenter>, permissions: Arc<dyn PermissionProvider>) -> Self {
        Self {
            presenter,
            permissions,
        }
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionProvider> {
        &self.permissions
    }

    /// Announce a newly seen job on both channels.  Never fails.
    pub fn notify(&self, item: &JobItem, toasts: &mut Toasts) -> Delivery {
        let delivery = if !self.presenter.is_supported()
            || self.permissions.permission() != Permission::Granted
        {
            Delivery::InAppOnly
        } else {
            let alert = Alert::for_job(item);
            match self.presenter.show(&alert) {
                Ok(()) => {
                    debug!(id = ?item.id, "desktop alert shown");
                    Delivery::Desktop
                }
                Err(e) => {
                    warn!(id = ?item.id, error = %e, "desktop alert failed");
                    toasts.error(format!("Desktop alert failed: {e}"));
                    Delivery::DesktopFailed(e)
                }
            }
        };

        toasts.info(format!(
            "New strong match: {}",
            truncate(item.display_title(), TITLE_MAX)
        ));
        delivery
    }
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Test doubles, shared with the app tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub mod fake {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every alert it is asked to show.
    #[derive(Clone, Default)]
    pub struct RecordingPresenter {
        pub shown: Arc<Mutex<Vec<Alert>>>,
        pub unsupported: bool,
        pub fail: bool,
    }

    impl RecordingPresenter {
        pub fn shown_ids(&self) -> Vec<String> {
            self.shown
                .lock()
                .unwrap()
                .iter()
                .filter_map(|a| a.job_id.as_ref().map(|id| id.to_string()))
                .collect()
        }
    }

    impl AlertPresenter for RecordingPresenter {
        fn is_supported(&self) -> bool {
            !self.unsupported
        }

        fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Construction("boom".into()));
            }
            self.shown.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    /// Permission state that tests can set; `request` answers with `answer`.
    pub struct FakePermission {
        pub state: Mutex<Permission>,
        pub answer: Mutex<Result<Permission, NotifyError>>,
        pub requests: Mutex<usize>,
    }

    impl FakePermission {
        pub fn new(state: Permission) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(state),
                answer: Mutex::new(Ok(Permission::Granted)),
                requests: Mutex::new(0),
            })
        }

        pub fn answering(state: Permission, answer: Result<Permission, NotifyError>) -> Arc<Self> {
            let fake = Self::new(state);
            *fake.answer.lock().unwrap() = answer;
            fake
        }
    }

    impl PermissionProvider for FakePermission {
        fn permission(&self) -> Permission {
            *self.state.lock().unwrap()
        }

        fn request(&self) -> Result<Permission, NotifyError> {
            *self.requests.lock().unwrap() += 1;
            let answer = self.answer.lock().unwrap().clone();
            if let Ok(p) = &answer {
                *self.state.lock().unwrap() = *p;
            }
            answer
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

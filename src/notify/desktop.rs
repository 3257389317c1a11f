//! Desktop notification backend, via `notify-rust`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use notify_rust::{Notification, Timeout};
use tracing::{debug, warn};

use super::{Alert, AlertPresenter, Permission, PermissionProvider};
use crate::error::NotifyError;
use crate::prefs::PrefsStore;
use crate::source::JobId;

const APP_NAME: &str = "jobfeed";
const ICON: &str = "dialog-information";
const SOUND: &str = "message-new-instant";

/// Invoked with the job id when the user clicks an alert.
pub type ClickHandler = Arc<dyn Fn(JobId) + Send + Sync>;

/// Shows alerts through the desktop notification service.
pub struct DesktopAlerts {
    enabled: bool,
    on_click: ClickHandler,
    clicks: Arc<Mutex<ClickRouter>>,
}

impl DesktopAlerts {
    pub fn new(enabled: bool, on_click: ClickHandler) -> Self {
        Self {
            enabled,
            on_click,
            clicks: Arc::default(),
        }
    }

    /// One watcher per on-screen notification.  Alerts share a replace-id, so
    /// a new alert updates the job the existing watcher opens on click.
    #[cfg(all(unix, not(target_os = "macos")))]
    fn watch_clicks(&self, handle: notify_rust::NotificationHandle, job_id: Option<JobId>) {
        let notification = handle.id();
        if !lock(&self.clicks).shown(notification, job_id) {
            return;
        }
        let clicks = Arc::clone(&self.clicks);
        let on_click = Arc::clone(&self.on_click);
        std::thread::spawn(move || {
            handle.wait_for_action(|action| {
                let job = lock(&clicks).finished(notification, action);
                if let Some(job) = job {
                    debug!(%job, "alert clicked");
                    on_click(job);
                }
            });
        });
    }
}

/// Tracks which job the visible alert stands for.
#[derive(Debug, Default)]
struct ClickRouter {
    watched: Option<u32>,
    job: Option<JobId>,
}

#[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
impl ClickRouter {
    /// Record the job now shown under `notification`.  Returns true when that
    /// notification has no watcher yet.
    fn shown(&mut self, notification: u32, job: Option<JobId>) -> bool {
        self.job = job;
        if self.watched == Some(notification) {
            false
        } else {
            self.watched = Some(notification);
            true
        }
    }

    /// The watcher for `notification` saw `action` and is done.  Returns the
    /// job to open when the action was a click on the current alert.
    fn finished(&mut self, notification: u32, action: &str) -> Option<JobId> {
        if self.watched != Some(notification) {
            return None;
        }
        self.watched = None;
        let job = self.job.take();
        if action == "default" {
            job
        } else {
            None
        }
    }
}

#[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
fn lock(clicks: &Mutex<ClickRouter>) -> MutexGuard<'_, ClickRouter> {
    clicks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AlertPresenter for DesktopAlerts {
    fn is_supported(&self) -> bool {
        self.enabled
    }

    fn show(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(&alert.summary)
            .body(&alert.body)
            .icon(ICON)
            .timeout(Timeout::Milliseconds(millis(alert.timeout)));
        if !alert.silent {
            notification.sound_name(SOUND);
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // Same replace-id for every alert carrying the same tag.  Not
            // resident, so the server closes the alert once it is clicked.
            notification
                .id(tag_id(alert.tag))
                .action("default", "Open")
                .hint(notify_rust::Hint::Resident(false));
            let handle = notification
                .show()
                .map_err(|e| NotifyError::Construction(e.to_string()))?;
            self.watch_clicks(handle, alert.job_id.clone());
        }

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        {
            let _ = (&self.on_click, &self.clicks);
            notification
                .show()
                .map(drop)
                .map_err(|e| NotifyError::Construction(e.to_string()))?;
        }

        Ok(())
    }
}

/// Permission state backed by the preferences file.
///
/// A terminal has no permission prompt, so a request probes the desktop
/// notification service and records the outcome.  A decision already stored
/// in the preferences (`--desktop-alerts allow|deny`) is returned as is.
pub struct DesktopPermission {
    state: Mutex<Permission>,
    store: Option<PrefsStore>,
}

impl DesktopPermission {
    pub fn new(initial: Permission, store: Option<PrefsStore>) -> Self {
        Self {
            state: Mutex::new(initial),
            store,
        }
    }

    fn set(&self, permission: Permission) {
        match self.state.lock() {
            Ok(mut state) => *state = permission,
            Err(poisoned) => *poisoned.into_inner() = permission,
        }
    }
}

impl PermissionProvider for DesktopPermission {
    fn permission(&self) -> Permission {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn request(&self) -> Result<Permission, NotifyError> {
        let current = self.permission();
        if matches!(current, Permission::Granted | Permission::Denied) {
            return Ok(current);
        }

        let decided = probe_notification_service();
        self.set(decided);
        if decided == Permission::Granted {
            if let Some(store) = &self.store {
                if let Err(e) = store.update(|p| p.desktop_permission = Some(decided)) {
                    warn!(error = %e, "could not persist desktop permission");
                }
            }
        }
        Ok(decided)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn probe_notification_service() -> Permission {
    permission_from_probe(
        notify_rust::get_server_information()
            .map(|info| {
                debug!(server = %info.name, version = %info.version, "notification service found");
            })
            .map_err(|e| e.to_string()),
    )
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn probe_notification_service() -> Permission {
    debug!("assuming native notification support");
    permission_from_probe(Ok(()))
}

/// A reachable service grants; an unreachable one means no capability.
fn permission_from_probe(probe: Result<(), String>) -> Permission {
    match probe {
        Ok(()) => Permission::Granted,
        Err(error) => {
            warn!(%error, "desktop notification service unreachable");
            Permission::Unsupported
        }
    }
}

fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

/// FNV-1a of the tag; used as the desktop replace-id.
fn tag_id(tag: &str) -> u32 {
    tag.bytes().fold(0x811c_9dc5_u32, |hash, b| {
        (hash ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

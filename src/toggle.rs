//! The notifications on/off switch.
//!
//! Enabling may need a permission request, which completes later through
//! [`ToggleController::permission_resolved`].  Every successful transition
//! persists the preference and re-arms the new-job baseline, so the first
//! fetch after enabling never alerts for jobs that were already listed.

use tracing::{error, info, warn};

use crate::diff::SeenIds;
use crate::error::NotifyError;
use crate::notify::{Permission, PermissionProvider};
use crate::prefs::PrefsStore;
use crate::toast::Toasts;

/// Result of a toggle action, for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled,
    Disabled,
    /// A permission request must be started; the answer arrives later.
    PermissionRequested,
    /// Permission was refused (or the platform cannot notify).
    Refused,
    /// Nothing changed.
    Unchanged,
}

pub struct ToggleController {
    enabled: bool,
    awaiting_permission: bool,
    store: Option<PrefsStore>,
}

impl ToggleController {
    pub fn new(enabled: bool, store: Option<PrefsStore>) -> Self {
        Self {
            enabled,
            awaiting_permission: false,
            store,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_awaiting_permission(&self) -> bool {
        self.awaiting_permission
    }

    pub fn enable(
        &mut self,
        permissions: &dyn PermissionProvider,
        seen: &mut SeenIds,
        toasts: &mut Toasts,
    ) -> ToggleOutcome {
        if permissions.permission() == Permission::Granted {
            self.turn_on(seen, toasts);
            return ToggleOutcome::Enabled;
        }
        if self.awaiting_permission {
            return ToggleOutcome::Unchanged;
        }
        self.awaiting_permission = true;
        info!("requesting notification permission");
        ToggleOutcome::PermissionRequested
    }

    /// Finish an [`enable`](Self::enable) that needed a permission request.
    pub fn permission_resolved(
        &mut self,
        result: Result<Permission, NotifyError>,
        seen: &mut SeenIds,
        toasts: &mut Toasts,
    ) -> ToggleOutcome {
        if !self.awaiting_permission {
            // Disabled again while the request was in flight.
            return ToggleOutcome::Unchanged;
        }
        self.awaiting_permission = false;

        match result {
            Ok(Permission::Granted) => {
                self.turn_on(seen, toasts);
                ToggleOutcome::Enabled
            }
            Ok(Permission::Unsupported) => {
                self.enabled = false;
                toasts.error("Desktop notifications are not supported here");
                ToggleOutcome::Refused
            }
            Ok(other) => {
                let refused = NotifyError::PermissionDenied;
                warn!(permission = ?other, "{refused}");
                self.enabled = false;
                toasts.error(format!("Cannot enable job alerts: {refused}"));
                ToggleOutcome::Refused
            }
            Err(e) => {
                error!(error = %e, "notification permission request failed");
                ToggleOutcome::Unchanged
            }
        }
    }

    /// Always succeeds.
    pub fn disable(&mut self, seen: &mut SeenIds, toasts: &mut Toasts) -> ToggleOutcome {
        self.enabled = false;
        self.awaiting_permission = false;
        seen.rearm();
        self.persist();
        info!("notifications disabled");
        toasts.info("Job notifications disabled");
        ToggleOutcome::Disabled
    }

    fn turn_on(&mut self, seen: &mut SeenIds, toasts: &mut Toasts) {
        self.enabled = true;
        seen.rearm();
        self.persist();
        info!("notifications enabled");
        toasts.success("Job notifications enabled");
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let enabled = self.enabled;
        if let Err(e) = store.update(|p| p.notifications_enabled = enabled) {
            warn!(error = %e, "could not save notification preference");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::fake::FakePermission;
    use crate::source::JobItem;

    fn snap(ids: &[&str]) -> Vec<JobItem> {
        ids.iter().map(|id| JobItem::new(id, "t")).collect()
    }

    fn store() -> (tempfile::TempDir, PrefsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("prefs.json"));
        (dir, store)
    }

    #[test]
    fn enable_with_granted_permission_arms_and_persists() {
        let (_dir, store) = store();
        let mut toggle = ToggleController::new(false, Some(store.clone()));
        let mut seen = SeenIds::new();
        seen.observe(&snap(&["1"]));
        let mut toasts = Toasts::new();

        let outcome = toggle.enable(&*FakePermission::new(Permission::Granted), &mut seen, &mut toasts);

        assert_eq!(outcome, ToggleOutcome::Enabled);
        assert!(toggle.is_enabled());
        assert!(seen.is_baseline());
        assert!(seen.ids().is_empty());
        assert!(store.load().unwrap().notifications_enabled);
        assert_eq!(toasts.len(), 1);
    }

    #[test]
    fn enable_without_permission_asks_once() {
        let perms = FakePermission::new(Permission::Default);
        let mut toggle = ToggleController::new(false, None);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();

        assert_eq!(
            toggle.enable(&*perms, &mut seen, &mut toasts),
            ToggleOutcome::PermissionRequested
        );
        assert_eq!(
            toggle.enable(&*perms, &mut seen, &mut toasts),
            ToggleOutcome::Unchanged
        );
        assert!(toggle.is_awaiting_permission());
        assert!(!toggle.is_enabled());
    }

    #[test]
    fn granted_answer_enables() {
        let mut toggle = ToggleController::new(false, None);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        toggle.enable(&*FakePermission::new(Permission::Default), &mut seen, &mut toasts);

        let outcome = toggle.permission_resolved(Ok(Permission::Granted), &mut seen, &mut toasts);
        assert_eq!(outcome, ToggleOutcome::Enabled);
        assert!(toggle.is_enabled());
        assert!(!toggle.is_awaiting_permission());
    }

    #[test]
    fn denied_answer_leaves_disabled_with_error_toast() {
        let mut toggle = ToggleController::new(false, None);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        toggle.enable(&*FakePermission::new(Permission::Default), &mut seen, &mut toasts);

        let outcome = toggle.permission_resolved(Ok(Permission::Denied), &mut seen, &mut toasts);
        assert_eq!(outcome, ToggleOutcome::Refused);
        assert!(!toggle.is_enabled());
        assert_eq!(
            toasts.iter().last().unwrap().level,
            crate::toast::ToastLevel::Error
        );
    }

    #[test]
    fn unreachable_notification_service_is_refused() {
        let mut toggle = ToggleController::new(false, None);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        toggle.enable(&*FakePermission::new(Permission::Default), &mut seen, &mut toasts);

        let outcome =
            toggle.permission_resolved(Ok(Permission::Unsupported), &mut seen, &mut toasts);
        assert_eq!(outcome, ToggleOutcome::Refused);
        assert!(!toggle.is_enabled());
        assert!(!toggle.is_awaiting_permission());
    }

    #[test]
    fn request_error_leaves_state_unchanged() {
        let (_dir, store) = store();
        let mut toggle = ToggleController::new(false, Some(store.clone()));
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        toggle.enable(&*FakePermission::new(Permission::Default), &mut seen, &mut toasts);

        let outcome = toggle.permission_resolved(
            Err(NotifyError::PermissionRequest("no bus".into())),
            &mut seen,
            &mut toasts,
        );
        assert_eq!(outcome, ToggleOutcome::Unchanged);
        assert!(!toggle.is_enabled());
        assert!(!store.path().exists(), "nothing persisted");
    }

    #[test]
    fn disable_persists_and_rearms() {
        let (_dir, store) = store();
        let mut toggle = ToggleController::new(true, Some(store.clone()));
        let mut seen = SeenIds::new();
        seen.observe(&snap(&["1", "2"]));
        let mut toasts = Toasts::new();

        assert_eq!(toggle.disable(&mut seen, &mut toasts), ToggleOutcome::Disabled);
        assert!(!toggle.is_enabled());
        assert!(seen.is_baseline());
        assert!(!store.load().unwrap().notifications_enabled);
    }

    #[test]
    fn answer_arriving_after_disable_is_ignored() {
        let mut toggle = ToggleController::new(false, None);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        toggle.enable(&*FakePermission::new(Permission::Default), &mut seen, &mut toasts);
        toggle.disable(&mut seen, &mut toasts);

        let outcome = toggle.permission_resolved(Ok(Permission::Granted), &mut seen, &mut toasts);
        assert_eq!(outcome, ToggleOutcome::Unchanged);
        assert!(!toggle.is_enabled());
    }

    #[test]
    fn disable_then_enable_suppresses_alerts_for_unchanged_list() {
        let mut toggle = ToggleController::new(true, None);
        let perms = FakePermission::new(Permission::Granted);
        let mut seen = SeenIds::new();
        let mut toasts = Toasts::new();
        seen.observe(&snap(&["1", "2"]));

        toggle.disable(&mut seen, &mut toasts);
        toggle.enable(&*perms, &mut seen, &mut toasts);

        assert!(seen.observe(&snap(&["1", "2"])).is_empty());
        assert_eq!(seen.observe(&snap(&["1", "2", "3"])).len(), 1);
    }
}

//! Application state and the feed pipeline.
//!
//! [`App`] owns everything the dashboard shows and is only touched from the UI
//! thread.  Background results arrive as [`FeedMsg`]s through
//! [`App::handle`], which runs the fetch → diff → notify → merge pipeline.

use std::time::Instant;

use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use crate::diff::SeenIds;
use crate::error::{FetchError, NotifyError};
use crate::feed::{FeedList, MergeOutcome};
use crate::notify::{NotificationGate, Permission};
use crate::poll::{FeedMsg, PollScheduler, TimerId, Worker};
use crate::source::{sample, FeedMode, FetchIntent, JobId, Snapshot};
use crate::toast::Toasts;
use crate::toggle::{ToggleController, ToggleOutcome};

pub struct App {
    /// The jobs on screen.
    pub feed: FeedList,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last fetch status message.
    pub status: String,
    /// In-app transient messages.
    pub toasts: Toasts,
    /// Which list is shown.
    pub mode: FeedMode,
    /// True while the feed holds the built-in sample data.
    pub showing_sample: bool,
    /// Name used for local assignment.
    pub user: String,
    /// Manual fetches in flight; drives the loading indicator.
    loading: usize,
    seen: SeenIds,
    toggle: ToggleController,
    gate: NotificationGate,
    scheduler: PollScheduler,
    worker: Worker,
}

impl App {
    pub fn new(
        mode: FeedMode,
        user: impl Into<String>,
        toggle: ToggleController,
        gate: NotificationGate,
        scheduler: PollScheduler,
        worker: Worker,
    ) -> Self {
        Self {
            feed: FeedList::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            toasts: Toasts::new(),
            mode,
            showing_sample: false,
            user: user.into(),
            loading: 0,
            seen: SeenIds::new(),
            toggle,
            gate,
            scheduler,
            worker,
        }
    }

    /// Initial load, and start polling if the saved preference says so.
    pub fn start(&mut self) {
        self.fetch_manual();
        self.scheduler.sync(self.toggle.is_enabled(), self.mode);
    }

    /// Stop the poll timer.  Called on the way out.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
    }

    // -- queries -------------------------------------------------------------

    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }

    pub fn notifications_enabled(&self) -> bool {
        self.toggle.is_enabled()
    }

    pub fn awaiting_permission(&self) -> bool {
        self.toggle.is_awaiting_permission()
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn seen(&self) -> &SeenIds {
        &self.seen
    }

    // -- user actions --------------------------------------------------------

    pub fn refresh(&mut self) {
        self.fetch_manual();
    }

    /// Switch between strong matches and all jobs.  Always a wholesale fetch.
    pub fn switch_mode(&mut self) {
        self.mode = self.mode.toggled();
        info!(mode = ?self.mode, "feed mode switched");
        self.scheduler.sync(self.toggle.is_enabled(), self.mode);
        self.fetch_manual();
    }

    pub fn toggle_notifications(&mut self) {
        if self.toggle.is_enabled() || self.toggle.is_awaiting_permission() {
            self.toggle.disable(&mut self.seen, &mut self.toasts);
            self.after_toggle(ToggleOutcome::Disabled);
            return;
        }

        let permissions = self.gate.permissions().clone();
        let outcome = self
            .toggle
            .enable(permissions.as_ref(), &mut self.seen, &mut self.toasts);
        if outcome == ToggleOutcome::PermissionRequested {
            self.toasts.info("Requesting notification permission…");
            self.worker.request_permission(permissions);
        }
        self.after_toggle(outcome);
    }

    pub fn cycle_status_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        if let Some(item) = self.feed.cycle_status(index) {
            self.status = format!(
                "Status of \"{}\" set to {} (local)",
                item.display_title(),
                item.status.as_deref().unwrap_or("-")
            );
        }
    }

    pub fn assign_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let user = self.user.clone();
        if let Some(item) = self.feed.toggle_assignment(index, &user) {
            self.status = match &item.assigned_to {
                Some(who) => format!("Assigned \"{}\" to {who} (local)", item.display_title()),
                None => format!("Unassigned \"{}\" (local)", item.display_title()),
            };
        }
    }

    /// Housekeeping on every main-loop tick.
    pub fn on_frame(&mut self, now: Instant) {
        self.toasts.expire(now);
    }

    // -- background results --------------------------------------------------

    pub fn handle(&mut self, msg: FeedMsg) {
        match msg {
            FeedMsg::Tick { timer } => self.on_tick(timer),
            FeedMsg::Fetched { intent, result } => self.on_fetched(intent, result),
            FeedMsg::PermissionResolved(result) => self.on_permission(result),
            FeedMsg::AlertClicked(id) => self.on_alert_clicked(&id),
        }
    }

    fn on_tick(&mut self, timer: TimerId) {
        if !self.scheduler.accept_tick(timer) {
            return;
        }
        if self.toggle.is_enabled() && self.mode == FeedMode::StrongMatch {
            self.worker.fetch(FetchIntent::BackgroundStrong);
        }
    }

    fn on_fetched(&mut self, intent: FetchIntent, result: Result<Snapshot, FetchError>) {
        if !intent.is_background() {
            self.loading = self.loading.saturating_sub(1);
        }
        match result {
            Ok(snapshot) => self.apply_snapshot(intent, snapshot),
            Err(e) => self.apply_failure(intent, &e),
        }
    }

    /// Diff, alert, merge.
    fn apply_snapshot(&mut self, intent: FetchIntent, snapshot: Snapshot) {
        let mut alerted = 0;
        if intent.mode() == FeedMode::StrongMatch {
            let fresh = self.seen.observe(&snapshot);
            debug!(?intent, new = fresh.len(), "strong-match snapshot diffed");
            if self.toggle.is_enabled() {
                for id in &fresh {
                    if let Some(item) = snapshot.iter().find(|i| i.id.as_ref() == Some(id)) {
                        self.gate.notify(item, &mut self.toasts);
                        alerted += 1;
                    }
                }
            }
        }

        // A snapshot for the list that is no longer shown only feeds the diff.
        if intent.mode() != self.mode {
            debug!(?intent, "snapshot for hidden mode not merged");
            return;
        }

        // Real data never gets merged into the sample list; it replaces it.
        let merge_as = if self.showing_sample {
            FetchIntent::manual(intent.mode())
        } else {
            intent
        };
        self.showing_sample = false;
        match self.feed.merge(snapshot, merge_as) {
            MergeOutcome::Replaced(count) => {
                self.clamp_selection();
                self.status = format!("Fetched {count} jobs from {}", self.worker.source_name());
            }
            MergeOutcome::Prepended(count) => {
                self.shift_selection(count);
                self.status = format!("{count} new jobs");
            }
            MergeOutcome::Unchanged => {}
        }
        if alerted > 0 {
            info!(alerted, "new strong matches announced");
        }
    }

    fn apply_failure(&mut self, intent: FetchIntent, error: &FetchError) {
        warn!(?intent, %error, "fetch failed");
        self.status = format!("API unavailable: {error}");
        if intent.is_background() {
            // Keep the current list; the next tick retries.
            return;
        }
        self.toasts
            .warning(format!("API unavailable ({error}); showing sample data"));
        if intent.mode() == self.mode {
            self.feed.merge(sample::sample_jobs(self.mode), intent);
            self.showing_sample = true;
            self.clamp_selection();
        }
    }

    fn on_permission(&mut self, result: Result<Permission, NotifyError>) {
        if let Err(e) = &result {
            self.toasts
                .error(format!("Could not request notification permission: {e}"));
        }
        let outcome = self
            .toggle
            .permission_resolved(result, &mut self.seen, &mut self.toasts);
        self.after_toggle(outcome);
    }

    fn on_alert_clicked(&mut self, id: &JobId) {
        let Some(index) = self.feed.position(id) else {
            return;
        };
        self.list_state.select(Some(index));
        if let Some(item) = self.feed.get(index) {
            self.status = format!("Opened alert: {}", item.display_title());
        }
    }

    fn after_toggle(&mut self, outcome: ToggleOutcome) {
        let changed = self.scheduler.sync(self.toggle.is_enabled(), self.mode);
        // Take the baseline right away instead of waiting a full period.
        if outcome == ToggleOutcome::Enabled && changed {
            self.worker.fetch(FetchIntent::BackgroundStrong);
        }
    }

    fn fetch_manual(&mut self) {
        self.loading += 1;
        self.status = format!("Loading {}…", self.mode.label().to_lowercase());
        self.worker.fetch(FetchIntent::manual(self.mode));
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.feed.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.feed.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.feed.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.feed.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.feed.is_empty() {
            self.list_state.select(Some(self.feed.len() - 1));
        }
    }

    fn clamp_selection(&mut self) {
        match (self.list_state.selected(), self.feed.len()) {
            (_, 0) => self.list_state.select(None),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// Keep the same job selected after `count` jobs were put in front.
    fn shift_selection(&mut self, count: usize) {
        if let Some(i) = self.list_state.selected() {
            self.list_state.select(Some(i + count));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::notify::fake::{FakePermission, RecordingPresenter};
    use crate::poll::POLL_INTERVAL;
    use crate::source::{JobItem, JobSource};

    /// Serves whatever snapshot was queued last; fails when told to.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub next: Mutex<Option<Result<Snapshot, FetchError>>>,
        pub calls: Mutex<Vec<FeedMode>>,
    }

    impl JobSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch(&self, mode: FeedMode) -> Result<Snapshot, FetchError> {
            self.calls.lock().unwrap().push(mode);
            self.next.lock().unwrap().clone().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub(crate) struct Harness {
        pub app: App,
        pub rx: mpsc::Receiver<FeedMsg>,
        pub presenter: RecordingPresenter,
        pub permissions: Arc<FakePermission>,
        pub source: Arc<FakeSource>,
        // Dropped last so background tasks have somewhere to run.
        pub runtime: tokio::runtime::Runtime,
    }

    pub(crate) fn snap(ids: &[&str]) -> Snapshot {
        ids.iter().map(|id| JobItem::new(id, format!("Job {id}"))).collect()
    }

    pub(crate) fn harness(enabled: bool, permission: Permission) -> Harness {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        let source = Arc::new(FakeSource::default());
        let presenter = RecordingPresenter::default();
        let permissions = FakePermission::new(permission);

        let gate = NotificationGate::new(Box::new(presenter.clone()), permissions.clone());
        let scheduler = PollScheduler::new(runtime.handle().clone(), tx.clone(), POLL_INTERVAL);
        let worker = Worker::new(runtime.handle().clone(), tx, source.clone());
        let app = App::new(
            FeedMode::StrongMatch,
            "ana",
            ToggleController::new(enabled, None),
            gate,
            scheduler,
            worker,
        );
        Harness {
            app,
            rx,
            presenter,
            permissions,
            source,
            runtime,
        }
    }

    impl Harness {
        fn deliver(&mut self, intent: FetchIntent, ids: &[&str]) {
            self.app.handle(FeedMsg::Fetched {
                intent,
                result: Ok(snap(ids)),
            });
        }

        fn feed_ids(&self) -> Vec<String> {
            self.app
                .feed
                .items()
                .iter()
                .filter_map(|i| i.id.as_ref().map(|id| id.to_string()))
                .collect()
        }

        /// Wait for the next message from a background task and handle it.
        fn pump(&mut self) -> bool {
            match self.rx.recv_timeout(Duration::from_secs(5)) {
                Ok(msg) => {
                    self.app.handle(msg);
                    true
                }
                Err(_) => false,
            }
        }
    }

    #[test]
    fn first_fetch_is_baseline_then_only_new_jobs_alert() {
        let mut h = harness(true, Permission::Granted);

        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);
        assert!(h.presenter.shown_ids().is_empty());
        assert!(!h.app.seen().is_baseline());

        h.deliver(FetchIntent::BackgroundStrong, &["1", "2", "3"]);
        assert_eq!(h.presenter.shown_ids(), vec!["3"]);
        assert_eq!(h.feed_ids(), vec!["3", "1", "2"]);
        assert_eq!(h.app.seen().ids().len(), 3);
    }

    #[test]
    fn disabled_notifications_never_alert_but_feed_updates() {
        let mut h = harness(false, Permission::Granted);

        h.deliver(FetchIntent::ManualStrong, &["1"]);
        h.deliver(FetchIntent::ManualStrong, &["2", "1"]);
        h.deliver(FetchIntent::ManualStrong, &["3", "2", "1"]);

        assert!(h.presenter.shown_ids().is_empty());
        assert!(h.app.toasts.is_empty(), "no in-app notifications either");
        assert_eq!(h.feed_ids(), vec!["3", "2", "1"]);
    }

    #[test]
    fn overlapping_fetches_never_alert_twice() {
        let mut h = harness(true, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1"]);

        // Manual refresh and poll both in flight, both see job 2.
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);
        h.deliver(FetchIntent::BackgroundStrong, &["1", "2", "4"]);

        assert_eq!(h.presenter.shown_ids(), vec!["2", "4"]);
        let expected: std::collections::HashSet<JobId> =
            ["1", "2", "4"].iter().filter_map(JobId::new).collect();
        assert_eq!(h.app.seen().ids(), &expected, "last pipeline wins");
    }

    #[test]
    fn switching_to_all_stops_polling_and_replaces_feed() {
        let mut h = harness(true, Permission::Granted);
        h.app.start();
        assert!(h.app.scheduler().is_running());
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);

        h.app.switch_mode();
        assert_eq!(h.app.mode, FeedMode::All);
        assert!(!h.app.scheduler().is_running());
        assert!(h.app.is_loading());

        h.deliver(FetchIntent::ManualAll, &["7", "8", "9"]);
        assert_eq!(h.feed_ids(), vec!["7", "8", "9"]);

        // A late poll result must not leak into the "All" list.
        h.deliver(FetchIntent::BackgroundStrong, &["1", "2", "5"]);
        assert_eq!(h.feed_ids(), vec!["7", "8", "9"]);

        h.app.switch_mode();
        assert!(h.app.scheduler().is_running());
    }

    #[test]
    fn failed_manual_fetch_falls_back_to_sample_data() {
        let mut h = harness(false, Permission::Granted);
        h.app.handle(FeedMsg::Fetched {
            intent: FetchIntent::ManualStrong,
            result: Err(FetchError::Status(502)),
        });

        assert!(h.app.showing_sample);
        assert_eq!(h.app.feed.items(), sample::sample_jobs(FeedMode::StrongMatch).as_slice());
        assert!(h.app.status.contains("502"));
        assert_eq!(h.app.toasts.len(), 1);
    }

    #[test]
    fn background_poll_replaces_sample_data_wholesale() {
        let mut h = harness(true, Permission::Granted);
        h.app.handle(FeedMsg::Fetched {
            intent: FetchIntent::ManualStrong,
            result: Err(FetchError::Status(502)),
        });
        assert!(h.app.showing_sample);

        h.deliver(FetchIntent::BackgroundStrong, &["10", "11"]);

        assert_eq!(h.feed_ids(), vec!["10", "11"]);
        assert!(!h.app.showing_sample);
        assert!(h.app.status.starts_with("Fetched 2 jobs"));
    }

    #[test]
    fn failed_background_poll_keeps_the_feed() {
        let mut h = harness(true, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);
        h.app.handle(FeedMsg::Fetched {
            intent: FetchIntent::BackgroundStrong,
            result: Err(FetchError::Transport("reset".into())),
        });

        assert_eq!(h.feed_ids(), vec!["1", "2"]);
        assert!(!h.app.showing_sample);
        assert_eq!(h.app.seen().ids().len(), 2);
    }

    #[test]
    fn background_merge_keeps_local_edits_and_selection() {
        let mut h = harness(true, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);
        h.app.select_last();
        h.app.assign_selected();

        h.deliver(FetchIntent::BackgroundStrong, &["3", "1", "2"]);

        let selected = h.app.list_state.selected().unwrap();
        let item = h.app.feed.get(selected).unwrap();
        assert_eq!(item.id.as_ref().unwrap().as_str(), "2");
        assert_eq!(item.assigned_to.as_deref(), Some("ana"));
    }

    #[test]
    fn manual_refresh_drops_local_edits() {
        let mut h = harness(false, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1"]);
        h.app.select_first();
        h.app.cycle_status_selected();
        assert_eq!(h.app.feed.get(0).unwrap().status.as_deref(), Some("Reviewed"));

        h.deliver(FetchIntent::ManualStrong, &["1"]);
        assert!(h.app.feed.get(0).unwrap().status.is_none());
    }

    #[test]
    fn ticks_poll_in_background_until_cancelled() {
        let mut h = harness(true, Permission::Granted);
        h.app.start();
        assert!(h.pump(), "initial load");
        let timer = h.app.scheduler().active_timer().unwrap();

        h.app.handle(FeedMsg::Tick { timer });
        assert!(!h.app.is_loading(), "background polls never show loading");
        assert!(h.pump());

        h.app.toggle_notifications(); // off
        h.app.handle(FeedMsg::Tick { timer });
        assert_eq!(
            *h.source.calls.lock().unwrap(),
            vec![FeedMode::StrongMatch, FeedMode::StrongMatch]
        );
    }

    #[test]
    fn enabling_with_permission_request_round_trip() {
        let mut h = harness(false, Permission::Default);
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);
        *h.source.next.lock().unwrap() = Some(Ok(snap(&["1", "2"])));

        h.app.toggle_notifications();
        assert!(h.app.awaiting_permission());
        assert!(h.pump(), "permission answer arrives");
        assert!(h.app.notifications_enabled());
        assert_eq!(*h.permissions.requests.lock().unwrap(), 1);
        assert!(h.app.scheduler().is_running());

        // The immediate baseline fetch: existing jobs never alert.
        assert!(h.pump());
        assert!(h.presenter.shown_ids().is_empty());

        h.deliver(FetchIntent::BackgroundStrong, &["1", "2", "3"]);
        assert_eq!(h.presenter.shown_ids(), vec!["3"]);
    }

    #[test]
    fn denied_permission_keeps_notifications_off() {
        let mut h = harness(false, Permission::Default);
        *h.permissions.answer.lock().unwrap() = Ok(Permission::Denied);

        h.app.toggle_notifications();
        assert!(h.pump());
        assert!(!h.app.notifications_enabled());
        assert!(!h.app.scheduler().is_running());
    }

    #[test]
    fn disable_then_enable_rearms_baseline() {
        let mut h = harness(true, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1", "2"]);

        h.app.toggle_notifications(); // off
        h.app.toggle_notifications(); // on
        assert!(h.app.seen().is_baseline());

        h.deliver(FetchIntent::BackgroundStrong, &["1", "2", "3"]);
        assert!(h.presenter.shown_ids().is_empty(), "first fetch after enable is baseline");
    }

    #[test]
    fn alert_click_selects_the_job() {
        let mut h = harness(true, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1", "2", "3"]);
        h.app.handle(FeedMsg::AlertClicked(JobId::new("3").unwrap()));
        assert_eq!(h.app.list_state.selected(), Some(2));
    }

    #[test]
    fn real_fetch_round_trip_through_worker() {
        let mut h = harness(false, Permission::Granted);
        *h.source.next.lock().unwrap() = Some(Ok(snap(&["10", "11"])));
        h.app.start();
        assert!(h.app.is_loading());

        assert!(h.pump());
        assert!(!h.app.is_loading());
        assert_eq!(h.feed_ids(), vec!["10", "11"]);
        assert_eq!(*h.source.calls.lock().unwrap(), vec![FeedMode::StrongMatch]);
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn navigation_on_empty_feed_is_noop() {
        let mut h = harness(false, Permission::Granted);
        h.app.select_next();
        h.app.select_previous();
        h.app.select_first();
        h.app.select_last();
        assert!(h.app.list_state.selected().is_none());
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut h = harness(false, Permission::Granted);
        h.app.mode = FeedMode::All;
        h.deliver(FetchIntent::ManualAll, &["1", "2", "3"]);

        h.app.select_next();
        assert_eq!(h.app.list_state.selected(), Some(0));
        h.app.select_last();
        h.app.select_next();
        assert_eq!(h.app.list_state.selected(), Some(2));
        h.app.select_first();
        h.app.select_previous();
        assert_eq!(h.app.list_state.selected(), Some(0));
    }

    #[test]
    fn selection_is_clamped_when_feed_shrinks() {
        let mut h = harness(false, Permission::Granted);
        h.deliver(FetchIntent::ManualStrong, &["1", "2", "3"]);
        h.app.select_last();
        h.deliver(FetchIntent::ManualStrong, &["1"]);
        assert_eq!(h.app.list_state.selected(), Some(0));
        h.deliver(FetchIntent::ManualStrong, &[]);
        assert!(h.app.list_state.selected().is_none());
    }
}

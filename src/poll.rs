//! Background work: the poll timer, fetches and permission requests.
//!
//! Everything slow runs on the tokio runtime and reports back to the UI
//! thread over an [`mpsc`] channel as a [`FeedMsg`].  The UI thread drains the
//! channel on every tick of the main loop and runs the fetch → diff → notify
//! → merge pipeline there, so feed state is only ever touched by one thread.
//!
//! ## Poll scheduler
//!
//! [`PollScheduler`] is a two-state machine (`Idle`, `Running`).  It owns at
//! most one timer task.  Starting while running cancels the old timer first.
//! Every tick carries the [`TimerId`] of the timer that produced it, and
//! [`PollScheduler::accept_tick`] rejects ticks from cancelled timers, so a
//! tick already sitting in the channel when the timer is cancelled is ignored.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{FetchError, NotifyError};
use crate::notify::{Permission, PermissionProvider};
use crate::source::{FeedMode, FetchIntent, JobId, JobSource, Snapshot};

/// How often the strong-match list is re-fetched while notifications are on.
pub const POLL_INTERVAL: Duration = Duration::from_secs(90);

/// Messages sent from background tasks to the UI thread.
#[derive(Debug)]
pub enum FeedMsg {
    /// The poll timer fired.
    Tick { timer: TimerId },
    /// A fetch finished.
    Fetched {
        intent: FetchIntent,
        result: Result<Snapshot, FetchError>,
    },
    /// A notification permission request finished.
    PermissionResolved(Result<Permission, NotifyError>),
    /// The user clicked the desktop alert for this job.
    AlertClicked(JobId),
}

/// Identity of one timer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct ActiveTimer {
    id: TimerId,
    task: JoinHandle<()>,
    next_tick: DateTime<Local>,
}

/// Repeating, cancelable poll timer.
pub struct PollScheduler {
    runtime: Handle,
    tx: mpsc::Sender<FeedMsg>,
    period: Duration,
    next_id: u64,
    active: Option<ActiveTimer>,
}

impl PollScheduler {
    pub fn new(runtime: Handle, tx: mpsc::Sender<FeedMsg>, period: Duration) -> Self {
        Self {
            runtime,
            tx,
            period,
            next_id: 0,
            active: None,
        }
    }

    /// Polling only runs while notifications are on and the strong-match list
    /// is shown.  Starts or stops the timer to match; a timer that should keep
    /// running is left alone.  Returns whether the state changed.
    pub fn sync(&mut self, notifications_enabled: bool, mode: FeedMode) -> bool {
        let should_run = notifications_enabled && mode == FeedMode::StrongMatch;
        match (should_run, self.is_running()) {
            (true, false) => {
                self.start();
                true
            }
            (false, true) => {
                self.stop();
                true
            }
            _ => false,
        }
    }

    /// Enter `Running` with a fresh timer, cancelling any previous one.
    pub fn start(&mut self) {
        self.stop();

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.tx.clone();
        let period = self.period;

        let task = self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // The UI thread has gone away.
                if tx.send(FeedMsg::Tick { timer: id }).is_err() {
                    return;
                }
            }
        });

        info!(timer = id.0, period_secs = period.as_secs(), "poll scheduler running");
        self.active = Some(ActiveTimer {
            id,
            task,
            next_tick: next_tick_from_now(period),
        });
    }

    /// Enter `Idle`.  No tick from the cancelled timer will be accepted.
    pub fn stop(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.task.abort();
            info!(timer = timer.id.0, "poll scheduler idle");
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Wall-clock time of the next expected tick, for display.
    pub fn next_tick(&self) -> Option<DateTime<Local>> {
        self.active.as_ref().map(|t| t.next_tick)
    }

    #[cfg(test)]
    pub(crate) fn active_timer(&self) -> Option<TimerId> {
        self.active.as_ref().map(|t| t.id)
    }

    /// Whether a tick from `timer` should trigger a poll.
    pub fn accept_tick(&mut self, timer: TimerId) -> bool {
        let period = self.period;
        match self.active.as_mut() {
            Some(active) if active.id == timer => {
                active.next_tick = next_tick_from_now(period);
                true
            }
            _ => {
                debug!(timer = timer.0, "ignoring tick from cancelled timer");
                false
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn next_tick_from_now(period: Duration) -> DateTime<Local> {
    let step = chrono::Duration::from_std(period).unwrap_or(chrono::Duration::zero());
    Local::now() + step
}

/// Runs fetches and permission requests off the UI thread.
#[derive(Clone)]
pub struct Worker {
    runtime: Handle,
    tx: mpsc::Sender<FeedMsg>,
    source: Arc<dyn JobSource>,
}

impl Worker {
    pub fn new(runtime: Handle, tx: mpsc::Sender<FeedMsg>, source: Arc<dyn JobSource>) -> Self {
        Self {
            runtime,
            tx,
            source,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Fetch the list for `intent` and post the result.  Overlapping fetches
    /// are allowed.
    pub fn fetch(&self, intent: FetchIntent) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        debug!(?intent, "fetch scheduled");
        self.runtime.spawn_blocking(move || {
            let result = source.fetch(intent.mode());
            let _ = tx.send(FeedMsg::Fetched { intent, result });
        });
    }

    /// Ask for permission on the blocking pool.  A request that panics
    /// resolves as a request error.
    pub fn request_permission(&self, permissions: Arc<dyn PermissionProvider>) {
        let tx = self.tx.clone();
        let request = self.runtime.spawn_blocking(move || permissions.request());
        self.runtime.spawn(async move {
            let result = request
                .await
                .unwrap_or_else(|e| Err(NotifyError::PermissionRequest(e.to_string())));
            let _ = tx.send(FeedMsg::PermissionResolved(result));
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

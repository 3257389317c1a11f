//! jobfeed: a live job feed for the terminal with new-match alerts.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────────┐  FeedMsg   ┌──────────┐  draw()  ┌──────────┐
//! │   poll.rs    │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tokio tasks)│  (channel) │ (state)  │          │ (render) │
//! └──────────────┘            └──────────┘          └──────────┘
//!        ▲                     ▲      │
//!        │ fetch / timer       │      │ diff.rs, feed.rs, notify/
//!   ┌──────────┐         ┌──────────┐
//!   │ source/  │         │ input.rs │
//!   └──────────┘         └──────────┘
//! ```
//!
//! * **`source/`**: the `JobSource` trait, the REST implementation and the
//!   sample fallback data.
//! * **`poll`**: the poll scheduler and the worker that runs fetches and
//!   permission requests on the tokio runtime.
//! * **`diff`**: detects newly appeared job ids.
//! * **`feed`**: the displayed job list and its merge rules.
//! * **`notify/`**: desktop alerts and the permission gate.
//! * **`toggle`**: the notifications on/off switch.
//! * **`app`**: owns all application state and runs the pipeline.
//! * **`ui`** / **`input`**: rendering and key handling.
//! * **`main`**: wires everything together: parse args, set up logging and
//!   the terminal, and run the event loop.

mod app;
mod config;
mod diff;
mod error;
mod feed;
mod input;
mod logging;
mod notify;
mod poll;
mod prefs;
mod source;
mod toast;
mod toggle;
mod ui;

use std::io;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use app::App;
use config::Args;
use notify::{DesktopAlerts, DesktopPermission, NotificationGate, Permission};
use poll::{FeedMsg, PollScheduler, Worker, POLL_INTERVAL};
use prefs::PrefsStore;
use source::{ApiSource, FeedMode, JobSource};
use toggle::ToggleController;

// ---------------------------------------------------------------------------
// RAII terminal guard: cleanup runs even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = Args::parse();

    // -- logging (best effort: the UI still runs without it) -----------------
    if let Some(path) = args.log_file.clone().or_else(logging::default_log_path) {
        if let Err(e) = logging::init(&path) {
            eprintln!("logging disabled: {e:#}");
        }
    }

    install_panic_hook();

    // -- preferences ---------------------------------------------------------
    let store = args
        .prefs
        .clone()
        .or_else(PrefsStore::default_path)
        .map(PrefsStore::new);
    let mut prefs = store
        .as_ref()
        .map(PrefsStore::load_or_default)
        .unwrap_or_default();
    if let Some(decision) = args.desktop_alerts.decision() {
        prefs.desktop_permission = Some(decision);
        if let Some(store) = &store {
            if let Err(e) = store.save(&prefs) {
                warn!(error = %e, "could not save desktop permission");
            }
        }
    }
    info!(
        enabled = prefs.notifications_enabled,
        permission = ?prefs.desktop_permission,
        "preferences loaded"
    );

    // -- runtime, channel and collaborators ----------------------------------
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let (tx, rx) = mpsc::channel::<FeedMsg>();

    let source: Arc<dyn JobSource> = Arc::new(ApiSource::new(&args.api_base)?);
    let worker = Worker::new(runtime.handle().clone(), tx.clone(), source);
    let scheduler = PollScheduler::new(runtime.handle().clone(), tx.clone(), POLL_INTERVAL);

    let permissions = Arc::new(DesktopPermission::new(
        prefs.desktop_permission.unwrap_or(Permission::Default),
        store.clone(),
    ));
    let click_tx = tx.clone();
    let presenter = DesktopAlerts::new(
        !args.no_desktop,
        Arc::new(move |id| {
            let _ = click_tx.send(FeedMsg::AlertClicked(id));
        }),
    );
    let gate = NotificationGate::new(Box::new(presenter), permissions);
    let toggle = ToggleController::new(prefs.notifications_enabled, store);

    let mut app = App::new(
        FeedMode::from(args.mode),
        args.user.clone(),
        toggle,
        gate,
        scheduler,
        worker,
    );
    app.start();

    // -- terminal setup (Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain any messages from background tasks.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = rx.try_recv() {
            app.handle(msg);
        }
        app.on_frame(Instant::now());

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    app.shutdown();
    info!("shutting down");
    // Don't wait on fetches still blocked on the network.
    runtime.shutdown_background();
    Ok(())
}

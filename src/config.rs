//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::notify::Permission;
use crate::source::FeedMode;

#[derive(Debug, Clone, Parser)]
#[command(name = "jobfeed", version, about = "Live job feed with new-match alerts")]
pub struct Args {
    /// Base URL of the job-listing API.
    #[arg(long, env = "JOBFEED_API_BASE", default_value = "http://localhost:8000/api")]
    pub api_base: String,

    /// Which list to show on start.
    #[arg(long, value_enum, default_value_t = ModeArg::Strong)]
    pub mode: ModeArg,

    /// Name used when assigning a job to yourself.
    #[arg(long, env = "USER", default_value = "me")]
    pub user: String,

    /// Preferences file (defaults to the platform config directory).
    #[arg(long)]
    pub prefs: Option<PathBuf>,

    /// Log file (the terminal is taken by the UI).
    #[arg(long, env = "JOBFEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Pre-set the desktop notification permission.
    #[arg(long, value_enum, default_value_t = AlertsArg::Ask)]
    pub desktop_alerts: AlertsArg,

    /// Never show desktop alerts; in-app messages only.
    #[arg(long)]
    pub no_desktop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Strong,
    All,
}

impl From<ModeArg> for FeedMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strong => FeedMode::StrongMatch,
            ModeArg::All => FeedMode::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlertsArg {
    Allow,
    Deny,
    /// Keep whatever was decided before; probe the desktop on first enable.
    Ask,
}

impl AlertsArg {
    /// The permission decision this flag stores, if any.
    pub fn decision(self) -> Option<Permission> {
        match self {
            AlertsArg::Allow => Some(Permission::Granted),
            AlertsArg::Deny => Some(Permission::Denied),
            AlertsArg::Ask => None,
        }
    }
}

//! Persisted user preferences.
//!
//! A small JSON file holding the notifications on/off switch and the desktop
//! permission decision.  Everything else is session state and is rebuilt on
//! start.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PrefsError;
use crate::notify::Permission;

const PREFS_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub notifications_enabled: bool,
    pub desktop_permission: Option<Permission>,
}

/// Reads and writes [`Preferences`] at a fixed path.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/jobfeed/preferences.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("jobfeed").join(PREFS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is not an error; it yields the defaults.
    pub fn load(&self) -> Result<Preferences, PrefsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`load`](Self::load) but falls back to defaults on a corrupt or
    /// unreadable file.
    pub fn load_or_default(&self) -> Preferences {
        self.load().unwrap_or_else(|e| {
            warn!(path = %self.path().display(), error = %e, "ignoring unreadable preferences");
            Preferences::default()
        })
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Read-modify-write.
    pub fn update(&self, change: impl FnOnce(&mut Preferences)) -> Result<Preferences, PrefsError> {
        let mut prefs = self.load_or_default();
        change(&mut prefs);
        self.save(&prefs)?;
        Ok(prefs)
    }
}

//! The job record shared by every part of the feed.
//!
//! `JobItem` is what the job-listing API returns, normalised so that the rest
//! of the application (diffing, merging, alerting, rendering) never has to care
//! whether the server sent numeric or string identifiers.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const UNTITLED: &str = "Untitled job";

/// Canonical job identifier.
///
/// The server may send `42` or `"42"` for the same job; both become
/// `JobId("42")` so set membership works across fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single job listing.
///
/// Only `id`, `title` and `description` are interpreted by the feed logic.
/// Everything else is carried through for display.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobItem {
    /// Missing or `null` ids are kept as `None`; such items never alert and
    /// never take part in de-duplication.
    #[serde(default, deserialize_with = "deserialize_job_id")]
    pub id: Option<JobId>,

    /// Empty when the server sends no title or `null`.
    #[serde(default, alias = "job_title", deserialize_with = "deserialize_title")]
    pub title: String,

    #[serde(default, alias = "job_description", deserialize_with = "deserialize_text")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub status: Option<String>,

    #[serde(default)]
    pub amount: Option<serde_json::Value>,

    #[serde(default, alias = "assigned_user", deserialize_with = "deserialize_text")]
    pub assigned_to: Option<String>,

    /// When the job was posted.  Unparseable dates degrade to `None`.
    #[serde(
        default,
        alias = "job_posted_on_date",
        alias = "created_at",
        deserialize_with = "deserialize_posted"
    )]
    pub posted_on: Option<DateTime<Utc>>,

    /// Any other attributes the server sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobItem {
    pub fn new(id: impl AsRef<str>, title: impl Into<String>) -> Self {
        Self {
            id: JobId::new(id),
            title: title.into(),
            description: None,
            status: None,
            amount: None,
            assigned_to: None,
            posted_on: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Title for display; untitled jobs get a placeholder.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// `amount` rendered for the list view, whatever JSON type the server used.
    pub fn amount_label(&self) -> Option<String> {
        match self.amount.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// Display fields are pass-through: a wrong JSON type degrades to `None` or
// its textual form, it never fails the whole listing.

fn deserialize_job_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Some(JobId(u.to_string()))
            } else if let Some(i) = n.as_i64() {
                Some(JobId(i.to_string()))
            } else {
                match n.as_f64() {
                    // 42.0 and 42 are the same job.
                    Some(f) if f.is_finite() && f.fract() == 0.0 => {
                        Some(JobId(format!("{}", f as i64)))
                    }
                    Some(f) => Some(JobId(f.to_string())),
                    None => None,
                }
            }
        }
        Value::String(s) => JobId::new(s),
        // null, booleans, arrays and objects identify nothing.
        _ => None,
    })
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn deserialize_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_text(deserializer)?.unwrap_or_default())
}

fn deserialize_posted<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::String(s) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(parse_timestamp(&s))
}

/// Accepts RFC 3339 and the naive ISO form the API emits without an offset.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

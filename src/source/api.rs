//! REST API job source.
//!
//! Issues a plain `GET {api_base}/job-listings/...` and decodes the JSON body.
//! Authentication is handled outside this layer.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{FeedMode, JobItem, JobSource, Snapshot};
use crate::error::FetchError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches job listings from the dashboard's backend API.
pub struct ApiSource {
    /// Base URL, e.g. `http://localhost:8000/api`.
    pub api_base: String,
    client: reqwest::blocking::Client,
}

/// The API normally returns a bare array, but some deployments wrap it.
///
/// Items stay raw here so one bad entry cannot fail the whole listing.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Bare(Vec<Value>),
    Items { items: Vec<Value> },
    Jobs { jobs: Vec<Value> },
}

impl ApiSource {
    pub fn new(api_base: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            api_base: api_base.into(),
            client,
        })
    }

    pub fn url_for(&self, mode: FeedMode) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), mode.path())
    }

    /// Decode a response body into a snapshot.
    ///
    /// Pure function (no I/O) so tests can exercise decoding without a server.
    /// Entries that are not job objects are skipped with a warning.
    pub fn parse_snapshot(body: &[u8]) -> Result<Snapshot, FetchError> {
        let body: ListingBody =
            serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
        let raw = match body {
            ListingBody::Bare(items) => items,
            ListingBody::Items { items } => items,
            ListingBody::Jobs { jobs } => jobs,
        };
        Ok(raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<JobItem>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(index, error = %e, "skipping undecodable job entry");
                    None
                }
            })
            .collect())
    }
}

impl JobSource for ApiSource {
    fn name(&self) -> &str {
        "API"
    }

    fn fetch(&self, mode: FeedMode) -> Result<Snapshot, FetchError> {
        let url = self.url_for(mode);
        debug!(%url, "fetching job listings");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes()?;
        Self::parse_snapshot(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

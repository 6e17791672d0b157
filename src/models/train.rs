use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Body of `POST /api/v1/search/check-seat-availability`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub dep_station: String,
    pub arr_station: String,
    /// `YYYY-MM-DD`
    pub dep_date: String,
}

/// Response to a search start request.
#[derive(Debug, Deserialize)]
pub struct SearchStarted {
    pub result_id: String,
}

/// Job handle issued by the external search service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchJobId(String);

impl SearchJobId {
    /// Returns `None` for an empty or whitespace-only handle.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `GET /api/v1/search/results/{job_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSearchResult {
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Status reported by the external search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Completed,
    Error,
    /// Any other value; the search is still in progress.
    Pending(String),
}

impl RemoteStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "COMPLETED" => RemoteStatus::Completed,
            "ERROR" => RemoteStatus::Error,
            other => RemoteStatus::Pending(other.to_string()),
        }
    }
}

/// Terminal outcome of polling an external search job.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Remote status `COMPLETED`; carries the train data.
    Completed(serde_json::Value),
    /// Remote status `ERROR`; carries the remote error description.
    RemoteError(String),
    /// The attempt budget ran out without a terminal remote status.
    TimedOut { attempts: u32, budget: Duration },
    /// A single poll attempt failed at the transport level.
    Transport(String),
}

impl SearchOutcome {
    /// Train entries of a completed search, if the payload carries a list.
    ///
    /// Accepts either a bare array or an object with a `trains` array.
    pub fn trains(&self) -> Option<&[serde_json::Value]> {
        match self {
            SearchOutcome::Completed(serde_json::Value::Array(items)) => Some(items),
            SearchOutcome::Completed(serde_json::Value::Object(map)) => map
                .get("trains")
                .and_then(|v| v.as_array())
                .map(|v| v.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Completed(data) => {
                write!(f, "Search completed. Train information: {}", data)
            }
            SearchOutcome::RemoteError(err) => write!(f, "Search failed. Error: {}", err),
            SearchOutcome::TimedOut { budget, .. } => write!(
                f,
                "Search timed out. The result is still pending after {} seconds.",
                budget.as_secs()
            ),
            SearchOutcome::Transport(err) => write!(f, "Error getting search results: {}", err),
        }
    }
}

/// Renders a remote `data` field as text, unquoting plain strings.
pub fn data_to_text(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "unknown error".to_string(),
        other => other.to_string(),
    }
}

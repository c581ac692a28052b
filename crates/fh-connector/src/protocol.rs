//! Protocol definitions for the filtered stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connector::ConnectorError;

/// Query parameters appended to the stream endpoint
pub const STREAM_QUERY: [(&str, &str); 2] = [("tweet.fields", "created_at"), ("expansions", "author_id")];

/// Build the stream URL: `{base_uri}?tweet.fields=created_at&expansions=author_id`
pub fn stream_url(base_uri: &str) -> Result<url::Url, ConnectorError> {
    let mut url = url::Url::parse(base_uri)
        .map_err(|e| ConnectorError::ConnectionFailed(format!("Invalid URL: {}", e)))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in STREAM_QUERY {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Session state.
///
/// `Idle -> Connecting -> Streaming -> Closed`. `Closed` ends a session;
/// the next `run()` starts over at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session started yet
    Idle,
    /// Handshake in progress
    Connecting,
    /// Reading the body
    Streaming,
    /// Session over
    Closed,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Remote closed the stream normally
    Ended,
    /// Response carried no body
    NoBody,
    /// Shutdown was requested mid-stream
    Stopped,
    /// Handshake or read failure
    Failed(String),
}

/// Summary of one `run()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    /// 1-based session counter of the connector
    pub session: u64,

    pub outcome: SessionOutcome,

    /// Lines seen, heartbeats included
    pub lines_read: u64,

    /// Blank keep-alive lines skipped
    pub heartbeats: u64,

    /// Appends handed to the store
    pub records_dispatched: u64,

    /// Appends the store accepted
    pub records_persisted: u64,

    /// Appends that errored or panicked
    pub append_failures: u64,

    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl SessionReport {
    /// Fresh report for a starting session
    pub fn new(session: u64) -> Self {
        Self {
            session,
            outcome: SessionOutcome::Ended,
            lines_read: 0,
            heartbeats: 0,
            records_dispatched: 0,
            records_persisted: 0,
            append_failures: 0,
            started_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Whether the session ended on an error
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Failed(_))
    }
}

//! Stream Connector — long-lived connection to the filtered stream

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use fh_core::{FirehoseConfig, Shutdown};
use fh_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::RwLock;

use crate::dispatch::AppendDispatcher;
use crate::lines::{LineSplitter, DEFAULT_MAX_LINE_BYTES};
use crate::protocol::{ConnectionState, SessionOutcome, SessionReport};
use crate::source::{ByteStream, HttpStreamSource, StreamSource};

/// Reads the stream line by line and hands each record to the event store.
///
/// `run()` never retries and never returns an error: every failure closes
/// the session and is reported in the returned [`SessionReport`]. Callers
/// decide whether to start another session.
pub struct StreamConnector {
    /// Byte source (HTTP in production)
    source: Arc<dyn StreamSource>,

    /// Persistence sink
    store: Arc<dyn EventStore>,

    /// Current session state
    state: Arc<RwLock<ConnectionState>>,

    /// Sessions started so far
    sessions: AtomicU64,

    /// Append concurrency cap per session
    max_inflight: usize,

    /// Optional stop signal checked between records
    shutdown: Option<Shutdown>,

    /// Longest accepted line
    max_line_bytes: usize,

    /// Fail the session after this long without bytes
    idle_timeout: Option<Duration>,
}

impl StreamConnector {
    /// Create a connector over any source
    pub fn new(source: Arc<dyn StreamSource>, store: Arc<dyn EventStore>, max_inflight: usize) -> Self {
        Self {
            source,
            store,
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
            sessions: AtomicU64::new(0),
            max_inflight,
            shutdown: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            idle_timeout: None,
        }
    }

    /// Create a connector against the configured HTTP endpoint
    pub fn http(config: &FirehoseConfig, store: Arc<dyn EventStore>) -> Result<Self, ConnectorError> {
        let source = HttpStreamSource::new(config)?;
        Ok(Self::new(Arc::new(source), store, config.max_inflight_appends)
            .with_max_line_bytes(config.max_line_bytes)
            .with_idle_timeout(config.read_idle_timeout()))
    }

    /// Stop reading when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fail the session when a line grows past `max_line_bytes`
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Fail the session when the stream is silent for `idle` (heartbeats
    /// count as traffic). `None` waits forever.
    pub fn with_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Get the current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Number of sessions started
    pub fn session_count(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    /// Run one session to completion.
    ///
    /// Intended for a dedicated task: it returns only when the remote closes
    /// the stream, a read fails, or shutdown is requested.
    pub async fn run(&self) -> SessionReport {
        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let mut report = SessionReport::new(session);
        *self.state.write().await = ConnectionState::Connecting;
        log::info!("[Connector] Session {} connecting to {}", session, self.source.describe());

        let stream = match self.source.open().await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                log::info!("[Connector] Session {} response has no body", session);
                report.outcome = SessionOutcome::NoBody;
                return self.close(report).await;
            }
            Err(e) => {
                log::error!("[Connector] Session {} failed to connect: {}", session, e);
                report.outcome = SessionOutcome::Failed(e.to_string());
                return self.close(report).await;
            }
        };

        *self.state.write().await = ConnectionState::Streaming;
        log::info!("[Connector] Started streaming at {}", Utc::now());

        let mut dispatcher = AppendDispatcher::new(Arc::clone(&self.store), self.max_inflight);
        let outcome = self.read_loop(stream, &mut dispatcher, &mut report).await;
        report.outcome = outcome;

        let stats = dispatcher.drain().await;
        report.records_dispatched = stats.dispatched;
        report.records_persisted = stats.persisted;
        report.append_failures = stats.failed;

        if let SessionOutcome::Failed(reason) = &report.outcome {
            log::error!("[Connector] Exception occurred during streaming: {}", reason);
        }
        self.close(report).await
    }

    async fn read_loop(
        &self,
        mut stream: ByteStream,
        dispatcher: &mut AppendDispatcher,
        report: &mut SessionReport,
    ) -> SessionOutcome {
        let mut splitter = LineSplitter::with_limit(self.max_line_bytes);

        loop {
            let next = match &self.shutdown {
                Some(shutdown) => tokio::select! {
                    chunk = Self::next_chunk(&mut stream, self.idle_timeout) => chunk,
                    _ = shutdown.triggered() => return SessionOutcome::Stopped,
                },
                None => Self::next_chunk(&mut stream, self.idle_timeout).await,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Err(e) = Self::handle_chunk(&chunk, &mut splitter, dispatcher, report).await {
                        return SessionOutcome::Failed(e.to_string());
                    }
                }
                Some(Err(e)) => return SessionOutcome::Failed(e.to_string()),
                None => {
                    if let Some(line) = splitter.finish() {
                        Self::handle_line(line, dispatcher, report).await;
                    }
                    return SessionOutcome::Ended;
                }
            }
        }
    }

    async fn next_chunk(
        stream: &mut ByteStream,
        idle: Option<Duration>,
    ) -> Option<Result<Bytes, ConnectorError>> {
        match idle {
            Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => Some(Err(ConnectorError::Idle(limit))),
            },
            None => stream.next().await,
        }
    }

    async fn handle_chunk(
        chunk: &Bytes,
        splitter: &mut LineSplitter,
        dispatcher: &mut AppendDispatcher,
        report: &mut SessionReport,
    ) -> Result<(), ConnectorError> {
        for line in splitter.push(chunk)? {
            Self::handle_line(line, dispatcher, report).await;
        }
        Ok(())
    }

    /// Forward one line; blank keep-alive lines are skipped
    async fn handle_line(line: String, dispatcher: &mut AppendDispatcher, report: &mut SessionReport) {
        report.lines_read += 1;
        if line.is_empty() {
            report.heartbeats += 1;
            log::trace!("[Connector] Heartbeat");
            return;
        }
        log::debug!("[Connector] Streaming out {}", line);
        dispatcher.dispatch(line, Utc::now()).await;
    }

    async fn close(&self, mut report: SessionReport) -> SessionReport {
        *self.state.write().await = ConnectionState::Closed;
        report.closed_at = Some(Utc::now());
        log::info!(
            "[Connector] Streaming closed (session {}, {} record(s), {} heartbeat(s))",
            report.session,
            report.records_dispatched,
            report.heartbeats
        );
        report
    }
}

/// Connector errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Read error: {0}")]
    Read(String),

    #[error("No data received for {0:?}")]
    Idle(Duration),
}

//! Append dispatcher — moves persistence off the read loop
//!
//! Each record becomes its own blocking task in a `JoinSet`. A semaphore caps
//! the number in flight; the read loop only waits when that cap is reached.
//! Completion order is not arrival order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fh_core::{EventRecord, FirehoseResult};
use fh_store::EventStore;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Completed-append tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub persisted: u64,
    pub failed: u64,
}

/// Bounded fire-and-forget writer for one stream session
pub struct AppendDispatcher {
    store: Arc<dyn EventStore>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<FirehoseResult<EventRecord>>,
    stats: DispatchStats,
}

impl AppendDispatcher {
    /// Create a dispatcher allowing `max_inflight` concurrent appends
    pub fn new(store: Arc<dyn EventStore>, max_inflight: usize) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_inflight.max(1))),
            tasks: JoinSet::new(),
            stats: DispatchStats::default(),
        }
    }

    /// Queue one append; returns once a slot is available
    pub async fn dispatch(&mut self, raw: String, at: DateTime<Utc>) {
        self.reap();

        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // The semaphore is owned here and never closed
            return;
        };
        let store = Arc::clone(&self.store);
        self.tasks.spawn_blocking(move || {
            let _permit = permit;
            store.append(&raw, at)
        });
        self.stats.dispatched += 1;
    }

    /// Appends still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Tallies so far (completed tasks only are counted as persisted/failed)
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Wait for every outstanding append and return the final tallies
    pub async fn drain(mut self) -> DispatchStats {
        while let Some(result) = self.tasks.join_next().await {
            self.record(result);
        }
        self.stats
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.record(result);
        }
    }

    fn record(&mut self, result: Result<FirehoseResult<EventRecord>, JoinError>) {
        match result {
            Ok(Ok(_)) => self.stats.persisted += 1,
            Ok(Err(e)) => {
                self.stats.failed += 1;
                log::warn!("[Connector] Append rejected: {}", e);
            }
            Err(e) => {
                self.stats.failed += 1;
                log::error!("[Connector] Append task failed: {}", e);
            }
        }
    }
}

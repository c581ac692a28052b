//! In-memory event store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use fh_core::{EventRecord, EventView, FirehoseError, FirehoseResult, Page};
use parking_lot::RwLock;

use crate::store::{validate_page, EventStore};

/// Records keyed by `(received_at, seq)`; reverse iteration is retrieval order.
type RecordMap = BTreeMap<(DateTime<Utc>, u64), EventRecord>;

/// Event store backed by an ordered map behind a read/write lock
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    records: RwLock<RecordMap>,
    next_seq: AtomicU64,
}

impl MemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, newest first
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.read().values().rev().cloned().collect()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, raw: &str, at: DateTime<Utc>) -> FirehoseResult<EventRecord> {
        if raw.is_empty() {
            return Err(FirehoseError::Validation(
                "event record must not be empty".to_string(),
            ));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let record = EventRecord {
            id: seq,
            raw: raw.to_string(),
            received_at: at,
        };
        self.records.write().insert((at, seq), record.clone());
        log::trace!("[Store] Appended record {}", seq);
        Ok(record)
    }

    fn clear(&self) -> usize {
        let removed = std::mem::take(&mut *self.records.write()).len();
        log::debug!("[Store] Cleared {} record(s)", removed);
        removed
    }

    fn latest_top(&self, n: usize) -> Vec<EventRecord> {
        self.records.read().values().rev().take(n).cloned().collect()
    }

    fn page(&self, page_index: i64, page_size: usize) -> FirehoseResult<Page<EventView>> {
        let index = validate_page(page_index, page_size)?;
        let records = self.records.read();
        let total = records.len();
        let skip = (index as usize).saturating_mul(page_size);

        let content = records
            .values()
            .rev()
            .skip(skip)
            .take(page_size)
            .map(EventView::project)
            .collect();

        Ok(Page::new(content, index, page_size, total))
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

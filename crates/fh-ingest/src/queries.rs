//! Read API over stored records

use std::sync::Arc;

use fh_core::{EventRecord, EventView, FirehoseConfig, FirehoseResult, Page};
use fh_store::EventStore;

/// Caller-facing queries with fixed page and top-N sizes
#[derive(Clone)]
pub struct TweetQueries {
    store: Arc<dyn EventStore>,
    page_size: usize,
    latest_count: usize,
}

impl TweetQueries {
    /// Create queries sized from the config
    pub fn new(store: Arc<dyn EventStore>, config: &FirehoseConfig) -> Self {
        Self {
            store,
            page_size: config.page_size,
            latest_count: config.latest_count,
        }
    }

    /// Page `page` (0-based) of projected records, newest first
    pub fn get_old_tweets(&self, page: i64) -> FirehoseResult<Page<EventView>> {
        self.store.page(page, self.page_size)
    }

    /// The newest records, newest first
    pub fn get_latest_tweet(&self) -> Vec<EventRecord> {
        self.store.latest_top(self.latest_count)
    }

    /// Records currently stored
    pub fn count(&self) -> usize {
        self.store.len()
    }
}

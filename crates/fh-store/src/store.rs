//! Event store trait — the persistence boundary of the ingestion core

use chrono::{DateTime, Utc};
use fh_core::{EventRecord, EventView, FirehoseError, FirehoseResult, Page};

/// Storage for ingested stream lines.
///
/// Implementations must accept concurrent `append` and `clear` calls. A
/// `clear` racing in-flight appends may or may not remove them, but must
/// leave the store consistent.
pub trait EventStore: Send + Sync {
    /// Store one raw line. Empty input is rejected with
    /// [`FirehoseError::Validation`] and leaves the store untouched.
    fn append(&self, raw: &str, at: DateTime<Utc>) -> FirehoseResult<EventRecord>;

    /// Delete every record, returning how many were removed
    fn clear(&self) -> usize;

    /// At most `n` records, newest first
    fn latest_top(&self, n: usize) -> Vec<EventRecord>;

    /// The `page_index`-th page (0-based) of projected records, newest first
    fn page(&self, page_index: i64, page_size: usize) -> FirehoseResult<Page<EventView>>;

    /// Number of stored records
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check paging arguments, returning the page index as unsigned
pub fn validate_page(page_index: i64, page_size: usize) -> FirehoseResult<u64> {
    if page_index < 0 {
        return Err(FirehoseError::Validation(format!(
            "page index must be non-negative, got {page_index}"
        )));
    }
    if page_size == 0 {
        return Err(FirehoseError::Validation(
            "page size must be greater than zero".to_string(),
        ));
    }
    Ok(page_index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(0, 20).unwrap(), 0);
        assert_eq!(validate_page(3, 1).unwrap(), 3);
        assert!(validate_page(-1, 20).is_err());
        assert!(validate_page(0, 0).is_err());
    }
}

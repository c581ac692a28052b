//! # fh-store — Firehose Event Store
//!
//! Persistence boundary for ingested stream lines: append one record, clear
//! everything, read the newest N, read a page of projections.
//!
//! Retrieval is ordered by receive time, newest first. Records sharing a
//! timestamp are ordered by their insertion sequence, later first.

pub mod memory;
pub mod store;

pub use memory::*;
pub use store::*;

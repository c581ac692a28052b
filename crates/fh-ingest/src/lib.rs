//! # fh-ingest — Firehose Ingestion
//!
//! Wires the rule registry, the event store and the stream connector
//! together.
//!
//! ## Components
//!
//! - **IngestionCoordinator** - rule reset/removal with local clears around
//!   a cancellable grace period
//! - **StreamSupervisor** - background session loop with optional reconnect
//! - **TweetQueries** - paged and top-N reads for callers

pub mod coordinator;
pub mod queries;
pub mod supervisor;

pub use coordinator::*;
pub use queries::*;
pub use supervisor::*;

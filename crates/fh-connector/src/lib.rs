//! # fh-connector — Firehose Stream Connector
//!
//! Long-lived HTTP connection to the filtered stream.
//!
//! ## Features
//!
//! - Incremental NDJSON line splitting over chunked bodies
//! - Blank keep-alive lines skipped
//! - Bounded, out-of-order persistence off the read loop
//! - Failures close the session and are reported, never raised

pub mod connector;
pub mod dispatch;
pub mod lines;
pub mod protocol;
pub mod source;

pub use connector::*;
pub use dispatch::*;
pub use lines::*;
pub use protocol::*;
pub use source::*;

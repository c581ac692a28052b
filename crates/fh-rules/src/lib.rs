//! # fh-rules — Firehose Rule Registry
//!
//! Keeps the server-side filter rules of the stream in sync with what the
//! operator asked for.
//!
//! ## Operations
//!
//! - `fetch_rules` - list the remote rules
//! - `delete_rules` - delete by id (no request for an empty list)
//! - `add_rules` - create rules, returning remote-assigned ids
//! - `reset_all_rules` - fetch, delete all, add (not transactional)

pub mod protocol;
pub mod registry;
pub mod transport;

pub use protocol::*;
pub use registry::*;
pub use transport::*;

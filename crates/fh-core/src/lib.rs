//! # fh-core — Firehose core types
//!
//! Shared vocabulary for the filtered-stream ingestion workspace.
//!
//! ## Contents
//!
//! - **Model** - filter rules, rule sets, ingested event records, pages
//! - **Config** - TOML-backed runtime configuration (base URI, token, timings)
//! - **Error** - the transport / remote / validation / cancellation taxonomy
//! - **Shutdown** - cooperative cancellation shared by long-running tasks

pub mod config;
pub mod error;
pub mod model;
pub mod shutdown;

pub use config::*;
pub use error::*;
pub use model::*;
pub use shutdown::*;

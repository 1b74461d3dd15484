//! Ingestion Module
//!
//! This module turns confirmed pool transactions into durable store updates. It is composed of
//! several submodules:
//!
//! - `coordinator`: Receives one transaction at a time, decodes it and saves it through the
//!   retrying store path.
//! - `filters`: Named transaction filters keyed on the pool's ARC-4 method selectors.
//! - `progress_tracker`: Counts what has been ingested and flags leaf-index gaps.
//! - `subscriber`: Polls the indexer for new rounds and delivers matching transactions to the
//!   coordinator, persisting the watermark through it.

/// Decode-and-persist entry point
pub mod coordinator;
/// Named transaction filters
pub mod filters;
/// Ingestion statistics
pub mod progress_tracker;
/// Polling subscription loop
pub mod subscriber;
/// Error types
mod types;

pub use coordinator::*;
pub use types::*;

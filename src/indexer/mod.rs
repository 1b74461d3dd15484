//! Indexer integration module for the Algorand network
//!
//! This module provides the client and types for reading confirmed application-call
//! transactions from an Algorand indexer REST endpoint, and the adapter that turns the
//! indexer's loosely-typed JSON into the strongly-typed `ConfirmedTransaction` the rest of the
//! pipeline consumes.

/// REST client for the indexer
mod client;
/// Wire types and the boundary adapter
mod types;

pub use client::IndexerClient;
pub use types::*;

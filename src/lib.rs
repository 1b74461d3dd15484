//! Ingests confirmed deposit and withdrawal calls of a privacy-pool application into an embedded
//! SQLite ledger, together with the contract's Merkle-tree root, running pool totals and a
//! resumable block watermark.

pub mod config;
pub mod decoder;
pub mod indexer;
pub mod retry;
pub mod store;
pub mod sync;
pub mod utils;

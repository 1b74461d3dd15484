//! Argument decoding for privacy-pool application calls.
//!
//! The pool contract speaks ARC-4: method arguments arrive as opaque byte strings and the
//! method's return value is the last log entry of the transaction. This module slices those
//! fixed-layout payloads into typed fields. Nothing here performs I/O or keeps state.

/// Low-level ARC-4 readers (word arrays, big-endian integers, method selectors)
pub mod abi;
/// Canonical Algorand address encoding
pub mod address;
/// Deposit, withdrawal and return-log decoding
mod args;

pub use args::*;

/// Errors raised while decoding a transaction payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
	#[error("Malformed log: {0}")]
	MalformedLog(String),

	#[error("Malformed arguments: {0}")]
	MalformedArgs(String),
}

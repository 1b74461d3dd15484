//!
//! Utility module for the subscriber.
//!
//! Re-exports formatting helpers used in log output throughout the codebase.
/// Byte formatting for log lines
pub mod format;

pub use format::format_bytes;

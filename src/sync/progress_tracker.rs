//! Progress tracking for transaction ingestion.
//!
//! This module provides the `IngestProgress` tracker, which records how many deposits and
//! withdrawals the coordinator has committed in this session, the highest leaf index and block
//! seen, and whether leaf indices arrived contiguously.
//!
//! Leaf order is enforced by the contract and by insertion order in the store; the tracker only
//! reports what it observes so a gap shows up in the logs next to the transaction that caused it.

use tracing::{info, warn};

/// Number of blocks between periodic progress log lines.
const LOG_INTERVAL_BLOCKS: u64 = 1000;

/// Service for tracking ingestion progress
#[derive(Debug, Clone)]
pub struct IngestProgress {
    /// Watermark at the start of this session
    start_block: u64,
    /// Highest block containing a committed transaction
    highest_block: u64,
    /// Leaf index of the last committed note
    last_leaf_index: Option<u64>,
    /// Total deposits committed
    deposits_processed: usize,
    /// Total withdrawals committed
    withdrawals_processed: usize,
    /// Leaf indices that did not follow their predecessor, as (previous, received)
    gaps: Vec<(u64, u64)>,
    /// Block at which progress was last logged
    last_logged_block: u64,
}

impl IngestProgress {
    /// Create a new tracker for a session resuming at `start_block`.
    ///
    /// `leaf_count` is the store's current leaf count, so the first note of the session is
    /// checked against what is already persisted.
    pub fn new(start_block: u64, leaf_count: u64) -> Self {
        Self {
            start_block,
            highest_block: start_block,
            last_leaf_index: leaf_count.checked_sub(1),
            deposits_processed: 0,
            withdrawals_processed: 0,
            gaps: Vec::new(),
            last_logged_block: start_block,
        }
    }

    fn record_note(&mut self, leaf_index: u64, block: u64) {
        let expected = self.last_leaf_index.map_or(0, |last| last + 1);
        if leaf_index != expected {
            warn!(
                "Leaf index {} does not follow the previous leaf (expected {})",
                leaf_index, expected
            );
            self.gaps
                .push((self.last_leaf_index.unwrap_or(0), leaf_index));
        }
        self.last_leaf_index = Some(leaf_index);
        self.highest_block = self.highest_block.max(block);
    }

    /// Record a committed deposit
    pub fn record_deposit(&mut self, leaf_index: u64, block: u64) {
        self.record_note(leaf_index, block);
        self.deposits_processed += 1;
    }

    /// Record a committed withdrawal
    pub fn record_withdrawal(&mut self, leaf_index: u64, block: u64) {
        self.record_note(leaf_index, block);
        self.withdrawals_processed += 1;
    }

    /// Log progress every `LOG_INTERVAL_BLOCKS` blocks or when forced
    pub fn log_progress(&mut self, force: bool) {
        let blocks_since_last_log = self.highest_block.saturating_sub(self.last_logged_block);
        if force || blocks_since_last_log >= LOG_INTERVAL_BLOCKS {
            info!("Ingest progress: {}", self.get_stats().summary());
            self.last_logged_block = self.highest_block;
        }
    }

    /// Get ingestion statistics
    pub fn get_stats(&self) -> IngestStats {
        IngestStats {
            start_block: self.start_block,
            highest_block: self.highest_block,
            last_leaf_index: self.last_leaf_index,
            deposits_processed: self.deposits_processed,
            withdrawals_processed: self.withdrawals_processed,
            gaps: self.gaps.clone(),
        }
    }
}

/// Statistics about the ingestion session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub start_block: u64,
    pub highest_block: u64,
    pub last_leaf_index: Option<u64>,
    pub deposits_processed: usize,
    pub withdrawals_processed: usize,
    pub gaps: Vec<(u64, u64)>,
}

impl IngestStats {
    /// Get a human-readable summary of the statistics
    pub fn summary(&self) -> String {
        format!(
            "blocks {} to {}: {} deposits, {} withdrawals{}{}",
            self.start_block,
            self.highest_block,
            self.deposits_processed,
            self.withdrawals_processed,
            match self.last_leaf_index {
                Some(leaf) => format!(", last leaf {}", leaf),
                None => String::new(),
            },
            if self.gaps.is_empty() {
                String::new()
            } else {
                format!(" ({} gaps)", self.gaps.len())
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_leaves_have_no_gaps() {
        let mut progress = IngestProgress::new(100, 0);
        progress.record_deposit(0, 101);
        progress.record_withdrawal(1, 105);
        progress.record_deposit(2, 103);

        let stats = progress.get_stats();
        assert_eq!(stats.deposits_processed, 2);
        assert_eq!(stats.withdrawals_processed, 1);
        assert_eq!(stats.highest_block, 105);
        assert_eq!(stats.last_leaf_index, Some(2));
        assert!(stats.gaps.is_empty());
    }

    #[test]
    fn test_resumed_session_checks_against_persisted_leaf_count() {
        let mut progress = IngestProgress::new(500, 4);
        progress.record_deposit(4, 501);
        assert!(progress.get_stats().gaps.is_empty());

        progress.record_deposit(6, 502);
        assert_eq!(progress.get_stats().gaps, vec![(4, 6)]);
        assert!(progress.get_stats().summary().contains("1 gaps"));
    }
}

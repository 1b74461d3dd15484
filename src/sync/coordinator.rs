//! Ingestion coordinator and integration point for the decode-and-persist pipeline.
//!
//! This module defines the `IngestionCoordinator`, which owns the store handle for the lifetime
//! of the process. On startup it reads the persisted watermark and fast-forwards it to the
//! application's creation block when needed. It then handles one confirmed transaction at a time:
//!
//! - Decode the return log into the leaf index and tree root
//! - Branch on the name of the filter that matched to decode deposit or withdrawal arguments
//! - Build the note and its deposit or withdrawal record
//! - Save them through the retrying store path, using the confirmed round as the new watermark
//!
//! A transaction either commits completely or its error is returned to the caller. Nothing is
//! logged-and-skipped. A transaction whose leaf index lies beyond the stored leaf count is
//! rejected with `LeafGap`: the watermark already moved past the missing leaf's round, so
//! continuing would leave a permanent hole in the tree.

use crate::config::{AppConfig, AppSetup};
use crate::decoder::{decode_deposit, decode_result, decode_withdrawal};
use crate::indexer::ConfirmedTransaction;
use crate::retry::{RetryPolicy, retry};
use crate::store::{Deposit, Note, Store, Withdrawal};
use crate::sync::IngestError;
use crate::sync::filters::{DEPOSIT_FILTER_NAME, WITHDRAW_FILTER_NAME};
use crate::sync::progress_tracker::IngestProgress;
use crate::sync::subscriber::{TransactionHandler, WatermarkPersistence};

use tracing::{debug, info};

/// Coordinates decoding and persistence of pool transactions.
///
/// Processing is strictly sequential: `handle_transaction` returns only after the store
/// transaction has committed or failed for good, so there is never more than one write in flight.
pub struct IngestionCoordinator {
    application_id: u64,
    store: Store,
    retry_policy: RetryPolicy,
    /// Cached copy of the persisted watermark.
    watermark: u64,
    progress: IngestProgress,
}

impl IngestionCoordinator {
    /// Open the store named by `config` and start the coordinator.
    pub fn open(config: &AppConfig, retry_policy: RetryPolicy) -> Result<Self, IngestError> {
        let store = Store::open(&config.db_path)?;
        Self::start(config.app, store, retry_policy)
    }

    /// Start the coordinator over an initialized store.
    ///
    /// A watermark below the application's creation block (a first run) is advanced to that
    /// block; a higher one is left untouched.
    pub fn start(
        app: AppSetup,
        mut store: Store,
        retry_policy: RetryPolicy,
    ) -> Result<Self, IngestError> {
        let mut watermark = store.get_watermark()?;
        if watermark < app.creation_block {
            info!(
                "Advancing watermark from {} to application creation block {}",
                watermark, app.creation_block
            );
            retry(&retry_policy, || store.set_watermark(app.creation_block))?;
            watermark = app.creation_block;
        }

        let leaf_count = store.tree_snapshot()?.leaf_count;
        info!(
            "Coordinator running for application {} from block {} ({} leaves recorded)",
            app.id, watermark, leaf_count
        );

        Ok(Self {
            application_id: app.id,
            store,
            retry_policy,
            watermark,
            progress: IngestProgress::new(watermark, leaf_count),
        })
    }

    /// Application id of the pool contract being ingested.
    pub fn application_id(&self) -> u64 {
        self.application_id
    }

    /// Decode `txn` and commit it, routed by the name of the filter that matched it.
    pub fn handle_transaction(
        &mut self,
        txn: &ConfirmedTransaction,
        filter_name: &str,
    ) -> Result<(), IngestError> {
        let result = decode_result(txn.last_log()?)?;
        let block = txn.confirmed_round;

        // A leaf past the current count means an earlier transaction was never recorded.
        // Lower indices fall through to the store, which reports them as duplicates.
        let leaf_count = self.store.tree_snapshot()?.leaf_count;
        if result.leaf_index > leaf_count {
            return Err(IngestError::LeafGap {
                expected: leaf_count,
                received: result.leaf_index,
            });
        }

        match filter_name {
            DEPOSIT_FILTER_NAME => {
                let args = decode_deposit(&txn.args)?;
                let note = Note {
                    leaf_index: result.leaf_index,
                    commitment: args.commitment,
                    txn_id: txn.id.clone(),
                };
                let deposit = Deposit {
                    leaf_index: result.leaf_index,
                    address: args.address,
                    amount: args.amount,
                };

                retry(&self.retry_policy, || {
                    self.store
                        .save_deposit(&note, &deposit, &result.tree_root, block)
                })?;
                self.progress.record_deposit(result.leaf_index, block);
            }
            WITHDRAW_FILTER_NAME => {
                let args = decode_withdrawal(&txn.args, &txn.accounts)?;
                let note = Note {
                    leaf_index: result.leaf_index,
                    commitment: args.commitment,
                    txn_id: txn.id.clone(),
                };
                let withdrawal = Withdrawal {
                    leaf_index: result.leaf_index,
                    address: args.recipient,
                    nullifier: args.nullifier,
                    amount: args.amount,
                    fee: args.fee,
                };

                retry(&self.retry_policy, || {
                    self.store
                        .save_withdrawal(&note, &withdrawal, &result.tree_root, block)
                })?;
                self.progress.record_withdrawal(result.leaf_index, block);
            }
            other => return Err(IngestError::UnknownFilter(other.to_string())),
        }

        self.watermark = self.watermark.max(block);
        self.progress.log_progress(false);
        Ok(())
    }

    /// Read access to the store, e.g. for reconciliation queries.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Ingestion statistics for this session.
    pub fn progress(&self) -> &IngestProgress {
        &self.progress
    }

    /// Log a final summary and release the store.
    pub fn shutdown(mut self) -> Result<(), IngestError> {
        self.progress.log_progress(true);
        self.store.close()?;
        info!("Coordinator stopped");
        Ok(())
    }
}

impl TransactionHandler for IngestionCoordinator {
    fn handle(&mut self, txn: &ConfirmedTransaction, filter_name: &str) -> Result<(), IngestError> {
        self.handle_transaction(txn, filter_name)
    }
}

impl WatermarkPersistence for IngestionCoordinator {
    fn get_watermark(&self) -> u64 {
        self.watermark
    }

    /// Persist a new watermark. Values at or below the current one are ignored so the
    /// watermark never moves backwards.
    fn set_watermark(&mut self, value: u64) -> Result<(), IngestError> {
        if value <= self.watermark {
            debug!(
                "Ignoring watermark {} at or below current {}",
                value, self.watermark
            );
            return Ok(());
        }

        retry(&self.retry_policy, || self.store.set_watermark(value))?;
        self.watermark = value;
        Ok(())
    }
}

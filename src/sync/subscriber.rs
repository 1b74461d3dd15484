//! Polling subscription over the indexer.
//!
//! Each poll pins a target round, pages through the pool application's transactions between the
//! watermark and that round, hands every transaction matching a named filter to the handler, and
//! then moves the watermark to the target round.

use crate::indexer::{
	ConfirmedTransaction, IndexerClient, IndexerError, TransactionQuery, TransactionsResponse,
};
use crate::sync::filters::TransactionFilter;
use crate::sync::{IngestError, SubscriberError};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Where confirmed transactions come from
#[async_trait::async_trait]
pub trait TransactionSource: Send + Sync {
	/// Latest round available from the source
	async fn latest_round(&self) -> Result<u64, IndexerError>;

	/// Fetch one page of application-call transactions
	async fn transactions(
		&self,
		query: &TransactionQuery,
	) -> Result<TransactionsResponse, IndexerError>;
}

#[async_trait::async_trait]
impl TransactionSource for IndexerClient {
	async fn latest_round(&self) -> Result<u64, IndexerError> {
		Ok(self.health().await?.round)
	}

	async fn transactions(
		&self,
		query: &TransactionQuery,
	) -> Result<TransactionsResponse, IndexerError> {
		self.search_transactions(query).await
	}
}

/// Receives each matching transaction, tagged with the name of the filter that matched it.
pub trait TransactionHandler {
	fn handle(&mut self, txn: &ConfirmedTransaction, filter_name: &str) -> Result<(), IngestError>;
}

/// Load/store hooks for the subscription watermark.
pub trait WatermarkPersistence {
	fn get_watermark(&self) -> u64;
	fn set_watermark(&mut self, value: u64) -> Result<(), IngestError>;
}

/// Configuration for the subscriber
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
	pub application_id: u64,
	pub filters: Vec<TransactionFilter>,
	/// Time between polls
	pub frequency: Duration,
	/// Maximum transactions per indexer page
	pub page_limit: u32,
}

/// Polls a `TransactionSource` and feeds a handler
pub struct Subscriber<S, H> {
	source: S,
	handler: H,
	config: SubscriberConfig,
}

impl<S, H> Subscriber<S, H>
where
	S: TransactionSource,
	H: TransactionHandler + WatermarkPersistence,
{
	pub fn new(source: S, handler: H, config: SubscriberConfig) -> Self {
		Self {
			source,
			handler,
			config,
		}
	}

	pub fn handler(&self) -> &H {
		&self.handler
	}

	/// Give the handler back, e.g. to shut it down once polling has stopped.
	pub fn into_handler(self) -> H {
		self.handler
	}

	/// Run one poll. Returns the number of transactions handed to the handler.
	///
	/// The watermark moves to the target round only after every transaction up to it has been
	/// handled; a handler error leaves it where the last committed transaction put it.
	pub async fn poll_once(&mut self) -> Result<usize, SubscriberError> {
		let watermark = self.handler.get_watermark();
		let target = self.source.latest_round().await?;
		if target <= watermark {
			debug!("No new rounds (watermark {}, latest {})", watermark, target);
			return Ok(0);
		}

		debug!("Polling rounds {} to {}", watermark + 1, target);

		let mut handled = 0;
		let mut next = None;
		loop {
			let query = TransactionQuery {
				application_id: self.config.application_id,
				min_round: watermark + 1,
				max_round: target,
				limit: self.config.page_limit,
				next: next.take(),
			};
			let page = self.source.transactions(&query).await?;
			let page_was_empty = page.transactions.is_empty();

			for raw in page.transactions {
				let txn = ConfirmedTransaction::try_from(raw).map_err(IngestError::from)?;
				let Some(filter) = self.config.filters.iter().find(|f| f.matches(&txn)) else {
					debug!("Skipping transaction {} (no filter matched)", txn.id);
					continue;
				};

				debug!(
					"Transaction {} in round {} matched filter {}",
					txn.id, txn.confirmed_round, filter.name
				);
				self.handler.handle(&txn, &filter.name)?;
				handled += 1;
			}

			match page.next_token {
				Some(token) if !page_was_empty => next = Some(token),
				_ => break,
			}
		}

		self.handler.set_watermark(target)?;
		if handled > 0 {
			info!(
				"Handled {} transactions up to round {}",
				handled, target
			);
		}
		Ok(handled)
	}

	/// Poll every `frequency` until `shutdown` resolves or a poll fails.
	pub async fn run<F>(&mut self, shutdown: F) -> Result<(), SubscriberError>
	where
		F: Future<Output = ()>,
	{
		let mut interval = tokio::time::interval(self.config.frequency);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		tokio::pin!(shutdown);

		info!(
			"Subscribing to application {} every {:?}",
			self.config.application_id, self.config.frequency
		);

		loop {
			tokio::select! {
				_ = &mut shutdown => {
					info!("Shutdown requested, stopping subscriber");
					return Ok(());
				}
				_ = interval.tick() => {
					self.poll_once().await?;
				}
			}
		}
	}
}

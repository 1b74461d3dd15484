//! Types for the indexer REST integration

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde::{Deserialize, Serialize};

use crate::decoder::DecodeError;

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
	/// Latest round the indexer has imported.
	pub round: u64,
}

/// Response of `GET /v2/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransactionsResponse {
	pub current_round: u64,
	#[serde(default)]
	pub next_token: Option<String>,
	#[serde(default)]
	pub transactions: Vec<IndexerTransaction>,
}

/// A transaction as returned by the indexer. Byte fields are base64 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexerTransaction {
	/// Transaction id.
	pub id: String,
	/// Round in which the transaction was confirmed.
	pub confirmed_round: Option<u64>,
	/// Transaction type (`appl` for application calls).
	#[serde(default)]
	pub tx_type: Option<String>,
	/// Base64-encoded log entries emitted by the application.
	#[serde(default)]
	pub logs: Vec<String>,
	/// Present for application calls.
	#[serde(default)]
	pub application_transaction: Option<ApplicationTransaction>,
}

/// The `application-transaction` section of an indexer transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplicationTransaction {
	pub application_id: u64,
	/// Base64-encoded application args; `args[0]` is the ARC-4 method selector.
	#[serde(default)]
	pub application_args: Vec<String>,
	/// Foreign accounts, excluding the sender.
	#[serde(default)]
	pub accounts: Vec<String>,
}

/// Parameters of one `GET /v2/transactions` page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
	pub application_id: u64,
	/// Inclusive lower bound.
	pub min_round: u64,
	/// Inclusive upper bound.
	pub max_round: u64,
	pub limit: u32,
	/// Continuation token from the previous page.
	pub next: Option<String>,
}

/// A confirmed application call with every byte field decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransaction {
	pub id: String,
	pub confirmed_round: u64,
	pub application_id: u64,
	pub args: Vec<Vec<u8>>,
	pub accounts: Vec<String>,
	pub logs: Vec<Vec<u8>>,
}

impl ConfirmedTransaction {
	/// The application's return log.
	pub fn last_log(&self) -> Result<&[u8], DecodeError> {
		self.logs.last().map(Vec::as_slice).ok_or_else(|| {
			DecodeError::MalformedLog(format!("transaction {} emitted no logs", self.id))
		})
	}
}

impl TryFrom<IndexerTransaction> for ConfirmedTransaction {
	type Error = DecodeError;

	fn try_from(txn: IndexerTransaction) -> Result<Self, Self::Error> {
		let confirmed_round = txn.confirmed_round.ok_or_else(|| {
			DecodeError::MalformedArgs(format!("transaction {} is not confirmed", txn.id))
		})?;
		let app = txn.application_transaction.ok_or_else(|| {
			DecodeError::MalformedArgs(format!(
				"transaction {} is not an application call",
				txn.id
			))
		})?;

		let args = app
			.application_args
			.iter()
			.map(|arg| {
				B64.decode(arg).map_err(|e| {
					DecodeError::MalformedArgs(format!(
						"transaction {} has a non-base64 argument: {}",
						txn.id, e
					))
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		let logs = txn
			.logs
			.iter()
			.map(|log| {
				B64.decode(log).map_err(|e| {
					DecodeError::MalformedLog(format!(
						"transaction {} has a non-base64 log: {}",
						txn.id, e
					))
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			id: txn.id,
			confirmed_round,
			application_id: app.application_id,
			args,
			accounts: app.accounts,
			logs,
		})
	}
}

/// Error types for indexer operations
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("Indexer returned status {status}: {body}")]
	StatusError { status: u16, body: String },
}

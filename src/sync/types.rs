use crate::decoder::DecodeError;
use crate::indexer::IndexerError;
use crate::store::StoreError;

/// Errors that abort processing of a transaction
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
	#[error("Decode error: {0}")]
	DecodeError(#[from] DecodeError),

	#[error("Store error: {0}")]
	StoreError(#[from] StoreError),

	#[error("Unknown filter: {0}")]
	UnknownFilter(String),

	#[error("Leaf gap: store holds {expected} leaves but transaction inserted leaf {received}")]
	LeafGap { expected: u64, received: u64 },
}

/// Errors that stop the subscription loop
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
	#[error("Indexer error: {0}")]
	IndexerError(#[from] IndexerError),

	#[error("Ingest error: {0}")]
	IngestError(#[from] IngestError),
}

use rusqlite::ErrorCode;
use rusqlite::ffi;

use crate::retry::Transient;

/// Errors raised by the transactional store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("Duplicate entry: {0}")]
	DuplicateEntry(String),

	#[error("Storage contention: {0}")]
	Contention(rusqlite::Error),

	#[error("Invalid record: {0}")]
	InvalidRecord(String),

	#[error("Value out of range: {0}")]
	ValueOutOfRange(String),

	#[error("Corrupt store: {0}")]
	Corrupt(String),

	#[error("SQLite error: {0}")]
	Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
	fn from(e: rusqlite::Error) -> Self {
		match e.sqlite_error_code() {
			Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
				StoreError::Contention(e)
			}
			_ if is_uniqueness_violation(&e) => StoreError::DuplicateEntry(e.to_string()),
			_ => StoreError::Sqlite(e),
		}
	}
}

fn is_uniqueness_violation(e: &rusqlite::Error) -> bool {
	matches!(
		e,
		rusqlite::Error::SqliteFailure(err, _)
			if err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
				|| err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
	)
}

impl Transient for StoreError {
	fn is_transient(&self) -> bool {
		matches!(self, StoreError::Contention(_))
	}
}

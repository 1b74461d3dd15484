//! Transactional store for confirmed pool transactions.
//!
//! This module provides the `Store`, an explicit handle over an embedded SQLite database that
//! mirrors the pool contract's append-only Merkle tree. It holds four tables: the ledger of
//! inserted notes (`txns`), aggregate totals (`stats`), the current tree root and leaf count
//! (`roots`) and the sync watermark (`watermark`).
//!
//! Each save runs in a single immediate transaction. The ledger row, the statistics update, the
//! tree snapshot and the watermark either all commit or all roll back; a `rusqlite::Transaction`
//! that is dropped without `commit` rolls back on its own.

pub mod error;
pub mod schema;
pub mod types;

pub use error::StoreError;
pub use types::*;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::utils::format_bytes;
use schema::*;

/// Options applied when opening the store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
	/// How long a statement waits on a lock held by another connection before failing with a
	/// contention error.
	pub busy_timeout: Duration,
}

impl Default for StoreOptions {
	fn default() -> Self {
		Self {
			busy_timeout: Duration::from_millis(5000),
		}
	}
}

/// Handle over the transaction store. Dropping it closes the connection.
pub struct Store {
	conn: Connection,
}

impl Store {
	/// Open (creating if needed) and initialize the store at `path` with default options.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
		Self::open_with_options(path, StoreOptions::default())
	}

	/// Open and initialize the store at `path`.
	///
	/// Initialization is idempotent: tables are created if absent and seed rows are inserted only
	/// if missing, so reopening an existing store leaves its data untouched.
	pub fn open_with_options(
		path: impl AsRef<Path>,
		options: StoreOptions,
	) -> Result<Self, StoreError> {
		let conn = Connection::open(path.as_ref())?;
		let mut store = Self { conn };
		store.initialize(&options)?;
		Ok(store)
	}

	/// Open an existing store for reading only, as the reconciling consumer does. No tables are
	/// created and every mutation fails.
	pub fn open_read_only(
		path: impl AsRef<Path>,
		options: StoreOptions,
	) -> Result<Self, StoreError> {
		let conn = Connection::open_with_flags(
			path.as_ref(),
			OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
		)?;
		conn.busy_timeout(options.busy_timeout)?;
		Ok(Self { conn })
	}

	fn initialize(&mut self, options: &StoreOptions) -> Result<(), StoreError> {
		self.conn.busy_timeout(options.busy_timeout)?;

		let mode: String =
			self.conn
				.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
		if !mode.eq_ignore_ascii_case("wal") {
			warn!("WAL mode not enabled, current mode: {}", mode);
		}

		let tx = self.conn.transaction()?;
		tx.execute_batch(CREATE_TXNS_TABLE)?;
		tx.execute_batch(CREATE_STATS_TABLE)?;
		tx.execute_batch(CREATE_WATERMARK_TABLE)?;
		tx.execute_batch(CREATE_ROOTS_TABLE)?;
		for key in STATS_KEYS {
			tx.execute(SEED_STAT, params![key])?;
		}
		tx.execute(SEED_WATERMARK, [])?;
		tx.execute(SEED_ROOT, [])?;
		tx.commit()?;

		info!("Transaction store initialized");
		Ok(())
	}

	/// Record a deposit: ledger row, `total_deposits`, tree snapshot and watermark, atomically.
	pub fn save_deposit(
		&mut self,
		note: &Note,
		deposit: &Deposit,
		tree_root: &[u8; 32],
		block: u64,
	) -> Result<(), StoreError> {
		check_leaf_index(note, deposit.leaf_index)?;
		let amount = to_sql_int(deposit.amount, "deposit amount")?;

		let tx = self
			.conn
			.transaction_with_behavior(TransactionBehavior::Immediate)?;
		insert_entry(
			&tx,
			note,
			TxnKind::Deposit,
			&deposit.address,
			amount,
			None,
		)?;
		tx.execute(ADD_TO_STAT, params![amount, TOTAL_DEPOSITS])?;
		advance_tree(&tx, note, tree_root, block)?;
		tx.commit()?;

		info!("Saved deposit {}", deposit);
		info!("Saved note {}", note);
		info!("Tree root {}", format_bytes(tree_root));
		info!("Block {}", block);
		Ok(())
	}

	/// Record a withdrawal: ledger row carrying the nullifier, `total_withdrawals`, `total_fees`,
	/// tree snapshot and watermark, atomically.
	pub fn save_withdrawal(
		&mut self,
		note: &Note,
		withdrawal: &Withdrawal,
		tree_root: &[u8; 32],
		block: u64,
	) -> Result<(), StoreError> {
		check_leaf_index(note, withdrawal.leaf_index)?;
		let amount = to_sql_int(withdrawal.amount, "withdrawal amount")?;
		let fee = to_sql_int(withdrawal.fee, "withdrawal fee")?;

		let tx = self
			.conn
			.transaction_with_behavior(TransactionBehavior::Immediate)?;
		insert_entry(
			&tx,
			note,
			TxnKind::Withdrawal,
			&withdrawal.address,
			amount,
			Some(&withdrawal.nullifier),
		)?;
		tx.execute(ADD_TO_STAT, params![amount, TOTAL_WITHDRAWALS])?;
		tx.execute(ADD_TO_STAT, params![fee, TOTAL_FEES])?;
		advance_tree(&tx, note, tree_root, block)?;
		tx.commit()?;

		info!("Saved withdrawal {}", withdrawal);
		info!("Saved note {}", note);
		info!("Tree root {}", format_bytes(tree_root));
		info!("Block {}", block);
		Ok(())
	}

	/// Current sync watermark.
	pub fn get_watermark(&self) -> Result<u64, StoreError> {
		let value: i64 = self
			.conn
			.query_row("SELECT value FROM watermark WHERE id = 1", [], |row| {
				row.get(0)
			})?;
		from_sql_int(value, "watermark")
	}

	/// Overwrite the sync watermark. Touches no other table.
	pub fn set_watermark(&mut self, value: u64) -> Result<(), StoreError> {
		let value = to_sql_int(value, "watermark")?;
		self.conn.execute(REPLACE_WATERMARK, params![value])?;
		debug!("Watermark set to {}", value);
		Ok(())
	}

	/// Current tree root and leaf count.
	pub fn tree_snapshot(&self) -> Result<TreeSnapshot, StoreError> {
		let (root, leaf_count): (Vec<u8>, i64) = self.conn.query_row(
			"SELECT value, leaf_count FROM roots WHERE id = 1",
			[],
			|row| Ok((row.get(0)?, row.get(1)?)),
		)?;

		let root = if root.is_empty() {
			None
		} else {
			Some(to_hash(root, "tree root")?)
		};

		Ok(TreeSnapshot {
			root,
			leaf_count: from_sql_int(leaf_count, "leaf count")?,
		})
	}

	/// Accumulated totals.
	pub fn stats(&self) -> Result<PoolStats, StoreError> {
		let mut stmt = self.conn.prepare("SELECT key, value FROM stats")?;
		let rows = stmt.query_map([], |row| {
			Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
		})?;

		let mut stats = PoolStats::default();
		for row in rows {
			let (key, value) = row?;
			let value = from_sql_int(value.unwrap_or(0), &key)?;
			match key.as_str() {
				TOTAL_DEPOSITS => stats.total_deposits = value,
				TOTAL_WITHDRAWALS => stats.total_withdrawals = value,
				TOTAL_FEES => stats.total_fees = value,
				_ => debug!("Ignoring unknown stats key {}", key),
			}
		}
		Ok(stats)
	}

	/// Ledger entry at `leaf_index`.
	pub fn entry(&self, leaf_index: u64) -> Result<Option<LedgerEntry>, StoreError> {
		let leaf_index = to_sql_int(leaf_index, "leaf index")?;
		let raw = self
			.conn
			.query_row(
				&format!("{} WHERE leaf_index = ?1", SELECT_TXN_COLUMNS),
				params![leaf_index],
				read_raw_entry,
			)
			.optional()?;
		raw.map(RawEntry::into_entry).transpose()
	}

	/// Ledger entry inserted by transaction `txn_id`.
	pub fn entry_by_txn_id(&self, txn_id: &str) -> Result<Option<LedgerEntry>, StoreError> {
		let raw = self
			.conn
			.query_row(
				&format!("{} WHERE txn_id = ?1", SELECT_TXN_COLUMNS),
				params![txn_id],
				read_raw_entry,
			)
			.optional()?;
		raw.map(RawEntry::into_entry).transpose()
	}

	/// Leaf index of the note with the given commitment.
	pub fn leaf_index_by_commitment(
		&self,
		commitment: &[u8; 32],
	) -> Result<Option<u64>, StoreError> {
		let index: Option<i64> = self
			.conn
			.query_row(
				"SELECT leaf_index FROM txns WHERE commitment = ?1",
				params![&commitment[..]],
				|row| row.get(0),
			)
			.optional()?;
		index.map(|i| from_sql_int(i, "leaf index")).transpose()
	}

	/// Every leaf commitment in tree order.
	pub fn all_commitments(&self) -> Result<Vec<[u8; 32]>, StoreError> {
		let mut stmt = self
			.conn
			.prepare("SELECT commitment FROM txns ORDER BY leaf_index ASC")?;
		let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

		let mut commitments = Vec::new();
		for row in rows {
			commitments.push(to_hash(row?, "commitment")?);
		}
		Ok(commitments)
	}

	/// Number of ledger rows.
	pub fn entry_count(&self) -> Result<u64, StoreError> {
		let count: i64 = self
			.conn
			.query_row("SELECT COUNT(*) FROM txns", [], |row| row.get(0))?;
		from_sql_int(count, "entry count")
	}

	/// Close the connection, surfacing any error SQLite reports on shutdown.
	pub fn close(self) -> Result<(), StoreError> {
		self.conn.close().map_err(|(_, e)| StoreError::from(e))
	}
}

fn check_leaf_index(note: &Note, leaf_index: u64) -> Result<(), StoreError> {
	if note.leaf_index != leaf_index {
		return Err(StoreError::InvalidRecord(format!(
			"note leaf index {} does not match record leaf index {}",
			note.leaf_index, leaf_index
		)));
	}
	Ok(())
}

fn insert_entry(
	tx: &Transaction<'_>,
	note: &Note,
	kind: TxnKind,
	address: &str,
	amount: i64,
	nullifier: Option<&[u8; 32]>,
) -> Result<(), StoreError> {
	let leaf_index = to_sql_int(note.leaf_index, "leaf index")?;
	tx.execute(
		INSERT_TXN,
		params![
			leaf_index,
			&note.commitment[..],
			note.txn_id.as_str(),
			kind.as_i64(),
			address,
			amount,
			nullifier.map(|n| &n[..]),
		],
	)
	.map_err(|e| match StoreError::from(e) {
		StoreError::DuplicateEntry(msg) => StoreError::DuplicateEntry(format!(
			"leaf index {} or txn {} already recorded ({})",
			note.leaf_index, note.txn_id, msg
		)),
		other => other,
	})?;
	Ok(())
}

/// Overwrite the tree snapshot and watermark for a freshly inserted note.
fn advance_tree(
	tx: &Transaction<'_>,
	note: &Note,
	tree_root: &[u8; 32],
	block: u64,
) -> Result<(), StoreError> {
	let leaf_count = note
		.leaf_index
		.checked_add(1)
		.ok_or_else(|| StoreError::ValueOutOfRange("leaf count overflows".to_string()))?;
	let leaf_count = to_sql_int(leaf_count, "leaf count")?;
	let block = to_sql_int(block, "block")?;

	tx.execute(UPDATE_ROOT, params![&tree_root[..], leaf_count])?;
	tx.execute(UPDATE_WATERMARK, params![block])?;
	Ok(())
}

fn to_sql_int(value: u64, what: &str) -> Result<i64, StoreError> {
	i64::try_from(value).map_err(|_| {
		StoreError::ValueOutOfRange(format!("{} {} exceeds the SQLite integer range", what, value))
	})
}

fn from_sql_int(value: i64, what: &str) -> Result<u64, StoreError> {
	u64::try_from(value)
		.map_err(|_| StoreError::Corrupt(format!("{} holds negative value {}", what, value)))
}

fn to_hash(bytes: Vec<u8>, what: &str) -> Result<[u8; 32], StoreError> {
	let len = bytes.len();
	bytes
		.try_into()
		.map_err(|_| StoreError::Corrupt(format!("{} has {} bytes; expected 32", what, len)))
}

/// A `txns` row as SQLite returns it, before validation.
struct RawEntry {
	leaf_index: i64,
	commitment: Vec<u8>,
	txn_id: String,
	kind: i64,
	address: String,
	amount: i64,
	nullifier: Option<Vec<u8>>,
}

fn read_raw_entry(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
	Ok(RawEntry {
		leaf_index: row.get(0)?,
		commitment: row.get(1)?,
		txn_id: row.get(2)?,
		kind: row.get(3)?,
		address: row.get(4)?,
		amount: row.get(5)?,
		nullifier: row.get(6)?,
	})
}

impl RawEntry {
	fn into_entry(self) -> Result<LedgerEntry, StoreError> {
		let kind = TxnKind::from_i64(self.kind)
			.ok_or_else(|| StoreError::Corrupt(format!("unknown txn_type {}", self.kind)))?;

		Ok(LedgerEntry {
			leaf_index: from_sql_int(self.leaf_index, "leaf index")?,
			commitment: to_hash(self.commitment, "commitment")?,
			txn_id: self.txn_id,
			kind,
			address: self.address,
			amount: from_sql_int(self.amount, "amount")?,
			nullifier: self
				.nullifier
				.map(|n| to_hash(n, "nullifier"))
				.transpose()?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn temp_store() -> (Store, TempDir) {
		let dir = tempfile::tempdir().unwrap();
		let store = Store::open(dir.path().join("txns.db")).unwrap();
		(store, dir)
	}

	fn note(leaf_index: u64, fill: u8, txn_id: &str) -> Note {
		Note {
			leaf_index,
			commitment: [fill; 32],
			txn_id: txn_id.to_string(),
		}
	}

	fn deposit(leaf_index: u64, address: &str, amount: u64) -> Deposit {
		Deposit {
			leaf_index,
			address: address.to_string(),
			amount,
		}
	}

	fn withdrawal(leaf_index: u64, amount: u64, fee: u64) -> Withdrawal {
		Withdrawal {
			leaf_index,
			address: "RECIPIENT".to_string(),
			nullifier: [0x44; 32],
			amount,
			fee,
		}
	}

	#[test]
	fn test_fresh_store_is_seeded() {
		let (store, _dir) = temp_store();
		assert_eq!(store.get_watermark().unwrap(), 0);
		assert_eq!(
			store.tree_snapshot().unwrap(),
			TreeSnapshot {
				root: None,
				leaf_count: 0
			}
		);
		assert_eq!(store.stats().unwrap(), PoolStats::default());
		assert_eq!(store.entry_count().unwrap(), 0);
	}

	#[test]
	fn test_reopen_keeps_existing_data() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("txns.db");

		let mut store = Store::open(&path).unwrap();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();
		store.close().unwrap();

		let store = Store::open(&path).unwrap();
		assert_eq!(store.get_watermark().unwrap(), 500);
		assert_eq!(store.stats().unwrap().total_deposits, 100);
		assert_eq!(store.tree_snapshot().unwrap().leaf_count, 1);
		assert_eq!(store.entry_count().unwrap(), 1);
	}

	#[test]
	fn test_save_deposit_scenario() {
		let (mut store, _dir) = temp_store();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();

		assert_eq!(
			store.entry(0).unwrap().unwrap(),
			LedgerEntry {
				leaf_index: 0,
				commitment: [0x11; 32],
				txn_id: "T1".to_string(),
				kind: TxnKind::Deposit,
				address: "ADDR1".to_string(),
				amount: 100,
				nullifier: None,
			}
		);
		assert_eq!(
			store.stats().unwrap(),
			PoolStats {
				total_deposits: 100,
				total_withdrawals: 0,
				total_fees: 0
			}
		);
		assert_eq!(
			store.tree_snapshot().unwrap(),
			TreeSnapshot {
				root: Some([0xaa; 32]),
				leaf_count: 1
			}
		);
		assert_eq!(store.get_watermark().unwrap(), 500);
	}

	#[test]
	fn test_save_withdrawal_updates_withdrawal_and_fee_totals() {
		let (mut store, _dir) = temp_store();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 1000), &[0xaa; 32], 500)
			.unwrap();
		store
			.save_withdrawal(&note(1, 0x22, "T2"), &withdrawal(1, 700, 25), &[0xbb; 32], 510)
			.unwrap();

		let entry = store.entry_by_txn_id("T2").unwrap().unwrap();
		assert_eq!(entry.kind, TxnKind::Withdrawal);
		assert_eq!(entry.nullifier, Some([0x44; 32]));
		assert_eq!(entry.amount, 700);

		assert_eq!(
			store.stats().unwrap(),
			PoolStats {
				total_deposits: 1000,
				total_withdrawals: 700,
				total_fees: 25
			}
		);
		assert_eq!(
			store.tree_snapshot().unwrap(),
			TreeSnapshot {
				root: Some([0xbb; 32]),
				leaf_count: 2
			}
		);
		assert_eq!(store.get_watermark().unwrap(), 510);
	}

	#[test]
	fn test_duplicate_leaf_index_rolls_back_everything() {
		let (mut store, _dir) = temp_store();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();

		let err = store
			.save_deposit(&note(0, 0x12, "T9"), &deposit(0, "ADDR2", 50), &[0xcc; 32], 600)
			.unwrap_err();
		assert!(matches!(err, StoreError::DuplicateEntry(_)));

		assert_eq!(store.entry_count().unwrap(), 1);
		assert_eq!(store.stats().unwrap().total_deposits, 100);
		assert_eq!(
			store.tree_snapshot().unwrap(),
			TreeSnapshot {
				root: Some([0xaa; 32]),
				leaf_count: 1
			}
		);
		assert_eq!(store.get_watermark().unwrap(), 500);
	}

	#[test]
	fn test_duplicate_txn_id_is_rejected() {
		let (mut store, _dir) = temp_store();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();

		let err = store
			.save_withdrawal(&note(1, 0x22, "T1"), &withdrawal(1, 10, 1), &[0xbb; 32], 501)
			.unwrap_err();
		assert!(matches!(err, StoreError::DuplicateEntry(_)));
		assert_eq!(store.stats().unwrap().total_withdrawals, 0);
		assert_eq!(store.stats().unwrap().total_fees, 0);
		assert_eq!(store.get_watermark().unwrap(), 500);
	}

	#[test]
	fn test_out_of_range_amount_writes_nothing() {
		let (mut store, _dir) = temp_store();
		let err = store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", u64::MAX), &[0xaa; 32], 500)
			.unwrap_err();
		assert!(matches!(err, StoreError::ValueOutOfRange(_)));
		assert_eq!(store.entry_count().unwrap(), 0);
		assert_eq!(store.get_watermark().unwrap(), 0);
	}

	#[test]
	fn test_mismatched_leaf_index_is_rejected() {
		let (mut store, _dir) = temp_store();
		let err = store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(3, "ADDR1", 1), &[0xaa; 32], 500)
			.unwrap_err();
		assert!(matches!(err, StoreError::InvalidRecord(_)));
	}

	#[test]
	fn test_watermark_tracks_latest_of_increasing_sequence() {
		let (mut store, _dir) = temp_store();
		store.set_watermark(100).unwrap();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 1), &[0xaa; 32], 150)
			.unwrap();
		store.set_watermark(175).unwrap();
		store
			.save_deposit(&note(1, 0x12, "T2"), &deposit(1, "ADDR1", 1), &[0xab; 32], 180)
			.unwrap();
		store.set_watermark(200).unwrap();

		assert_eq!(store.get_watermark().unwrap(), 200);
		// The setter does not touch the ledger, totals or snapshot.
		assert_eq!(store.entry_count().unwrap(), 2);
		assert_eq!(store.tree_snapshot().unwrap().leaf_count, 2);
	}

	#[test]
	fn test_reconciliation_queries() {
		let (mut store, _dir) = temp_store();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();
		store
			.save_withdrawal(&note(1, 0x22, "T2"), &withdrawal(1, 50, 5), &[0xbb; 32], 501)
			.unwrap();

		assert_eq!(store.leaf_index_by_commitment(&[0x22; 32]).unwrap(), Some(1));
		assert_eq!(store.leaf_index_by_commitment(&[0x99; 32]).unwrap(), None);
		assert_eq!(
			store.all_commitments().unwrap(),
			vec![[0x11; 32], [0x22; 32]]
		);
		assert!(store.entry_by_txn_id("missing").unwrap().is_none());
	}

	#[test]
	fn test_lock_held_elsewhere_surfaces_contention() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("txns.db");
		let mut store = Store::open_with_options(
			&path,
			StoreOptions {
				busy_timeout: Duration::from_millis(50),
			},
		)
		.unwrap();

		let other = Connection::open(&path).unwrap();
		other.execute_batch("BEGIN IMMEDIATE").unwrap();

		let err = store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap_err();
		assert!(matches!(err, StoreError::Contention(_)));

		other.execute_batch("ROLLBACK").unwrap();
		store
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();
		assert_eq!(store.entry_count().unwrap(), 1);
	}

	#[test]
	fn test_read_only_handle_rejects_writes() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("txns.db");
		let mut writer = Store::open(&path).unwrap();
		writer
			.save_deposit(&note(0, 0x11, "T1"), &deposit(0, "ADDR1", 100), &[0xaa; 32], 500)
			.unwrap();

		let mut reader = Store::open_read_only(&path, StoreOptions::default()).unwrap();
		assert_eq!(reader.get_watermark().unwrap(), 500);
		assert_eq!(reader.all_commitments().unwrap(), vec![[0x11; 32]]);
		assert!(reader.set_watermark(900).is_err());
		assert_eq!(writer.get_watermark().unwrap(), 500);
	}
}

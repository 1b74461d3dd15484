use std::fmt;

use crate::utils::format_bytes;

/// A leaf inserted into the pool's Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
	/// Zero-based position of the leaf, equal to insertion order.
	pub leaf_index: u64,
	/// Leaf value.
	pub commitment: [u8; 32],
	/// Transaction that inserted the leaf.
	pub txn_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
	pub leaf_index: u64,
	pub address: String,
	pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
	pub leaf_index: u64,
	/// Recipient of the withdrawn funds.
	pub address: String,
	/// Nullifier of the spent note.
	pub nullifier: [u8; 32],
	pub amount: u64,
	/// Charged on top of `amount`.
	pub fee: u64,
}

/// Kind of transaction that inserted a ledger entry. The discriminant is the persisted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
	Deposit = 0,
	Withdrawal = 1,
}

impl TxnKind {
	pub fn as_i64(self) -> i64 {
		self as i64
	}

	pub fn from_i64(value: i64) -> Option<Self> {
		match value {
			0 => Some(TxnKind::Deposit),
			1 => Some(TxnKind::Withdrawal),
			_ => None,
		}
	}
}

/// A persisted row of the ledger: a note merged with its deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
	pub leaf_index: u64,
	pub commitment: [u8; 32],
	pub txn_id: String,
	pub kind: TxnKind,
	pub address: String,
	pub amount: u64,
	/// Present only for withdrawals.
	pub nullifier: Option<[u8; 32]>,
}

/// Accumulated pool totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
	pub total_deposits: u64,
	pub total_withdrawals: u64,
	pub total_fees: u64,
}

/// The store's view of the on-chain tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSnapshot {
	/// Latest root reported by the contract; `None` before the first insert.
	pub root: Option<[u8; 32]>,
	pub leaf_count: u64,
}

impl fmt::Display for Note {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Note(leaf_index={}, commitment={}, txn_id={})",
			self.leaf_index,
			format_bytes(&self.commitment),
			self.txn_id
		)
	}
}

impl fmt::Display for Deposit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Deposit(leaf_index={}, address={}, amount={})",
			self.leaf_index, self.address, self.amount
		)
	}
}

impl fmt::Display for Withdrawal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Withdrawal(leaf_index={}, address={}, nullifier={}, amount={}, fee={})",
			self.leaf_index,
			self.address,
			format_bytes(&self.nullifier),
			self.amount,
			self.fee
		)
	}
}

//! On-disk layout of the transaction store. Table and column names are read by external
//! consumers and must stay stable.

pub const CREATE_TXNS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS txns (
	leaf_index     INTEGER PRIMARY KEY,  -- note index in the on-chain merkle tree
	commitment     BLOB NOT NULL,        -- note value in the on-chain merkle tree
	txn_id         TEXT UNIQUE NOT NULL, -- id of the txn that inserted the note
	txn_type       INTEGER NOT NULL,     -- 0 for deposits, 1 for withdrawals
	address        TEXT NOT NULL,        -- depositor or withdrawal recipient
	amount         INTEGER NOT NULL,     -- amount deposited or withdrawn
	from_nullifier BLOB                  -- spent note nullifier (NULL for deposits)
) STRICT;";

pub const CREATE_STATS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS stats (
	key   TEXT PRIMARY KEY,
	value INTEGER
) STRICT;";

pub const CREATE_WATERMARK_TABLE: &str = "
CREATE TABLE IF NOT EXISTS watermark (
	id    INTEGER PRIMARY KEY CHECK (id = 1),
	value INTEGER NOT NULL
) STRICT;";

pub const CREATE_ROOTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS roots (
	id         INTEGER PRIMARY KEY CHECK (id = 1),
	value      BLOB NOT NULL,
	leaf_count INTEGER NOT NULL
) STRICT;";

pub const TOTAL_DEPOSITS: &str = "total_deposits";
pub const TOTAL_WITHDRAWALS: &str = "total_withdrawals";
pub const TOTAL_FEES: &str = "total_fees";

pub const STATS_KEYS: [&str; 3] = [TOTAL_DEPOSITS, TOTAL_WITHDRAWALS, TOTAL_FEES];

pub const SEED_STAT: &str = "INSERT OR IGNORE INTO stats (key, value) VALUES (?1, 0)";
pub const SEED_WATERMARK: &str = "INSERT OR IGNORE INTO watermark (id, value) VALUES (1, 0)";
pub const SEED_ROOT: &str = "INSERT OR IGNORE INTO roots (id, value, leaf_count) VALUES (1, x'', 0)";

pub const INSERT_TXN: &str = "
INSERT INTO txns (leaf_index, commitment, txn_id, txn_type, address, amount, from_nullifier)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub const ADD_TO_STAT: &str = "UPDATE stats SET value = value + ?1 WHERE key = ?2";
pub const UPDATE_ROOT: &str = "UPDATE roots SET value = ?1, leaf_count = ?2 WHERE id = 1";
pub const UPDATE_WATERMARK: &str = "UPDATE watermark SET value = ?1 WHERE id = 1";
pub const REPLACE_WATERMARK: &str = "INSERT OR REPLACE INTO watermark (id, value) VALUES (1, ?1)";

pub const SELECT_TXN_COLUMNS: &str =
	"SELECT leaf_index, commitment, txn_id, txn_type, address, amount, from_nullifier FROM txns";

use super::DecodeError;
use super::abi::{SELECTOR_LEN, WORD_LEN, WordArray, uint64_from_be};
use super::address::decode_address;

/// Length of the return log: 4-byte return prefix + uint64 leaf index + byte[32] root.
pub const RESULT_LOG_LEN: usize = SELECTOR_LEN + 8 + WORD_LEN;

/// Position of the zk public inputs (`byte[32][]`) in the application args. `args[0]` is the
/// method selector and `args[1]` the proof.
const PUBLIC_INPUTS_ARG: usize = 2;

/// Position of the depositor `address` / recipient `account` argument.
const ADDRESS_ARG: usize = 3;

/// The `account` argument indexes the transaction's account array, where 0 is the sender and
/// 1.. are the foreign accounts. The accounts list we are handed omits the sender, so reference
/// `n` names `accounts[n - 1]`.
const ACCOUNT_REFERENCE_OFFSET: u64 = 1;

/// Deposit public inputs: `[amount, commitment]`.
const DEPOSIT_AMOUNT_WORD: usize = 0;
const DEPOSIT_COMMITMENT_WORD: usize = 1;

/// Withdrawal public inputs:
/// `[recipient_mod, amount, fee, commitment, nullifier, merkle_root]`.
const WITHDRAWAL_AMOUNT_WORD: usize = 1;
const WITHDRAWAL_FEE_WORD: usize = 2;
const WITHDRAWAL_COMMITMENT_WORD: usize = 3;
const WITHDRAWAL_NULLIFIER_WORD: usize = 4;

/// Return value of `deposit` / `withdraw`: `(uint64,byte[32])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnResult {
	pub leaf_index: u64,
	pub tree_root: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositArgs {
	pub commitment: [u8; 32],
	pub address: String,
	pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalArgs {
	pub commitment: [u8; 32],
	pub nullifier: [u8; 32],
	pub recipient: String,
	pub amount: u64,
	pub fee: u64,
}

/// Parse the leaf index and tree root from the transaction's final log entry.
///
/// The 4-byte return prefix is discarded without inspection.
pub fn decode_result(log: &[u8]) -> Result<TxnResult, DecodeError> {
	if log.len() != RESULT_LOG_LEN {
		return Err(DecodeError::MalformedLog(format!(
			"decoded log has invalid length {}; expected {} bytes",
			log.len(),
			RESULT_LOG_LEN
		)));
	}

	let payload = &log[SELECTOR_LEN..];
	let (leaf_index_bytes, root_bytes) = payload.split_at(8);

	let mut leaf_index = [0u8; 8];
	leaf_index.copy_from_slice(leaf_index_bytes);
	let mut tree_root = [0u8; 32];
	tree_root.copy_from_slice(root_bytes);

	Ok(TxnResult {
		leaf_index: u64::from_be_bytes(leaf_index),
		tree_root,
	})
}

/// Decode `deposit(byte[32][],byte[32][],address)` arguments.
pub fn decode_deposit(args: &[Vec<u8>]) -> Result<DepositArgs, DecodeError> {
	let public_inputs = WordArray::parse(arg(args, PUBLIC_INPUTS_ARG)?)?;

	Ok(DepositArgs {
		amount: public_inputs.uint64(DEPOSIT_AMOUNT_WORD)?,
		commitment: public_inputs.word(DEPOSIT_COMMITMENT_WORD)?,
		address: decode_address(arg(args, ADDRESS_ARG)?)?,
	})
}

/// Decode `withdraw(byte[32][],byte[32][],account,bool,uint64)` arguments, resolving the
/// recipient through the transaction's foreign accounts.
pub fn decode_withdrawal(
	args: &[Vec<u8>],
	accounts: &[String],
) -> Result<WithdrawalArgs, DecodeError> {
	let public_inputs = WordArray::parse(arg(args, PUBLIC_INPUTS_ARG)?)?;

	let reference = arg(args, ADDRESS_ARG)?;
	if reference.len() != 1 {
		return Err(DecodeError::MalformedArgs(format!(
			"account reference has {} bytes; expected a uint8",
			reference.len()
		)));
	}
	let offset = uint64_from_be(reference)?;
	let position = offset
		.checked_sub(ACCOUNT_REFERENCE_OFFSET)
		.and_then(|p| usize::try_from(p).ok())
		.ok_or_else(|| {
			DecodeError::MalformedArgs(format!(
				"account reference {} names the sender; expected at least {}",
				offset, ACCOUNT_REFERENCE_OFFSET
			))
		})?;
	let recipient = accounts.get(position).cloned().ok_or_else(|| {
		DecodeError::MalformedArgs(format!(
			"account reference {} resolves to index {} but only {} accounts were supplied",
			offset,
			position,
			accounts.len()
		))
	})?;

	Ok(WithdrawalArgs {
		amount: public_inputs.uint64(WITHDRAWAL_AMOUNT_WORD)?,
		fee: public_inputs.uint64(WITHDRAWAL_FEE_WORD)?,
		commitment: public_inputs.word(WITHDRAWAL_COMMITMENT_WORD)?,
		nullifier: public_inputs.word(WITHDRAWAL_NULLIFIER_WORD)?,
		recipient,
	})
}

fn arg(args: &[Vec<u8>], pos: usize) -> Result<&[u8], DecodeError> {
	args.get(pos).map(Vec::as_slice).ok_or_else(|| {
		DecodeError::MalformedArgs(format!(
			"argument {} missing; transaction carries {} args",
			pos,
			args.len()
		))
	})
}

use crate::decoder::abi::{SELECTOR_LEN, method_selector};
use crate::indexer::ConfirmedTransaction;

pub const DEPOSIT_SIGNATURE: &str = "deposit(byte[32][],byte[32][],address)(uint64,byte[32])";
pub const WITHDRAW_SIGNATURE: &str =
	"withdraw(byte[32][],byte[32][],account,bool,uint64)(uint64,byte[32])";

pub const DEPOSIT_FILTER_NAME: &str = "deposit";
pub const WITHDRAW_FILTER_NAME: &str = "withdraw";

/// Matches calls of one method on one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
	pub name: String,
	pub application_id: u64,
	pub method_selector: [u8; SELECTOR_LEN],
}

impl TransactionFilter {
	pub fn new(name: &str, application_id: u64, method_signature: &str) -> Self {
		Self {
			name: name.to_string(),
			application_id,
			method_selector: method_selector(method_signature),
		}
	}

	pub fn matches(&self, txn: &ConfirmedTransaction) -> bool {
		txn.application_id == self.application_id
			&& txn
				.args
				.first()
				.is_some_and(|selector| selector.as_slice() == &self.method_selector[..])
	}
}

/// The deposit and withdraw filters for the pool application.
pub fn pool_filters(application_id: u64) -> Vec<TransactionFilter> {
	vec![
		TransactionFilter::new(DEPOSIT_FILTER_NAME, application_id, DEPOSIT_SIGNATURE),
		TransactionFilter::new(WITHDRAW_FILTER_NAME, application_id, WITHDRAW_SIGNATURE),
	]
}

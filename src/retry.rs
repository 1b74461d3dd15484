//! Bounded exponential-backoff retry for store operations.
//!
//! Only errors that report themselves as transient are retried. Everything else propagates on
//! the first failure, since retrying a deterministic failure cannot succeed.

use backoff::backoff::Backoff;
use std::cell::Cell;
use std::fmt::Display;
use std::time::Duration;
use tracing::{error, warn};

/// Capability check used to decide whether a failed operation may be retried.
pub trait Transient {
	fn is_transient(&self) -> bool;
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Total number of attempts, including the first one.
	pub max_attempts: u32,
	/// Delay before the second attempt.
	pub initial_delay: Duration,
	/// Factor applied to the delay after every retry.
	pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			initial_delay: Duration::from_secs(1),
			backoff_multiplier: 3,
		}
	}
}

/// Deterministic backoff schedule derived from a `RetryPolicy`.
struct PolicyBackoff {
	policy: RetryPolicy,
	next_delay: Duration,
	retries_left: u32,
}

impl PolicyBackoff {
	fn new(policy: &RetryPolicy) -> Self {
		Self {
			policy: policy.clone(),
			next_delay: policy.initial_delay,
			retries_left: policy.max_attempts.saturating_sub(1),
		}
	}
}

impl Backoff for PolicyBackoff {
	fn reset(&mut self) {
		self.next_delay = self.policy.initial_delay;
		self.retries_left = self.policy.max_attempts.saturating_sub(1);
	}

	fn next_backoff(&mut self) -> Option<Duration> {
		if self.retries_left == 0 {
			return None;
		}
		self.retries_left -= 1;
		let delay = self.next_delay;
		self.next_delay = delay.saturating_mul(self.policy.backoff_multiplier);
		Some(delay)
	}
}

/// Run `operation`, retrying transient failures according to `policy`.
pub fn retry<T, E, F>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
	E: Transient + Display,
	F: FnMut() -> Result<T, E>,
{
	retry_notify(policy, operation, |_: &E, _: Duration| {})
}

/// Like [`retry`], invoking `notify` with each transient error and the delay slept before the
/// next attempt.
pub fn retry_notify<T, E, F, N>(policy: &RetryPolicy, mut operation: F, mut notify: N) -> Result<T, E>
where
	E: Transient + Display,
	F: FnMut() -> Result<T, E>,
	N: FnMut(&E, Duration),
{
	let max_attempts = policy.max_attempts.max(1);
	let attempt = Cell::new(0u32);

	let result = backoff::retry_notify(
		PolicyBackoff::new(policy),
		|| {
			attempt.set(attempt.get() + 1);
			operation().map_err(|e| {
				if e.is_transient() {
					if attempt.get() >= max_attempts {
						error!("Max retries reached, operation failed: {}", e);
					}
					backoff::Error::transient(e)
				} else {
					backoff::Error::permanent(e)
				}
			})
		},
		|e: E, delay: Duration| {
			warn!(
				"Transient error (attempt {}/{}): {}. Retrying in {:?}",
				attempt.get(),
				max_attempts,
				e,
				delay
			);
			notify(&e, delay);
		},
	);

	result.map_err(|e| match e {
		backoff::Error::Permanent(err) => err,
		backoff::Error::Transient { err, .. } => err,
	})
}

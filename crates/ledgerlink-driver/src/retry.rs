//! Retry policy and backoff.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use ledgerlink_common::TransactionId;

use crate::error::DriverError;

/// Default retry ceiling of [`ExponentialBackoff`].
pub const DEFAULT_RETRY_LIMIT: u32 = 4;

const BACKOFF_BASE_MS: u64 = 10;
const BACKOFF_CAP_MS: u64 = 5000;

/// Observer invoked before each backoff sleep with the 1-based number of the
/// retry about to happen.
pub type RetryObserver = Arc<dyn Fn(u32) + Send + Sync>;

/// Decides how often and how long to wait between transaction attempts.
///
/// A policy is immutable and shared across calls. `attempt` passed to
/// [`backoff`](Self::backoff) is the number of attempts already failed,
/// starting at 0 for the first retry.
pub trait RetryPolicy: Send + Sync {
    /// Retry ceiling: the number of retries after the initial attempt. Zero
    /// means no retries.
    fn limit(&self) -> u32;

    /// Delay before the next attempt.
    fn backoff(
        &self,
        attempt: u32,
        error: &DriverError,
        transaction_id: Option<&TransactionId>,
    ) -> Duration;
}

/// Capped exponential backoff with jitter, the default policy.
///
/// `delay = capped/2 + uniform(0, capped/2 + 1)` where
/// `capped = min(cap, base * 2^attempt)`, base 10ms and cap 5s. The jitter
/// keeps concurrently failing callers from retrying in lockstep.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
    limit: u32,
}

impl ExponentialBackoff {
    /// Policy with the given retry ceiling and default base/cap.
    pub fn new(limit: u32) -> Self {
        Self {
            base: Duration::from_millis(BACKOFF_BASE_MS),
            cap: Duration::from_millis(BACKOFF_CAP_MS),
            limit,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_LIMIT)
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn limit(&self) -> u32 {
        self.limit
    }

    fn backoff(
        &self,
        attempt: u32,
        _error: &DriverError,
        _transaction_id: Option<&TransactionId>,
    ) -> Duration {
        let base = self.base.as_millis() as u64;
        let cap = self.cap.as_millis() as u64;
        // Clamp the shift; beyond 2^20 the cap dominates anyway.
        let uncapped = base.saturating_mul(1u64 << attempt.min(20));
        let half = uncapped.min(cap) / 2;

        let jitter = rand::thread_rng().gen_range(0..half + 1);
        Duration::from_millis(half + jitter)
    }
}

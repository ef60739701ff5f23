//! The transaction execution engine.
//!
//! Drives the retry loop around one logical unit of work: acquire a session,
//! start a transaction, run the caller's body, and either hand the committed
//! result back or classify the failure and decide between retrying (on a
//! fresh transaction, possibly a fresh session) and propagating.
//!
//! The session is released back to the pool on every path out of an attempt,
//! success or failure. Failed attempts abort their transaction best-effort
//! first; an abort that itself fails only degrades the session so the pool
//! drops it, and never masks the original error.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use ledgerlink_common::TransactionId;

use crate::error::{DriverError, Result};
use crate::pool::SessionPool;
use crate::retry::{RetryObserver, RetryPolicy};
use crate::session::Session;
use crate::transaction::{TransactionAttempt, TransactionOutcome};

/// Extra headroom on the invalid-session attempt cap beyond the pool
/// capacity. When the entire fleet of pooled sessions has gone stale, every
/// one of them can burn one attempt before a fresh session succeeds; the
/// margin covers a few genuinely new sessions failing too.
const SESSION_FAILURE_MARGIN: u32 = 3;

/// Per-call engine borrowing the driver's pool and policy.
pub(crate) struct TransactionExecutor<'a> {
    pool: &'a SessionPool,
    policy: &'a dyn RetryPolicy,
    acquire_timeout: Option<Duration>,
    on_retry: Option<&'a RetryObserver>,
}

impl<'a> TransactionExecutor<'a> {
    pub(crate) fn new(
        pool: &'a SessionPool,
        policy: &'a dyn RetryPolicy,
        acquire_timeout: Option<Duration>,
        on_retry: Option<&'a RetryObserver>,
    ) -> Self {
        Self {
            pool,
            policy,
            acquire_timeout,
            on_retry,
        }
    }

    /// Runs `body` inside a transaction, retrying per the policy.
    ///
    /// The body may run multiple times before a result is returned; callers
    /// must keep it idempotent.
    pub(crate) async fn execute<F, Fut, R>(&self, body: F) -> Result<R>
    where
        F: Fn(TransactionAttempt) -> Fut,
        Fut: Future<Output = Result<TransactionOutcome<R>>>,
    {
        let mut attempt: u32 = 0;
        // Attempts lost to recoverable invalid-session errors are bounded
        // separately: with every session in the pool potentially stale, the
        // policy ceiling alone could let an unhealthy fleet loop for a long
        // time.
        let mut session_failures: u32 = 0;
        let session_failure_cap = self.pool.capacity() as u32 + SESSION_FAILURE_MARGIN;

        loop {
            // Pool and closed-resource errors propagate immediately, no retry.
            let session = self.pool.acquire(self.acquire_timeout).await?;

            let error = match self.run_attempt(&session, &body).await {
                Ok(TransactionOutcome::Committed(value)) => {
                    self.pool.release(session).await;
                    return Ok(value);
                }
                Ok(TransactionOutcome::Aborted) => {
                    self.pool.release(session).await;
                    return Err(DriverError::TransactionAborted);
                }
                Err(error) => error,
            };

            let (retryable, invalid_session, transaction_id) = match &error {
                DriverError::Transaction {
                    retryable,
                    invalid_session,
                    transaction_id,
                    ..
                } => (*retryable, *invalid_session, transaction_id.clone()),
                _ => (false, false, None),
            };

            // A recoverable invalid-session error means this session is
            // untrustworthy: drop it so the next attempt gets a fresh one.
            if retryable && invalid_session {
                session.mark_dead();
            }
            self.pool.release(session).await;

            if !retryable || attempt >= self.policy.limit() {
                return Err(error);
            }
            if invalid_session {
                session_failures += 1;
                if session_failures >= session_failure_cap {
                    warn!(
                        failures = session_failures,
                        "giving up after repeated invalid-session errors"
                    );
                    return Err(error);
                }
            }

            if let Some(observer) = self.on_retry {
                observer(attempt + 1);
            }

            let delay = self.policy.backoff(attempt, &error, transaction_id.as_ref());
            debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying transaction"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One attempt: start a transaction, run the body, clean up on failure.
    async fn run_attempt<F, Fut, R>(
        &self,
        session: &Session,
        body: &F,
    ) -> Result<TransactionOutcome<R>>
    where
        F: Fn(TransactionAttempt) -> Fut,
        Fut: Future<Output = Result<TransactionOutcome<R>>>,
    {
        let transaction_id: TransactionId = session
            .start_transaction()
            .await
            .map_err(|source| DriverError::transaction(source, None, false))?;

        let transaction = TransactionAttempt::new(session.clone(), transaction_id.clone());

        match body(transaction).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                // Best-effort abort; its own failure degrades the session but
                // never replaces the original error.
                if session.abort_transaction().await.is_err() {
                    warn!(
                        transaction = %transaction_id,
                        "abort after failed attempt did not go through, discarding session"
                    );
                    session.mark_dead();
                }
                Err(error)
            }
        }
    }
}

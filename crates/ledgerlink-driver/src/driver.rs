//! The driver façade and its builder.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use ledgerlink_common::{Communicator, TRANSPORT_CONCURRENCY_CEILING};

use crate::error::{DriverError, Result};
use crate::executor::TransactionExecutor;
use crate::pool::SessionPool;
use crate::retry::{ExponentialBackoff, RetryObserver, RetryPolicy};
use crate::transaction::{TransactionAttempt, TransactionOutcome};

/// Statement issued by [`LedgerDriver::get_table_names`].
const TABLE_NAME_QUERY: &str =
    "SELECT name FROM information_schema.user_tables WHERE status = 'ACTIVE'";

/// Process-wide entry point for running transactions against one ledger.
///
/// Owns the session pool and retry policy; construct it once with
/// [`LedgerDriver::builder`], share it freely (cloning is cheap, all clones
/// share one pool), and [`close`](Self::close) it explicitly when done.
#[derive(Clone)]
pub struct LedgerDriver {
    inner: Arc<DriverInner>,
}

struct DriverInner {
    ledger_name: String,
    pool: SessionPool,
    retry_policy: Box<dyn RetryPolicy>,
    acquire_timeout: Option<Duration>,
    on_retry: Option<RetryObserver>,
}

impl LedgerDriver {
    pub fn builder() -> LedgerDriverBuilder {
        LedgerDriverBuilder::new()
    }

    /// The ledger this driver talks to.
    pub fn ledger_name(&self) -> &str {
        &self.inner.ledger_name
    }

    /// Runs `body` as one transaction, retrying recoverable failures.
    ///
    /// The body receives a [`TransactionAttempt`] and must finish it with
    /// [`commit`](TransactionAttempt::commit) or
    /// [`abort`](TransactionAttempt::abort). On recoverable failures the body
    /// runs again on a fresh transaction (and, if the session went bad, a
    /// fresh session), so it **must be idempotent**; the driver cannot
    /// enforce that.
    pub async fn execute_lambda<F, Fut, R>(&self, body: F) -> Result<R>
    where
        F: Fn(TransactionAttempt) -> Fut,
        Fut: Future<Output = Result<TransactionOutcome<R>>>,
    {
        self.execute_lambda_with_policy(self.inner.retry_policy.as_ref(), body)
            .await
    }

    /// [`execute_lambda`](Self::execute_lambda) with a per-call retry policy
    /// instead of the driver-wide one.
    pub async fn execute_lambda_with_policy<F, Fut, R>(
        &self,
        policy: &dyn RetryPolicy,
        body: F,
    ) -> Result<R>
    where
        F: Fn(TransactionAttempt) -> Fut,
        Fut: Future<Output = Result<TransactionOutcome<R>>>,
    {
        let executor = TransactionExecutor::new(
            &self.inner.pool,
            policy,
            self.inner.acquire_timeout,
            self.inner.on_retry.as_ref(),
        );
        executor.execute(body).await
    }

    /// Runs a single statement in its own transaction and returns its rows.
    pub async fn execute(&self, statement: &str, params: Vec<Value>) -> Result<Vec<Value>> {
        let statement = statement.to_string();
        self.execute_lambda(move |mut tx| {
            let statement = statement.clone();
            let params = params.clone();
            async move {
                let result = tx.execute_statement(&statement, params).await?;
                tx.commit(result.rows).await
            }
        })
        .await
    }

    /// Names of the active tables in the ledger.
    pub async fn get_table_names(&self) -> Result<Vec<String>> {
        self.execute_lambda(|mut tx| async move {
            let result = tx.execute_statement(TABLE_NAME_QUERY, Vec::new()).await?;
            tx.commit(result.project_column("name")).await
        })
        .await
    }

    /// Ends all pooled sessions and makes the driver permanently unusable.
    ///
    /// Idempotent; operations after close fail with [`DriverError::Closed`].
    pub async fn close(&self) {
        self.inner.pool.close_all().await;
        info!(ledger = %self.inner.ledger_name, "ledger driver closed");
    }
}

impl std::fmt::Debug for LedgerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDriver")
            .field("ledger_name", &self.inner.ledger_name)
            .field("capacity", &self.inner.pool.capacity())
            .finish()
    }
}

/// Builder for [`LedgerDriver`].
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use ledgerlink_driver::{ExponentialBackoff, LedgerDriver};
/// # fn demo(communicator: Arc<dyn ledgerlink_common::Communicator>) {
/// let driver = LedgerDriver::builder()
///     .ledger_name("sample-ledger")
///     .communicator(communicator)
///     .max_concurrent_transactions(10)
///     .retry_policy(ExponentialBackoff::new(2))
///     .build()
///     .unwrap();
/// # let _ = driver;
/// # }
/// ```
pub struct LedgerDriverBuilder {
    ledger_name: Option<String>,
    communicator: Option<Arc<dyn Communicator>>,
    max_concurrent_transactions: usize,
    retry_policy: Box<dyn RetryPolicy>,
    acquire_timeout: Option<Duration>,
    on_retry: Option<RetryObserver>,
}

impl LedgerDriverBuilder {
    pub fn new() -> Self {
        Self {
            ledger_name: None,
            communicator: None,
            max_concurrent_transactions: TRANSPORT_CONCURRENCY_CEILING,
            retry_policy: Box::new(ExponentialBackoff::default()),
            acquire_timeout: None,
            on_retry: None,
        }
    }

    /// The ledger to open sessions against. Required.
    pub fn ledger_name(mut self, name: impl Into<String>) -> Self {
        self.ledger_name = Some(name.into());
        self
    }

    /// The transport to reach the service through. Required.
    pub fn communicator(mut self, communicator: Arc<dyn Communicator>) -> Self {
        self.communicator = Some(communicator);
        self
    }

    /// Maximum number of concurrently outstanding sessions.
    ///
    /// Defaults to the transport's own ceiling and must not exceed it.
    pub fn max_concurrent_transactions(mut self, limit: usize) -> Self {
        self.max_concurrent_transactions = limit;
        self
    }

    /// Retry policy for recoverable transaction failures. Defaults to
    /// [`ExponentialBackoff::default`].
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Box::new(policy);
        self
    }

    /// How long to wait for a session permit before failing with
    /// [`DriverError::PoolExhausted`]. Without it, acquisition waits
    /// indefinitely.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Observer called before each retry sleep with the 1-based retry
    /// number.
    pub fn on_retry(mut self, observer: RetryObserver) -> Self {
        self.on_retry = Some(observer);
        self
    }

    /// Validates the configuration and builds the driver.
    ///
    /// # Errors
    ///
    /// [`DriverError::Configuration`] if the ledger name or communicator is
    /// missing, or the concurrency limit is zero or exceeds the transport
    /// ceiling. Configuration errors are never retried.
    pub fn build(self) -> Result<LedgerDriver> {
        let ledger_name = match self.ledger_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(DriverError::Configuration(
                    "ledger name is required".to_string(),
                ))
            }
        };
        if self.max_concurrent_transactions == 0 {
            return Err(DriverError::Configuration(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_transactions > TRANSPORT_CONCURRENCY_CEILING {
            return Err(DriverError::Configuration(format!(
                "concurrency limit {} exceeds the transport ceiling {}",
                self.max_concurrent_transactions, TRANSPORT_CONCURRENCY_CEILING
            )));
        }

        let communicator = self.communicator.ok_or_else(|| {
            DriverError::Configuration("communicator is required".to_string())
        })?;

        let pool = SessionPool::new(
            communicator,
            ledger_name.clone(),
            self.max_concurrent_transactions,
        );

        Ok(LedgerDriver {
            inner: Arc::new(DriverInner {
                ledger_name,
                pool,
                retry_policy: self.retry_policy,
                acquire_timeout: self.acquire_timeout,
                on_retry: self.on_retry,
            }),
        })
    }
}

impl Default for LedgerDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_ledger_name_and_communicator() {
        let err = LedgerDriver::builder().build().unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));

        let err = LedgerDriver::builder()
            .ledger_name("")
            .build()
            .unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));
    }

    #[test]
    fn test_concurrency_limit_validation() {
        let err = LedgerDriver::builder()
            .ledger_name("ledger")
            .max_concurrent_transactions(TRANSPORT_CONCURRENCY_CEILING + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));

        let err = LedgerDriver::builder()
            .ledger_name("ledger")
            .max_concurrent_transactions(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, DriverError::Configuration(_)));
    }
}

//! LedgerLink Driver
//!
//! Managed, concurrent access to a remote transactional ledger database.
//!
//! # Overview
//!
//! The driver bounds the number of simultaneous sessions to the backing
//! service, reuses idle sessions safely, and retries transactions that fail
//! for recoverable reasons (optimistic-concurrency conflicts, transient
//! service errors, stale sessions) without ever retrying an ambiguous commit.
//! Every transaction accumulates a commutative digest over its statements and
//! verifies the service's reported commit digest against it before reporting
//! success.
//!
//! # Components
//!
//! - [`LedgerDriver`] - the façade: build once, share clones, close explicitly
//! - [`SessionPool`] - bounded admission gate over sessions
//! - [`TransactionAttempt`] - one transaction's execution and digest handle
//! - [`RetryPolicy`] / [`ExponentialBackoff`] - backoff between attempts
//! - [`DriverError`] - the error taxonomy callers branch on
//!
//! The wire transport is not part of this crate: the driver talks through the
//! [`Communicator`](ledgerlink_common::Communicator) boundary defined in
//! `ledgerlink-common`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ledgerlink_driver::LedgerDriver;
//!
//! async fn run(
//!     communicator: Arc<dyn ledgerlink_common::Communicator>,
//! ) -> ledgerlink_driver::Result<()> {
//!     let driver = LedgerDriver::builder()
//!         .ledger_name("sample-ledger")
//!         .communicator(communicator)
//!         .build()?;
//!
//!     // Bodies may run more than once on retry: keep them idempotent.
//!     let rows = driver
//!         .execute_lambda(|mut tx| async move {
//!             let result = tx
//!                 .execute_statement(
//!                     "INSERT INTO accounts VALUE ?",
//!                     vec![serde_json::json!({"id": 1})],
//!                 )
//!                 .await?;
//!             tx.commit(result.rows).await
//!         })
//!         .await?;
//!     let _ = rows;
//!
//!     driver.close().await;
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod error;
mod executor;
pub mod pool;
pub mod retry;
pub mod session;
pub mod transaction;

pub use driver::{LedgerDriver, LedgerDriverBuilder};
pub use error::{DriverError, Result};
pub use pool::SessionPool;
pub use retry::{ExponentialBackoff, RetryObserver, RetryPolicy, DEFAULT_RETRY_LIMIT};
pub use session::Session;
pub use transaction::{TransactionAttempt, TransactionOutcome};

pub use ledgerlink_common::{
    CommunicatorError, InvalidHashSize, LedgerDigest, SessionToken, StatementResult, TransactionId,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::digest::LedgerDigest;
use crate::error::Result;
use crate::protocol::{SessionToken, StatementResult, TransactionId};

/// The transport's own ceiling on concurrently open sessions.
///
/// The driver's configured concurrency limit is validated against this at
/// construction and defaults to it; a pool can never admit more sessions than
/// the transport can carry.
pub const TRANSPORT_CONCURRENCY_CEILING: usize = 50;

/// The opaque RPC channel to the remote ledger service.
///
/// The driver consumes this boundary and never implements it; a transport
/// maps its own wire protocol onto these six calls and its failures onto
/// [`CommunicatorError`](crate::error::CommunicatorError). Implementations
/// must be safe to share across tasks: the driver holds one communicator
/// behind an `Arc` and opens every session through it.
///
/// Calling [`abort_transaction`](Self::abort_transaction) with no transaction
/// open must be a cheap no-op on a healthy session; the driver uses exactly
/// that call as the health probe for sessions it is about to reuse.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Opens a new session against the named ledger.
    async fn open_session(&self, ledger: &str) -> Result<SessionToken>;

    /// Starts a transaction on an open session, returning its id.
    async fn start_transaction(&self, session: &SessionToken) -> Result<TransactionId>;

    /// Executes one statement inside a transaction, returning the result rows
    /// together with the statement's digest.
    async fn execute_statement(
        &self,
        session: &SessionToken,
        transaction: &TransactionId,
        statement: &str,
        params: &[Value],
    ) -> Result<StatementResult>;

    /// Commits a transaction, sending the digest the client accumulated and
    /// returning the digest the service accumulated.
    async fn commit_transaction(
        &self,
        session: &SessionToken,
        transaction: &TransactionId,
        digest: &LedgerDigest,
    ) -> Result<LedgerDigest>;

    /// Aborts whatever transaction is open on the session, if any.
    async fn abort_transaction(&self, session: &SessionToken) -> Result<()>;

    /// Ends the session on the service side.
    async fn end_session(&self, session: &SessionToken) -> Result<()>;
}

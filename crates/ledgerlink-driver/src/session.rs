use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use ledgerlink_common::{
    Communicator, LedgerDigest, Result as CommunicatorResult, SessionToken, StatementResult,
    TransactionId,
};

/// One checked-out communication channel to the remote ledger service.
///
/// Wraps a session token together with the shared communicator and an `alive`
/// flag. A session is reusable across transactions while alive; the flag
/// flips to false when a failure makes the session untrustworthy, after which
/// the pool drops it instead of reusing it.
///
/// The handle is cheap to clone (shared inner state). Exclusive checkout,
/// meaning no two transactions on the same session concurrently, is enforced
/// by the pool, not by this type.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    token: SessionToken,
    communicator: Arc<dyn Communicator>,
    alive: AtomicBool,
}

impl Session {
    pub(crate) fn new(token: SessionToken, communicator: Arc<dyn Communicator>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                token,
                communicator,
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// The service-issued token identifying this session.
    pub fn token(&self) -> &SessionToken {
        &self.inner.token
    }

    /// Whether the session is still considered usable.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    /// Marks the session untrustworthy so the pool drops it on release.
    pub fn mark_dead(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
    }

    /// Lightweight health probe: aborts a (non-existent) transaction on the
    /// session and reports whether the service accepted the call.
    pub(crate) async fn probe(&self) -> bool {
        self.abort_transaction().await.is_ok()
    }

    pub(crate) async fn start_transaction(&self) -> CommunicatorResult<TransactionId> {
        self.inner
            .communicator
            .start_transaction(&self.inner.token)
            .await
    }

    pub(crate) async fn execute_statement(
        &self,
        transaction: &TransactionId,
        statement: &str,
        params: &[Value],
    ) -> CommunicatorResult<StatementResult> {
        self.inner
            .communicator
            .execute_statement(&self.inner.token, transaction, statement, params)
            .await
    }

    pub(crate) async fn commit_transaction(
        &self,
        transaction: &TransactionId,
        digest: &LedgerDigest,
    ) -> CommunicatorResult<LedgerDigest> {
        self.inner
            .communicator
            .commit_transaction(&self.inner.token, transaction, digest)
            .await
    }

    pub(crate) async fn abort_transaction(&self) -> CommunicatorResult<()> {
        self.inner
            .communicator
            .abort_transaction(&self.inner.token)
            .await
    }

    /// Ends the session on the service side, best-effort.
    pub(crate) async fn end(&self) {
        if let Err(error) = self.inner.communicator.end_session(&self.inner.token).await {
            debug!(token = %self.inner.token, %error, "failed to end session");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.inner.token)
            .field("alive", &self.is_alive())
            .finish()
    }
}

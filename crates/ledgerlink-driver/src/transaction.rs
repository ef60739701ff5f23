//! One transaction attempt and its digest accumulation.

use serde_json::Value;
use tracing::debug;

use ledgerlink_common::{LedgerDigest, StatementResult, TransactionId};

use crate::error::{DriverError, Result};
use crate::session::Session;

/// How a transaction body finished: committed with the body's result, or
/// cancelled by the caller.
#[derive(Debug)]
pub enum TransactionOutcome<R> {
    Committed(R),
    Aborted,
}

/// Handle to one in-flight transaction, bound to a single session.
///
/// Created by the engine for each attempt and handed to the caller's body.
/// The running digest starts as the hash of the transaction id; every
/// executed statement's digest is folded into it before results are handed
/// back, so by commit time the accumulated digest covers exactly the
/// statements that ran.
///
/// The attempt is terminal: [`commit`](Self::commit) and
/// [`abort`](Self::abort) consume it, so a finished transaction cannot be
/// touched again.
pub struct TransactionAttempt {
    session: Session,
    id: TransactionId,
    digest: LedgerDigest,
}

impl TransactionAttempt {
    pub(crate) fn new(session: Session, id: TransactionId) -> Self {
        let digest = id.seed_digest();
        Self {
            session,
            id,
            digest,
        }
    }

    /// The service-issued id of this transaction.
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// The digest accumulated so far.
    pub fn accumulated_digest(&self) -> &LedgerDigest {
        &self.digest
    }

    /// Executes one statement inside this transaction.
    ///
    /// The statement's digest is folded into the running digest before the
    /// rows are returned.
    pub async fn execute_statement(
        &mut self,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<StatementResult> {
        let result = self
            .session
            .execute_statement(&self.id, statement, &params)
            .await
            .map_err(|source| DriverError::transaction(source, Some(self.id.clone()), false))?;

        self.digest = self.digest.combine(&result.digest);
        Ok(result)
    }

    /// Commits the transaction, carrying `value` out as the body's result.
    ///
    /// Sends the accumulated digest and compares it against the digest the
    /// service reports back. A mismatch fails closed with
    /// [`DriverError::DigestMismatch`]; it is never retried.
    pub async fn commit<R>(self, value: R) -> Result<TransactionOutcome<R>> {
        let server_digest = self
            .session
            .commit_transaction(&self.id, &self.digest)
            .await
            .map_err(|source| DriverError::transaction(source, Some(self.id.clone()), true))?;

        if server_digest != self.digest {
            return Err(DriverError::DigestMismatch {
                transaction_id: self.id,
            });
        }

        Ok(TransactionOutcome::Committed(value))
    }

    /// Cancels the transaction.
    ///
    /// The wire abort is best-effort; if it fails the session is marked dead
    /// so the pool drops it, but the caller's cancellation still stands.
    pub async fn abort<R>(self) -> Result<TransactionOutcome<R>> {
        if self.session.abort_transaction().await.is_err() {
            debug!(transaction = %self.id, "abort failed, discarding session");
            self.session.mark_dead();
        }
        Ok(TransactionOutcome::Aborted)
    }
}

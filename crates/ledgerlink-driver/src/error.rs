//! Driver error taxonomy and failure classification.
//!
//! Every remote failure is classified exactly once, at the point of catch,
//! by [`classify`]; the verdict is baked into the propagated
//! [`DriverError::Transaction`] value so callers can branch on it without
//! re-deriving it.

use std::time::Duration;

use thiserror::Error;

use ledgerlink_common::{CommunicatorError, InvalidHashSize, TransactionId};

/// Errors surfaced by the driver to its callers.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Invalid driver configuration. Raised at construction, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation on a closed driver, pool or session.
    #[error("driver is closed")]
    Closed,

    /// No session permit became available within the configured timeout.
    #[error("session pool exhausted after waiting {waited:?}")]
    PoolExhausted { waited: Duration },

    /// A digest value with an illegal length.
    #[error(transparent)]
    InvalidHashSize(#[from] InvalidHashSize),

    /// The digest the service reported at commit does not equal the digest
    /// the driver accumulated. Gross protocol-level corruption or a
    /// client/server disagreement about executed statements; never retried.
    #[error("commit digest mismatch for transaction {transaction_id}")]
    DigestMismatch { transaction_id: TransactionId },

    /// The transaction body cancelled the transaction explicitly.
    #[error("transaction aborted by caller")]
    TransactionAborted,

    /// A remote call failed during a transaction attempt.
    ///
    /// Carries the classification verdict alongside the cause: whether the
    /// failure was retryable, whether it was an invalid-session case, which
    /// step it happened in and the transaction id if one had been issued.
    #[error("transaction {} failed: {source}", display_txn_id(.transaction_id))]
    Transaction {
        #[source]
        source: CommunicatorError,
        transaction_id: Option<TransactionId>,
        during_commit: bool,
        retryable: bool,
        invalid_session: bool,
    },
}

fn display_txn_id(id: &Option<TransactionId>) -> &str {
    id.as_ref().map(TransactionId::as_str).unwrap_or("(not started)")
}

/// What the engine should do with a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Retry on a fresh transaction. `replace_session` forces discarding the
    /// current session and obtaining a new one first.
    Retry { replace_session: bool },
    /// Propagate without retrying.
    Fatal,
}

/// The single classification function mapping transport failures to retry
/// dispositions.
///
/// A transient failure observed during the commit call itself is fatal even
/// though the same failure anywhere else would be retried: the commit may
/// already have been applied, and retrying could apply it twice. This
/// asymmetry is deliberate.
pub(crate) fn classify(source: &CommunicatorError, during_commit: bool) -> Disposition {
    match source {
        CommunicatorError::OccConflict(_) => Disposition::Retry {
            replace_session: false,
        },
        CommunicatorError::InvalidSession {
            transaction_expired: false,
            ..
        } => Disposition::Retry {
            replace_session: true,
        },
        CommunicatorError::InvalidSession {
            transaction_expired: true,
            ..
        } => Disposition::Fatal,
        source if source.is_transient() && !during_commit => Disposition::Retry {
            replace_session: false,
        },
        _ => Disposition::Fatal,
    }
}

impl DriverError {
    /// Wraps a transport failure, running classification at the point of
    /// catch.
    pub(crate) fn transaction(
        source: CommunicatorError,
        transaction_id: Option<TransactionId>,
        during_commit: bool,
    ) -> Self {
        let disposition = classify(&source, during_commit);
        DriverError::Transaction {
            retryable: matches!(disposition, Disposition::Retry { .. }),
            invalid_session: source.is_invalid_session(),
            source,
            transaction_id,
            during_commit,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

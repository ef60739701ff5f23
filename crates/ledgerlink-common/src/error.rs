use thiserror::Error;

/// Errors a transport reports back from remote calls.
///
/// This is a closed taxonomy: the driver classifies every remote failure into
/// one of these variants exactly once, at the point of catch, and never by
/// inspecting open-ended error types. Transports are responsible for mapping
/// their own status codes and named failures onto this enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommunicatorError {
    /// The transaction's read/write set became stale relative to concurrent
    /// commits (optimistic-concurrency-control failure).
    #[error("optimistic concurrency conflict: {0}")]
    OccConflict(String),

    /// The session is no longer valid on the service side.
    ///
    /// `transaction_expired` distinguishes a session invalidated because its
    /// open transaction ran past the service's transaction lifetime (not
    /// recoverable by switching sessions) from a session that simply went
    /// stale (recoverable with a fresh session).
    #[error("invalid session: {message}")]
    InvalidSession {
        message: String,
        transaction_expired: bool,
    },

    /// A service-level failure carrying the transport's status code.
    ///
    /// `retryable` is the transport's own judgement (throttling and similar
    /// markers); 5xx-class codes are treated as transient regardless.
    #[error("service error {code}: {message}")]
    Service {
        code: u16,
        message: String,
        retryable: bool,
    },

    /// The request itself was malformed or rejected outright.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The transport failed to reach the service at all.
    #[error("network error: {0}")]
    Network(String),
}

impl CommunicatorError {
    /// Whether this is an invalid-session failure (of either flavor).
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, CommunicatorError::InvalidSession { .. })
    }

    /// Whether this is an invalid-session failure caused by transaction
    /// expiry.
    pub fn is_transaction_expired(&self) -> bool {
        matches!(
            self,
            CommunicatorError::InvalidSession {
                transaction_expired: true,
                ..
            }
        )
    }

    /// Whether the transport considers this failure transient.
    ///
    /// Covers errors the transport explicitly marked retryable, 5xx-class
    /// service failures, and network-level failures.
    pub fn is_transient(&self) -> bool {
        match self {
            CommunicatorError::Service {
                code, retryable, ..
            } => *retryable || *code >= 500,
            CommunicatorError::Network(_) => true,
            _ => false,
        }
    }
}

/// Error for digest values whose length is neither 0 nor 32 bytes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid hash size: expected 0 or 32 bytes, got {0}")]
pub struct InvalidHashSize(pub usize);

pub type Result<T> = std::result::Result<T, CommunicatorError>;

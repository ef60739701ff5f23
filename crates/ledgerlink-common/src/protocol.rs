use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::digest::LedgerDigest;

/// Opaque token identifying one open session on the remote service.
///
/// Issued by the service when a session is opened and quoted back on every
/// call made over that session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one transaction, issued by the service at start.
///
/// Doubles as the seed of the transaction's running digest: the digest starts
/// as the hash of this id and every statement digest is folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest a fresh transaction's accumulation starts from.
    pub fn seed_digest(&self) -> LedgerDigest {
        LedgerDigest::from_utf8(&self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of executing one statement: the projected rows plus the statement
/// digest the service folded into its side of the transaction digest.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
    /// Decoded result rows, one structured value each.
    pub rows: Vec<Value>,
    /// The statement's digest as computed by the service.
    pub digest: LedgerDigest,
}

impl StatementResult {
    /// Projects a single string-valued column out of every row that carries
    /// it. Rows without the column, or with a non-string value in it, are
    /// skipped.
    pub fn project_column(&self, name: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(name))
            .filter_map(|value| value.as_str())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_digest_matches_hash_of_id() {
        let id = TransactionId::new("txn-42");
        assert_eq!(id.seed_digest(), LedgerDigest::from_utf8("txn-42"));
    }

    #[test]
    fn test_project_column_skips_malformed_rows() {
        let result = StatementResult {
            rows: vec![
                json!({"name": "accounts"}),
                json!({"name": 7}),
                json!({"other": "ignored"}),
                json!({"name": "transfers"}),
            ],
            digest: LedgerDigest::empty(),
        };

        assert_eq!(result.project_column("name"), vec!["accounts", "transfers"]);
    }
}

//! In-memory fake ledger used by the integration tests.
//!
//! Implements the `Communicator` boundary the way the remote service would
//! behave at the protocol level: it issues session tokens and transaction
//! ids, folds statement digests into a per-transaction digest exactly like
//! the driver does, and reports its accumulated digest at commit. Failure
//! injection hooks let tests script transport errors per call site.

// Each integration test binary compiles its own copy of this module and uses
// a different subset of it.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use ledgerlink_common::{
    Communicator, CommunicatorError, LedgerDigest, Result, SessionToken, StatementResult,
    TransactionId,
};

const TABLE_NAME_QUERY_PREFIX: &str = "SELECT name FROM information_schema.user_tables";

#[derive(Default)]
struct LedgerState {
    tables: Vec<String>,
    transaction_digests: HashMap<TransactionId, LedgerDigest>,
    last_commit_digest: Option<LedgerDigest>,
    execute_failures: VecDeque<CommunicatorError>,
    execute_failure_always: Option<CommunicatorError>,
    commit_failures: VecDeque<CommunicatorError>,
    corrupt_next_commit: bool,
}

pub struct FakeLedger {
    state: Mutex<LedgerState>,
    opened_sessions: AtomicUsize,
    ended_sessions: AtomicUsize,
    body_transactions: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            opened_sessions: AtomicUsize::new(0),
            ended_sessions: AtomicUsize::new(0),
            body_transactions: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
        }
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        let ledger = Self::new();
        ledger.state.lock().unwrap().tables = tables.iter().map(|t| t.to_string()).collect();
        ledger
    }

    /// Scripts one failure for the next `execute_statement` call.
    pub fn fail_next_execute(&self, error: CommunicatorError) {
        self.state.lock().unwrap().execute_failures.push_back(error);
    }

    /// Makes every `execute_statement` call fail until cleared.
    pub fn fail_every_execute(&self, error: CommunicatorError) {
        self.state.lock().unwrap().execute_failure_always = Some(error);
    }

    /// Scripts one failure for the next `commit_transaction` call.
    pub fn fail_next_commit(&self, error: CommunicatorError) {
        self.state.lock().unwrap().commit_failures.push_back(error);
    }

    /// Makes the next commit report a digest that cannot match the client's.
    pub fn corrupt_next_commit(&self) {
        self.state.lock().unwrap().corrupt_next_commit = true;
    }

    pub fn opened_sessions(&self) -> usize {
        self.opened_sessions.load(Ordering::SeqCst)
    }

    pub fn ended_sessions(&self) -> usize {
        self.ended_sessions.load(Ordering::SeqCst)
    }

    pub fn started_transactions(&self) -> usize {
        self.body_transactions.load(Ordering::SeqCst)
    }

    /// The digest the service accumulated for the last committed
    /// transaction.
    pub fn last_commit_digest(&self) -> Option<LedgerDigest> {
        self.state.lock().unwrap().last_commit_digest.clone()
    }

    fn next(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Communicator for FakeLedger {
    async fn open_session(&self, _ledger: &str) -> Result<SessionToken> {
        self.opened_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(SessionToken::new(format!("session-{}", self.next())))
    }

    async fn start_transaction(&self, _session: &SessionToken) -> Result<TransactionId> {
        self.body_transactions.fetch_add(1, Ordering::SeqCst);
        let id = TransactionId::new(format!("txn-{}", self.next()));
        let mut state = self.state.lock().unwrap();
        state
            .transaction_digests
            .insert(id.clone(), id.seed_digest());
        Ok(id)
    }

    async fn execute_statement(
        &self,
        _session: &SessionToken,
        transaction: &TransactionId,
        statement: &str,
        params: &[Value],
    ) -> Result<StatementResult> {
        let mut state = self.state.lock().unwrap();

        if let Some(error) = state.execute_failures.pop_front() {
            return Err(error);
        }
        if let Some(error) = state.execute_failure_always.clone() {
            return Err(error);
        }

        let digest = LedgerDigest::from_encoded_value(&json!([statement, params]));
        if let Some(running) = state.transaction_digests.get_mut(transaction) {
            *running = running.combine(&digest);
        }

        let rows = if statement.starts_with(TABLE_NAME_QUERY_PREFIX) {
            state
                .tables
                .iter()
                .map(|name| json!({ "name": name }))
                .collect()
        } else {
            vec![json!({ "statement": statement })]
        };

        Ok(StatementResult { rows, digest })
    }

    async fn commit_transaction(
        &self,
        _session: &SessionToken,
        transaction: &TransactionId,
        _digest: &LedgerDigest,
    ) -> Result<LedgerDigest> {
        let mut state = self.state.lock().unwrap();

        if let Some(error) = state.commit_failures.pop_front() {
            return Err(error);
        }
        if state.corrupt_next_commit {
            state.corrupt_next_commit = false;
            return Ok(LedgerDigest::from_utf8("corrupted"));
        }

        let digest = state
            .transaction_digests
            .get(transaction)
            .cloned()
            .unwrap_or_else(LedgerDigest::empty);
        state.last_commit_digest = Some(digest.clone());
        Ok(digest)
    }

    async fn abort_transaction(&self, _session: &SessionToken) -> Result<()> {
        Ok(())
    }

    async fn end_session(&self, _session: &SessionToken) -> Result<()> {
        self.ended_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shorthand constructors for the errors the tests inject.
pub fn occ_conflict() -> CommunicatorError {
    CommunicatorError::OccConflict("write set changed".to_string())
}

pub fn stale_session() -> CommunicatorError {
    CommunicatorError::InvalidSession {
        message: "session token unknown".to_string(),
        transaction_expired: false,
    }
}

pub fn expired_transaction() -> CommunicatorError {
    CommunicatorError::InvalidSession {
        message: "transaction lifetime exceeded".to_string(),
        transaction_expired: true,
    }
}

pub fn throttled() -> CommunicatorError {
    CommunicatorError::Service {
        code: 503,
        message: "service unavailable".to_string(),
        retryable: true,
    }
}

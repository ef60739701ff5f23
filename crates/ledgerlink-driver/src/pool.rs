//! Bounded session pool.
//!
//! The pool gates how many sessions may be outstanding at once and reuses
//! idle ones safely. Admission is a counting semaphore whose permits equal
//! the pool capacity; the idle list grows lazily, so a permit may be held
//! while no idle session exists, in which case a new session is opened
//! through the communicator.
//!
//! # Reuse strategy
//!
//! - Idle sessions are reused LIFO (most recently released first).
//! - Every reused session is health-probed before being handed out; sessions
//!   failing the probe are evicted and ended, without consuming an extra
//!   permit.
//! - A session released with its `alive` flag cleared is ended instead of
//!   pooled; its permit is still returned.
//!
//! The counting invariant `permits_held + permits_available == capacity`
//! holds on every exit path, including session-creation failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use ledgerlink_common::Communicator;

use crate::error::{DriverError, Result};
use crate::session::Session;

/// Bounded concurrent pool of sessions against one ledger.
pub struct SessionPool {
    communicator: Arc<dyn Communicator>,
    ledger: String,
    capacity: usize,
    permits: Semaphore,
    idle: Mutex<Vec<Session>>,
    closed: AtomicBool,
}

impl SessionPool {
    /// Creates a pool with the given fixed capacity.
    ///
    /// Capacity validation against the transport ceiling happens once, in the
    /// driver builder; the pool trusts the value it is given.
    pub fn new(communicator: Arc<dyn Communicator>, ledger: impl Into<String>, capacity: usize) -> Self {
        Self {
            communicator,
            ledger: ledger.into(),
            capacity,
            permits: Semaphore::new(capacity),
            idle: Mutex::new(Vec::with_capacity(capacity)),
            closed: AtomicBool::new(false),
        }
    }

    /// Acquires a session, waiting for a permit up to `timeout` if one is
    /// given, or indefinitely otherwise.
    ///
    /// # Errors
    ///
    /// - [`DriverError::PoolExhausted`] if no permit became available within
    ///   the timeout
    /// - [`DriverError::Closed`] if the pool was closed
    /// - a wrapped transport error if no idle session was healthy and opening
    ///   a new one failed (the permit is returned first)
    pub async fn acquire(&self, timeout: Option<Duration>) -> Result<Session> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DriverError::Closed);
        }

        let permit = match timeout {
            Some(wait) => match tokio::time::timeout(wait, self.permits.acquire()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(DriverError::Closed),
                Err(_) => return Err(DriverError::PoolExhausted { waited: wait }),
            },
            None => match self.permits.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Err(DriverError::Closed),
            },
        };
        // The permit is tracked by the counter from here on: release() and
        // the failure path below hand it back with add_permits.
        permit.forget();

        // Reuse the most recently released idle session that still passes a
        // health probe; evict the ones that do not.
        loop {
            let candidate = { self.idle.lock().await.pop() };
            let session = match candidate {
                Some(session) => session,
                None => break,
            };

            if session.is_alive() && session.probe().await {
                return Ok(session);
            }

            debug!(token = %session.token(), "evicting unhealthy session from pool");
            session.end().await;
        }

        // No healthy idle session: open a fresh one.
        match self.communicator.open_session(&self.ledger).await {
            Ok(token) => Ok(Session::new(token, Arc::clone(&self.communicator))),
            Err(source) => {
                // No permit leak: the permit acquired above was never turned
                // into a session.
                self.permits.add_permits(1);
                Err(DriverError::transaction(source, None, false))
            }
        }
    }

    /// Returns a session to the pool.
    ///
    /// The session joins the idle set only if still alive and the pool is
    /// still open; otherwise it is ended in a background task. One permit is
    /// returned regardless, before any end call, so a slow or hung
    /// `end_session` never withholds capacity from waiting acquirers.
    pub async fn release(&self, session: Session) {
        if session.is_alive() && !self.closed.load(Ordering::SeqCst) {
            self.idle.lock().await.push(session);
            self.permits.add_permits(1);
            return;
        }

        self.permits.add_permits(1);
        debug!(token = %session.token(), "dropping session instead of pooling it");
        tokio::spawn(async move { session.end().await });
    }

    /// Ends every idle session and makes the pool unusable for new
    /// acquisition. Idempotent.
    pub async fn close_all(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Waiters blocked in acquire() fail with Closed.
        self.permits.close();

        let drained: Vec<Session> = {
            let mut idle = self.idle.lock().await;
            idle.drain(..).collect()
        };
        for session in drained {
            session.end().await;
        }
    }

    /// The fixed pool capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle sessions currently pooled. Primarily for tests and
    /// monitoring.
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}

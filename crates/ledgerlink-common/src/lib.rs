//! LedgerLink Common Types and Transport Boundary
//!
//! This crate provides the protocol definitions shared between the LedgerLink
//! driver and any transport implementation that talks to a remote ledger
//! service.
//!
//! # Overview
//!
//! LedgerLink is a client driver for transactional ledger databases that are
//! reachable only through a remote session protocol. This crate contains the
//! pieces both sides of that boundary agree on:
//!
//! - **Protocol Layer**: session tokens, transaction ids and statement results
//! - **Transport Boundary**: the [`Communicator`] trait every transport
//!   implements, plus the closed [`CommunicatorError`] taxonomy the driver
//!   classifies failures from
//! - **Digest Algebra**: the commutative 256-bit [`LedgerDigest`] used to
//!   verify the server's claim about which statements were part of a commit
//!
//! # Components
//!
//! - [`protocol`] - Core protocol types ([`SessionToken`], [`TransactionId`],
//!   [`StatementResult`])
//! - [`communicator`] - The [`Communicator`] transport trait
//! - [`digest`] - The [`LedgerDigest`] hash value and its `combine` operator
//! - [`error`] - Transport error taxonomy
//!
//! # Example
//!
//! ```
//! use ledgerlink_common::LedgerDigest;
//!
//! let a = LedgerDigest::from_utf8("statement one");
//! let b = LedgerDigest::from_utf8("statement two");
//!
//! // combine is commutative: both sides fold in either order
//! assert_eq!(a.combine(&b), b.combine(&a));
//! ```

pub mod communicator;
pub mod digest;
pub mod error;
pub mod protocol;

pub use communicator::{Communicator, TRANSPORT_CONCURRENCY_CEILING};
pub use digest::{LedgerDigest, HASH_SIZE};
pub use error::{CommunicatorError, InvalidHashSize, Result};
pub use protocol::{SessionToken, StatementResult, TransactionId};

// Re-exported so transport implementations and test doubles can derive the
// trait without naming the macro crate themselves.
pub use async_trait::async_trait;

//! The commutative transaction digest.
//!
//! Every statement a transaction executes contributes a 256-bit hash, and the
//! driver folds those hashes into a single running digest with [`combine`].
//! The service performs the same folding on its side and reports its digest at
//! commit time; the driver accepts a commit only if the two agree.
//!
//! `combine` orders its two operands before hashing their concatenation, which
//! makes it commutative: client and server arrive at the same aggregate digest
//! independent of the order statements were folded in.
//!
//! [`combine`]: LedgerDigest::combine

use std::cmp::Ordering;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::InvalidHashSize;

/// Size in bytes of every non-empty digest.
pub const HASH_SIZE: usize = 32;

/// A 256-bit opaque digest with an identity value and a commutative
/// combination operator.
///
/// A digest is either empty (the identity element, zero bytes) or exactly
/// [`HASH_SIZE`] bytes. Instances are immutable; [`combine`](Self::combine)
/// returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDigest {
    bytes: Vec<u8>,
}

impl LedgerDigest {
    /// Returns the identity value (zero length).
    ///
    /// Combining any digest with the identity yields that digest unchanged.
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Builds a digest from raw bytes.
    ///
    /// # Errors
    ///
    /// Fails with [`InvalidHashSize`] unless `bytes` has length 0 or exactly
    /// [`HASH_SIZE`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InvalidHashSize> {
        if bytes.is_empty() || bytes.len() == HASH_SIZE {
            Ok(Self { bytes })
        } else {
            Err(InvalidHashSize(bytes.len()))
        }
    }

    /// Digest of the canonical serialized encoding of a structured value.
    ///
    /// `serde_json` renders object keys in sorted order, so the encoding is
    /// deterministic for a given value and both ends of the wire agree on it.
    pub fn from_encoded_value(value: &Value) -> Self {
        Self::hash(value.to_string().as_bytes())
    }

    /// Digest of a raw string's serialized encoding.
    pub fn from_utf8(text: &str) -> Self {
        Self::from_encoded_value(&Value::String(text.to_string()))
    }

    /// Whether this is the identity value.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw digest bytes (empty or exactly [`HASH_SIZE`] long).
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Combines two digests into one, commutatively.
    ///
    /// The identity value short-circuits. Otherwise the two operands are
    /// ordered by comparing their bytes as signed 8-bit integers from the
    /// most-significant (last) byte down; the smaller operand is hashed
    /// first. Because the ordering does not depend on which operand is the
    /// receiver, `a.combine(&b) == b.combine(&a)`.
    pub fn combine(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let (first, second) = match signed_reverse_cmp(&self.bytes, &other.bytes) {
            Ordering::Greater => (other, self),
            _ => (self, other),
        };

        let mut hasher = Sha256::new();
        hasher.update(&first.bytes);
        hasher.update(&second.bytes);
        Self {
            bytes: hasher.finalize().to_vec(),
        }
    }

    fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            bytes: hasher.finalize().to_vec(),
        }
    }
}

/// Compares two equal-length byte sequences as signed integers, from the
/// most-significant (last) byte to the least-significant (first).
fn signed_reverse_cmp(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        match (*x as i8).cmp(&(*y as i8)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

//! The commitment: a canonical hash binding a request's terms for signing.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical hash of a sponsorship request plus domain-separation fields.
///
/// Identical logical requests always produce identical commitments; any
/// field change changes the commitment. The commitment is what the
/// authority signs and what keys the settlement record / replay guard.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub(crate) Hash);

impl Commitment {
    /// Wrap a precomputed digest as a commitment.
    ///
    /// Exists for deserialization and test plumbing; production commitments
    /// come from [`SponsorshipRequest::commit`](crate::SponsorshipRequest::commit).
    pub fn from_hash(hash: Hash) -> Self {
        Self(hash)
    }

    /// The underlying digest.
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }

    /// Get the digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Hex representation of the digest.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Commitment({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Zero address (all bytes 0x00).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an Address from bytes.
    ///
    /// # Panics
    ///
    /// Panics if bytes length is not exactly 20.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), 20, "Address must be exactly 20 bytes");
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &hex::encode(&self.0[..4]))
    }
}

/// Identity of a settlement token (its contract/asset address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub [u8; 20]);

impl TokenId {
    /// Zero token id, meaning "no token".
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create a TokenId from bytes.
    ///
    /// # Panics
    ///
    /// Panics if bytes length is not exactly 20.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), 20, "TokenId must be exactly 20 bytes");
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Self(arr)
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero token id.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}..)", &hex::encode(&self.0[..4]))
    }
}

/// Network identity, part of the commitment's domain separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chain({})", self.0)
    }
}

/// A point in time as unix seconds, supplied by the host clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Epoch origin.
    pub const ZERO: Self = Timestamp(0);

    /// Seconds elapsed since an earlier timestamp (saturating).
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_identities() {
        assert!(Address::ZERO.is_zero());
        assert!(TokenId::ZERO.is_zero());
        assert!(!TokenId::from_bytes(&[1u8; 20]).is_zero());
    }

    #[test]
    fn test_timestamp_since() {
        assert_eq!(Timestamp(10).since(Timestamp(4)), 6);
        assert_eq!(Timestamp(4).since(Timestamp(10)), 0);
    }
}

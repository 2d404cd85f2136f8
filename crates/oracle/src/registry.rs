//! Per-token oracle configuration and allow-list.

use crate::feed::FeedStrategy;
use paymaster_types::TokenId;
use std::collections::HashMap;
use tracing::info;

/// Oracle configuration for one settlement token.
///
/// Inserted and updated by the sponsor's administrator; read-only to the
/// protocol core. A token must exist here and be allowed before it can
/// settle.
#[derive(Debug)]
pub struct TokenOracleEntry {
    /// The token this entry configures.
    pub token: TokenId,

    /// How to query the token's price.
    pub feed: FeedStrategy,

    /// Decimal count of the token asset.
    pub token_decimals: u8,

    /// Whether the feed reports native-per-token instead of
    /// token-per-native.
    pub inverse: bool,

    /// Whether the token may currently be used for settlement.
    pub allowed: bool,
}

/// Keyed store of token oracle entries.
///
/// Mutation is admin-only by ownership: only the sponsor's engine holds a
/// `&mut` to the registry.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    entries: HashMap<TokenId, TokenOracleEntry>,
}

impl OracleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the oracle configuration for a token.
    ///
    /// A newly configured token starts allowed.
    pub fn set_token_oracle(
        &mut self,
        token: TokenId,
        feed: FeedStrategy,
        token_decimals: u8,
        inverse: bool,
    ) {
        info!(%token, token_decimals, inverse, "Token oracle configured");
        self.entries.insert(
            token,
            TokenOracleEntry {
                token,
                feed,
                token_decimals,
                inverse,
                allowed: true,
            },
        );
    }

    /// Enable or disable a configured token.
    ///
    /// Returns false if the token has no oracle entry to toggle.
    pub fn set_token_allowed(&mut self, token: TokenId, allowed: bool) -> bool {
        match self.entries.get_mut(&token) {
            Some(entry) => {
                info!(%token, allowed, "Token allow-list updated");
                entry.allowed = allowed;
                true
            }
            None => false,
        }
    }

    /// Point lookup by token.
    pub fn get(&self, token: &TokenId) -> Option<&TokenOracleEntry> {
        self.entries.get(token)
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FixedFeed;
    use paymaster_types::Timestamp;

    #[test]
    fn test_registry_set_and_get() {
        let mut registry = OracleRegistry::new();
        let token = TokenId([1u8; 20]);

        registry.set_token_oracle(
            token,
            FeedStrategy::Fixed(FixedFeed::new(977_100, 18, Timestamp(0))),
            6,
            false,
        );

        let entry = registry.get(&token).unwrap();
        assert_eq!(entry.token_decimals, 6);
        assert!(entry.allowed);
        assert!(!entry.inverse);
    }

    #[test]
    fn test_registry_toggle_allowed() {
        let mut registry = OracleRegistry::new();
        let token = TokenId([1u8; 20]);

        // Toggling an unconfigured token is a no-op.
        assert!(!registry.set_token_allowed(token, false));

        registry.set_token_oracle(
            token,
            FeedStrategy::Fixed(FixedFeed::new(1, 0, Timestamp(0))),
            6,
            false,
        );
        assert!(registry.set_token_allowed(token, false));
        assert!(!registry.get(&token).unwrap().allowed);
    }
}

//! Price feed strategies.
//!
//! Each feed kind is a tagged variant rather than a runtime-constructed call
//! payload, so adding a feed kind means adding a variant, not encoding bytes.

use paymaster_types::Timestamp;
use std::fmt;

/// A raw quote as reported by a feed, before normalization.
///
/// `value` carries `decimals` fractional digits. Whether the ratio is
/// token-per-native or native-per-token is per-token configuration
/// (the `inverse` flag on the registry entry), not a feed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawQuote {
    /// The reported price.
    pub value: u128,

    /// Fractional digits in `value`.
    pub decimals: u8,

    /// When the feed last updated this value.
    pub updated_at: Timestamp,
}

/// A live price feed client.
///
/// Implementations wrap whatever transport the deployment uses. The adapter
/// treats any error or out-of-domain response as `OracleUnavailable`.
pub trait PriceFeed: Send {
    /// Fetch the latest quote.
    fn latest(&self) -> Result<RawQuote, FeedError>;
}

/// How quotes for a token are obtained.
pub enum FeedStrategy {
    /// A constant quote. Used for pegged assets and in tests.
    Fixed(FixedFeed),

    /// An external feed client.
    External(Box<dyn PriceFeed>),
}

impl FeedStrategy {
    /// Fetch the latest quote from this strategy.
    pub fn latest(&self) -> Result<RawQuote, FeedError> {
        match self {
            FeedStrategy::Fixed(feed) => Ok(feed.quote),
            FeedStrategy::External(feed) => feed.latest(),
        }
    }
}

impl fmt::Debug for FeedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStrategy::Fixed(feed) => f.debug_tuple("Fixed").field(feed).finish(),
            FeedStrategy::External(_) => f.debug_tuple("External").field(&"..").finish(),
        }
    }
}

/// A feed that always reports the same quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFeed {
    quote: RawQuote,
}

impl FixedFeed {
    /// Create a fixed feed reporting `value` with `decimals` fractional
    /// digits, updated at `updated_at`.
    pub fn new(value: u128, decimals: u8, updated_at: Timestamp) -> Self {
        Self {
            quote: RawQuote {
                value,
                decimals,
                updated_at,
            },
        }
    }
}

/// Errors reported by feed clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The feed call itself failed.
    #[error("Feed call failed: {0}")]
    CallFailed(String),

    /// The feed answered with something that does not parse as a quote.
    #[error("Malformed feed response: {0}")]
    Malformed(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_feed_quotes() {
        let feed = FeedStrategy::Fixed(FixedFeed::new(977_100, 18, Timestamp(1000)));
        let quote = feed.latest().unwrap();
        assert_eq!(quote.value, 977_100);
        assert_eq!(quote.decimals, 18);
        assert_eq!(quote.updated_at, Timestamp(1000));
    }

    struct FailingFeed;

    impl PriceFeed for FailingFeed {
        fn latest(&self) -> Result<RawQuote, FeedError> {
            Err(FeedError::CallFailed("connection refused".into()))
        }
    }

    #[test]
    fn test_external_feed_propagates_errors() {
        let feed = FeedStrategy::External(Box::new(FailingFeed));
        assert!(matches!(feed.latest(), Err(FeedError::CallFailed(_))));
    }
}

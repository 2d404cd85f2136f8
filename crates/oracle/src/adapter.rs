//! Quote normalization and rate policy.

use crate::registry::OracleRegistry;
use ethnum::U256;
use paymaster_types::{ceil_div, ExchangeRate, Timestamp, TokenId};
use tracing::{debug, warn};

/// Largest decimal count accepted from a feed or token configuration.
///
/// 10^38 still fits in u128; anything above is treated as a malformed
/// response rather than risking overflow in the normalization.
const MAX_DECIMALS: u8 = 38;

/// Staleness, bounds and divergence policy for quotes.
///
/// All checks are configuration, not hard-coded: the defaults enforce only
/// the pre-agreed-rate tolerance.
#[derive(Debug, Clone)]
pub struct OraclePolicy {
    /// Reject quotes older than this many seconds. `None` disables the
    /// check.
    pub max_quote_age: Option<u64>,

    /// Reject normalized rates below this bound.
    pub min_rate: Option<ExchangeRate>,

    /// Reject normalized rates above this bound.
    pub max_rate: Option<ExchangeRate>,

    /// Maximum divergence, in basis points of the live quote, for a
    /// pre-agreed rate to still be honored.
    pub rate_tolerance_bps: u64,
}

impl Default for OraclePolicy {
    fn default() -> Self {
        Self {
            max_quote_age: None,
            min_rate: None,
            max_rate: None,
            rate_tolerance_bps: 500,
        }
    }
}

impl OraclePolicy {
    /// Create a policy with a staleness bound.
    pub fn with_max_quote_age(max_quote_age: u64) -> Self {
        Self {
            max_quote_age: Some(max_quote_age),
            ..Default::default()
        }
    }
}

/// Normalizes heterogeneous price feeds into one rate convention:
/// token smallest-units per one whole native unit.
#[derive(Debug, Default)]
pub struct OracleAdapter {
    registry: OracleRegistry,
    policy: OraclePolicy,
}

impl OracleAdapter {
    /// Create an adapter with the given policy.
    pub fn new(policy: OraclePolicy) -> Self {
        Self {
            registry: OracleRegistry::new(),
            policy,
        }
    }

    /// The token registry, for admin mutation.
    pub fn registry_mut(&mut self) -> &mut OracleRegistry {
        &mut self.registry
    }

    /// The token registry, for inspection.
    pub fn registry(&self) -> &OracleRegistry {
        &self.registry
    }

    /// Check that a token is configured and allowed, without quoting.
    pub fn check_allowed(&self, token: &TokenId) -> Result<(), OracleError> {
        let entry = self
            .registry
            .get(token)
            .ok_or(OracleError::TokenNotConfigured { token: *token })?;
        if !entry.allowed {
            return Err(OracleError::TokenNotAllowed { token: *token });
        }
        Ok(())
    }

    /// Quote the live exchange rate for a token.
    ///
    /// Invokes the configured feed, inverts the ratio exactly if the feed
    /// reports native-per-token, and normalizes for both assets' decimal
    /// counts. All rounding is upward, in the sponsor's favor.
    pub fn quote(&self, token: &TokenId, now: Timestamp) -> Result<ExchangeRate, OracleError> {
        let entry = self
            .registry
            .get(token)
            .ok_or(OracleError::TokenNotConfigured { token: *token })?;
        if !entry.allowed {
            return Err(OracleError::TokenNotAllowed { token: *token });
        }

        let raw = entry
            .feed
            .latest()
            .map_err(|e| OracleError::OracleUnavailable(e.to_string()))?;

        if raw.value == 0 {
            return Err(OracleError::OracleUnavailable("zero quote".into()));
        }
        if raw.decimals > MAX_DECIMALS || entry.token_decimals > MAX_DECIMALS {
            return Err(OracleError::OracleUnavailable(
                "unsupported decimal count".into(),
            ));
        }

        if let Some(max_age) = self.policy.max_quote_age {
            let age = now.since(raw.updated_at);
            if age > max_age {
                warn!(%token, age, max_age, "Stale oracle quote");
                return Err(OracleError::OracleStale { age, max_age });
            }
        }

        let feed_scale = U256::from(10u8).pow(raw.decimals as u32);
        let token_scale = U256::from(10u8).pow(entry.token_decimals as u32);
        let normalized = if entry.inverse {
            // Feed reports native-per-token; invert exactly.
            ceil_div(feed_scale * token_scale, U256::from(raw.value))
        } else {
            ceil_div(U256::from(raw.value) * token_scale, feed_scale)
        };

        if normalized > U256::from(u128::MAX) {
            return Err(OracleError::OracleUnavailable(
                "quote outside numeric domain".into(),
            ));
        }
        let rate = ExchangeRate(normalized.as_u128());

        if let Some(min) = self.policy.min_rate {
            if rate < min {
                return Err(OracleError::OracleOutOfRange { rate });
            }
        }
        if let Some(max) = self.policy.max_rate {
            if rate > max {
                return Err(OracleError::OracleOutOfRange { rate });
            }
        }

        debug!(%token, %rate, "Oracle quote");
        Ok(rate)
    }

    /// Resolve the rate to settle at.
    ///
    /// A pre-agreed rate (signed into the request at authorization time)
    /// takes precedence over the live quote only while it has not diverged
    /// from it by more than the configured tolerance. This protects the
    /// sponsor from stale or manipulated pre-agreed rates while still
    /// honoring what was signed.
    pub fn resolve_rate(
        &self,
        pre_agreed: ExchangeRate,
        token: &TokenId,
        now: Timestamp,
    ) -> Result<ExchangeRate, OracleError> {
        let live = self.quote(token, now)?;
        if !pre_agreed.is_set() {
            return Ok(live);
        }

        let divergence = U256::from(pre_agreed.0.abs_diff(live.0)) * U256::from(10_000u32);
        let allowed = U256::from(live.0) * U256::from(self.policy.rate_tolerance_bps);
        if divergence > allowed {
            warn!(%token, %pre_agreed, %live, "Pre-agreed rate diverged from live quote");
            return Err(OracleError::RateMismatch { pre_agreed, live });
        }
        Ok(pre_agreed)
    }
}

/// Errors from oracle lookup, quoting and rate resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// No oracle entry exists for the token.
    #[error("Token not configured: {token}")]
    TokenNotConfigured {
        /// The token that was looked up.
        token: TokenId,
    },

    /// The token's entry is disabled.
    #[error("Token not allowed: {token}")]
    TokenNotAllowed {
        /// The token that was looked up.
        token: TokenId,
    },

    /// The feed call failed or answered out of domain.
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// The quote is older than the configured staleness bound.
    #[error("Oracle quote stale: age {age}s exceeds {max_age}s")]
    OracleStale {
        /// Quote age in seconds.
        age: u64,
        /// Configured maximum age.
        max_age: u64,
    },

    /// The normalized rate violates the configured bounds.
    #[error("Oracle rate out of range: {rate}")]
    OracleOutOfRange {
        /// The offending normalized rate.
        rate: ExchangeRate,
    },

    /// A pre-agreed rate diverged too far from the live quote.
    #[error("Rate mismatch: pre-agreed {pre_agreed}, live {live}")]
    RateMismatch {
        /// The rate signed into the request.
        pre_agreed: ExchangeRate,
        /// The live quote at settlement time.
        live: ExchangeRate,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedError, FeedStrategy, FixedFeed, PriceFeed, RawQuote};

    const USDC: TokenId = TokenId([0x01; 20]);

    fn adapter_with(feed: FeedStrategy, token_decimals: u8, inverse: bool) -> OracleAdapter {
        let mut adapter = OracleAdapter::new(OraclePolicy::default());
        adapter
            .registry_mut()
            .set_token_oracle(USDC, feed, token_decimals, inverse);
        adapter
    }

    #[test]
    fn test_quote_unconfigured_token() {
        let adapter = OracleAdapter::new(OraclePolicy::default());
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(0)),
            Err(OracleError::TokenNotConfigured { .. })
        ));
    }

    #[test]
    fn test_quote_disallowed_token() {
        let mut adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        adapter.registry_mut().set_token_allowed(USDC, false);
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(0)),
            Err(OracleError::TokenNotAllowed { .. })
        ));
    }

    #[test]
    fn test_quote_direct_feed_normalization() {
        // Feed: 0.9771 token per native at 6 decimals; token has 6 decimals.
        // Normalized: 977_100 token smallest-units per whole native.
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        let rate = adapter.quote(&USDC, Timestamp(0)).unwrap();
        assert_eq!(rate, ExchangeRate(977_100));
    }

    #[test]
    fn test_quote_decimal_rescaling() {
        // Feed reports at 8 decimals, token has 6: value scales down by 100.
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(97_710_000, 8, Timestamp(0))),
            6,
            false,
        );
        let rate = adapter.quote(&USDC, Timestamp(0)).unwrap();
        assert_eq!(rate, ExchangeRate(977_100));
    }

    #[test]
    fn test_quote_inverse_feed() {
        // Feed reports 2.0 native per token at 6 decimals; token has 6
        // decimals. Normalized: 0.5 token per native = 500_000 units.
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(2_000_000, 6, Timestamp(0))),
            6,
            true,
        );
        let rate = adapter.quote(&USDC, Timestamp(0)).unwrap();
        assert_eq!(rate, ExchangeRate(500_000));
    }

    #[test]
    fn test_quote_inverse_rounds_up() {
        // 3.0 native per token -> 1/3 token per native; 10^6/3 = 333333.33..
        // must round to 333_334, never down.
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(3_000_000, 6, Timestamp(0))),
            6,
            true,
        );
        let rate = adapter.quote(&USDC, Timestamp(0)).unwrap();
        assert_eq!(rate, ExchangeRate(333_334));
    }

    #[test]
    fn test_quote_zero_value_unavailable() {
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(0, 6, Timestamp(0))),
            6,
            false,
        );
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(0)),
            Err(OracleError::OracleUnavailable(_))
        ));
    }

    struct BrokenFeed;

    impl PriceFeed for BrokenFeed {
        fn latest(&self) -> Result<RawQuote, FeedError> {
            Err(FeedError::CallFailed("timeout".into()))
        }
    }

    #[test]
    fn test_quote_feed_failure_unavailable() {
        let adapter = adapter_with(FeedStrategy::External(Box::new(BrokenFeed)), 6, false);
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(0)),
            Err(OracleError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn test_quote_staleness_policy() {
        let mut adapter = OracleAdapter::new(OraclePolicy::with_max_quote_age(60));
        adapter.registry_mut().set_token_oracle(
            USDC,
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(1000))),
            6,
            false,
        );

        // Within the age bound.
        assert!(adapter.quote(&USDC, Timestamp(1060)).is_ok());

        // One second past it.
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(1061)),
            Err(OracleError::OracleStale {
                age: 61,
                max_age: 60
            })
        ));
    }

    #[test]
    fn test_quote_bounds_policy() {
        let policy = OraclePolicy {
            min_rate: Some(ExchangeRate(1_000_000)),
            ..Default::default()
        };
        let mut adapter = OracleAdapter::new(policy);
        adapter.registry_mut().set_token_oracle(
            USDC,
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        assert!(matches!(
            adapter.quote(&USDC, Timestamp(0)),
            Err(OracleError::OracleOutOfRange { .. })
        ));
    }

    #[test]
    fn test_resolve_rate_unset_uses_live() {
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        let rate = adapter
            .resolve_rate(ExchangeRate::UNSET, &USDC, Timestamp(0))
            .unwrap();
        assert_eq!(rate, ExchangeRate(977_100));
    }

    #[test]
    fn test_resolve_rate_within_tolerance_honors_pre_agreed() {
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        // 1% above live, tolerance is 5%.
        let pre_agreed = ExchangeRate(986_871);
        let rate = adapter
            .resolve_rate(pre_agreed, &USDC, Timestamp(0))
            .unwrap();
        assert_eq!(rate, pre_agreed);
    }

    #[test]
    fn test_resolve_rate_divergence_rejected() {
        let adapter = adapter_with(
            FeedStrategy::Fixed(FixedFeed::new(977_100, 6, Timestamp(0))),
            6,
            false,
        );
        // Double the live rate, far past 5%.
        let result = adapter.resolve_rate(ExchangeRate(1_954_200), &USDC, Timestamp(0));
        assert!(matches!(result, Err(OracleError::RateMismatch { .. })));
    }
}

//! Fixed-point monetary amounts and exchange-rate conversion.
//!
//! All arithmetic is integer-only. Conversions between the native asset and
//! a settlement token go through a 256-bit accumulator so the intermediate
//! product cannot overflow, and always round up so the sponsor never
//! under-collects.

use ethnum::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal count of the native asset.
pub const NATIVE_DECIMALS: u32 = 18;

/// One whole unit of the native asset in smallest units (10^18).
///
/// Exchange rates are denominated against this: a rate of `R` means `R`
/// token smallest-units buy one whole native unit.
pub const RATE_SCALE: u128 = 10u128.pow(NATIVE_DECIMALS);

/// An amount of the native asset, in smallest units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct NativeAmount(pub u128);

impl NativeAmount {
    /// Zero amount.
    pub const ZERO: Self = NativeAmount(0);

    /// Checked addition.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(NativeAmount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(NativeAmount)
    }

    /// Saturating subtraction.
    pub fn saturating_sub(self, other: Self) -> Self {
        NativeAmount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount of a settlement token, in that token's smallest units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    /// Zero amount.
    pub const ZERO: Self = TokenAmount(0);

    /// Checked addition.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(TokenAmount)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token smallest-units per one whole native unit ([`RATE_SCALE`] smallest
/// native units).
///
/// A zero rate in a request means "no pre-agreed rate, quote live at
/// settlement time".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ExchangeRate(pub u128);

impl ExchangeRate {
    /// The "no pre-agreed rate" sentinel.
    pub const UNSET: Self = ExchangeRate(0);

    /// Check whether a pre-agreed rate was supplied.
    pub fn is_set(&self) -> bool {
        self.0 != 0
    }

    /// Convert a native cost into token units at this rate, rounding up.
    ///
    /// `token = ceil(native * rate / RATE_SCALE)`. The intermediate product
    /// is taken in 256 bits; the only failure mode is a result that does not
    /// fit in `u128`.
    pub fn token_cost(&self, native: NativeAmount) -> Result<TokenAmount, AmountError> {
        let product = U256::from(native.0) * U256::from(self.0);
        let owed = ceil_div(product, U256::from(RATE_SCALE));
        if owed > U256::from(u128::MAX) {
            return Err(AmountError::Overflow);
        }
        Ok(TokenAmount(owed.as_u128()))
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ceiling division over 256-bit integers.
///
/// Safe for any product of two u128 values: the adjusted numerator stays
/// below 2^256.
pub fn ceil_div(numerator: U256, denominator: U256) -> U256 {
    (numerator + denominator - U256::ONE) / denominator
}

/// Errors from monetary arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Result does not fit the 128-bit amount domain.
    #[error("Amount overflow")]
    Overflow,
}

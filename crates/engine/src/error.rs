//! Error types for the settlement engine.

use crate::collateral::CollateralError;
use paymaster_oracle::OracleError;
use paymaster_types::{
    Address, AmountError, AuthError, Commitment, NativeAmount, RequestError, TokenAmount, TokenId,
};
use thiserror::Error;

/// Errors from lock, settle, reject and the registry operations.
///
/// Everything surfaced before a lock succeeds leaves engine state unchanged;
/// the caller may retry with a corrected request.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The request failed canonical validation.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The authorization failed signature or window checks.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Oracle lookup, quoting or rate resolution failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Monetary arithmetic left the amount domain.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Not enough unlocked collateral to reserve the worst-case cost.
    #[error("Insufficient collateral: requested {requested}, available {available}")]
    InsufficientCollateral {
        /// Amount the lock needed.
        requested: NativeAmount,
        /// Unlocked deposit at the time.
        available: NativeAmount,
    },

    /// Withdrawal would under-collateralize in-flight locks.
    #[error("Collateral locked: requested {requested}, available {available}")]
    CollateralLocked {
        /// Amount requested for withdrawal.
        requested: NativeAmount,
        /// Unlocked deposit at the time.
        available: NativeAmount,
    },

    /// Collateral arithmetic overflowed.
    #[error("Collateral balance overflow")]
    BalanceOverflow,

    /// The token debit was refused; the shortfall has been recorded.
    #[error("Insufficient token balance: {requester} owes {amount} of {token}")]
    InsufficientTokenBalance {
        /// Account that owed the settlement.
        requester: Address,
        /// Settlement token.
        token: TokenId,
        /// Amount the debit asked for.
        amount: TokenAmount,
    },

    /// The commitment was already consumed or is already in flight.
    #[error("Already processed: {commitment}")]
    AlreadyProcessed {
        /// The replayed commitment.
        commitment: Commitment,
    },

    /// No in-flight lock exists for the commitment.
    #[error("Unknown or already settled: {commitment}")]
    UnknownOrAlreadySettled {
        /// The commitment that was submitted.
        commitment: Commitment,
    },
}

impl From<CollateralError> for SettlementError {
    fn from(err: CollateralError) -> Self {
        match err {
            CollateralError::InsufficientCollateral {
                requested,
                available,
            } => SettlementError::InsufficientCollateral {
                requested,
                available,
            },
            CollateralError::CollateralLocked {
                requested,
                available,
            } => SettlementError::CollateralLocked {
                requested,
                available,
            },
            CollateralError::BalanceOverflow => SettlementError::BalanceOverflow,
        }
    }
}

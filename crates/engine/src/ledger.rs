//! Outbound capability for debiting settlement tokens.

use paymaster_types::{Address, TokenAmount, TokenId};

/// Capability to debit a fixed token amount from a named account.
///
/// Implemented by the sponsored-account collaborator (an approve/transfer
/// surface in the original environment). The protocol never assumes it can
/// retry a failed debit transparently: one refusal is final for that
/// settlement and becomes a shortfall.
pub trait TokenLedger {
    /// Debit `amount` of `token` from `owner` in favor of the sponsor.
    fn debit(
        &mut self,
        owner: Address,
        token: TokenId,
        amount: TokenAmount,
    ) -> Result<(), LedgerError>;
}

/// Reasons a token debit can be refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The owner's token balance cannot cover the amount.
    #[error("Insufficient token balance")]
    InsufficientBalance,

    /// The owner has not approved the sponsor as a spender.
    #[error("Sponsor not approved as spender")]
    NotApproved,

    /// The ledger call itself failed.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

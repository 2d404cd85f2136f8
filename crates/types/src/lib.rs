//! Core types for the token-settled sponsorship protocol.
//!
//! Everything in this crate is pure data and deterministic computation: the
//! commitment codec, the authorization verifier, fixed-point amounts and the
//! identifiers shared by the oracle and settlement crates. No I/O happens
//! here.

mod amounts;
mod authorization;
mod commitment;
mod crypto;
mod hash;
mod identifiers;
mod request;
mod signing;

pub use amounts::{
    ceil_div, AmountError, ExchangeRate, NativeAmount, TokenAmount, NATIVE_DECIMALS, RATE_SCALE,
};
pub use authorization::{AuthError, Authorization};
pub use commitment::Commitment;
pub use crypto::{KeyPair, PublicKey, Signature};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, ChainId, Timestamp, TokenId};
pub use request::{RequestError, SponsorshipRequest};
pub use signing::{
    authorization_message, commitment_domain, DOMAIN_AUTHORIZATION, DOMAIN_COMMITMENT,
};

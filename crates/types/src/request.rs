//! The sponsorship request and its canonical commitment codec.

use crate::{
    commitment_domain, Address, ChainId, Commitment, ExchangeRate, Hash, NativeAmount, TokenAmount,
    TokenId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A request to have transaction fees sponsored and settled in a token.
///
/// Immutable once hashed: the authority signs the commitment over exactly
/// these fields, so any mutation invalidates the authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipRequest {
    /// Account whose action is being sponsored and who pays in token.
    pub requester: Address,

    /// Digest of the sponsored action payload.
    pub payload_digest: Hash,

    /// Gas limit for the sponsored call itself.
    pub call_gas_limit: u64,

    /// Gas limit for validation work around the call.
    pub verification_gas_limit: u64,

    /// Fixed gas overhead charged before verification.
    pub pre_verification_gas: u64,

    /// Maximum native price per gas unit the request is willing to pay.
    pub max_fee_per_gas: u128,

    /// Requester-scoped anti-collision nonce.
    pub nonce: u64,

    /// Settlement token the cost is recovered in.
    pub token: TokenId,

    /// Pre-agreed exchange rate; [`ExchangeRate::UNSET`] to quote live.
    pub rate: ExchangeRate,

    /// Fixed surcharge added to the settled amount, in token units.
    pub surcharge: TokenAmount,

    /// Start of the validity window (inclusive).
    pub not_before: Timestamp,

    /// End of the validity window (inclusive).
    pub not_after: Timestamp,
}

impl SponsorshipRequest {
    /// Serialized width of the canonical field encoding, excluding the
    /// domain prefix: 8+8+20+16+16+20+32+8+8+8+16+8.
    pub const ENCODED_LEN: usize = 168;

    /// Check every field against its declared numeric domain.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.not_before > self.not_after {
            return Err(RequestError::MalformedRequest("inverted validity window"));
        }
        if self.token.is_zero() && (self.rate.is_set() || self.surcharge != TokenAmount::ZERO) {
            return Err(RequestError::MalformedRequest(
                "zero token id with non-zero rate or surcharge",
            ));
        }
        if self.call_gas_limit == 0 && self.verification_gas_limit == 0 {
            return Err(RequestError::MalformedRequest("all gas limits zero"));
        }
        if self.max_fee_per_gas == 0 {
            return Err(RequestError::MalformedRequest("zero max fee per gas"));
        }
        Ok(())
    }

    /// Worst-case native cost this request can incur.
    ///
    /// `(call + 3 * verification + pre_verification) * max_fee_per_gas`.
    /// The verification multiplier covers validation, execution wrapping and
    /// settlement overhead; this is the amount of collateral a lock reserves.
    pub fn max_native_cost(&self) -> Result<NativeAmount, RequestError> {
        let gas = (self.call_gas_limit as u128)
            .checked_add(3 * self.verification_gas_limit as u128)
            .and_then(|g| g.checked_add(self.pre_verification_gas as u128))
            .ok_or(RequestError::MalformedRequest("gas limits overflow"))?;
        let cost = gas
            .checked_mul(self.max_fee_per_gas)
            .ok_or(RequestError::MalformedRequest("max cost overflow"))?;
        Ok(NativeAmount(cost))
    }

    /// Compute the canonical commitment for this request.
    ///
    /// Pure and deterministic. The preimage is the domain prefix (tag,
    /// sponsor, chain) followed by every field at a fixed width, so there is
    /// no variable-length ambiguity and no two distinct requests share an
    /// encoding. Fails [`RequestError::MalformedRequest`] if any field is
    /// outside its domain.
    pub fn commit(&self, sponsor: Address, chain: ChainId) -> Result<Commitment, RequestError> {
        self.validate()?;

        let mut preimage = commitment_domain(sponsor, chain);
        preimage.reserve(Self::ENCODED_LEN);

        // Window and settlement terms first, remaining fields after.
        preimage.extend_from_slice(&self.not_before.0.to_le_bytes());
        preimage.extend_from_slice(&self.not_after.0.to_le_bytes());
        preimage.extend_from_slice(self.token.as_bytes());
        preimage.extend_from_slice(&self.rate.0.to_le_bytes());
        preimage.extend_from_slice(&self.surcharge.0.to_le_bytes());
        preimage.extend_from_slice(self.requester.as_bytes());
        preimage.extend_from_slice(self.payload_digest.as_bytes());
        preimage.extend_from_slice(&self.call_gas_limit.to_le_bytes());
        preimage.extend_from_slice(&self.verification_gas_limit.to_le_bytes());
        preimage.extend_from_slice(&self.pre_verification_gas.to_le_bytes());
        preimage.extend_from_slice(&self.max_fee_per_gas.to_le_bytes());
        preimage.extend_from_slice(&self.nonce.to_le_bytes());

        Ok(Commitment(Hash::from_bytes(&preimage)))
    }
}

/// Errors from request validation and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// A field exceeds its declared numeric domain.
    #[error("Malformed request: {0}")]
    MalformedRequest(&'static str),
}

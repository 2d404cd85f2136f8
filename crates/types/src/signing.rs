//! Domain-separated signing for sponsorship authorizations.
//!
//! Domain separation prevents cross-protocol attacks where a signature from
//! one context could be replayed in another, and binds every commitment to
//! one sponsor on one network.
//!
//! # Domain Tags
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `SPONSORSHIP_COMMIT` | Canonical commitment preimage |
//! | `SPONSORSHIP_AUTH` | Authority signature over a commitment |

use crate::{Address, ChainId, Commitment};

/// Domain tag for the commitment preimage.
///
/// Format: `SPONSORSHIP_COMMIT` || sponsor || chain_id || canonical fields
pub const DOMAIN_COMMITMENT: &[u8] = b"SPONSORSHIP_COMMIT";

/// Domain tag for authority signatures.
///
/// Format: `SPONSORSHIP_AUTH` || commitment
pub const DOMAIN_AUTHORIZATION: &[u8] = b"SPONSORSHIP_AUTH";

/// Build the domain-separation prefix of the commitment preimage.
///
/// The same logical request hashed for a different sponsor or network must
/// produce a different commitment.
pub fn commitment_domain(sponsor: Address, chain: ChainId) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(DOMAIN_COMMITMENT.len() + 28);
    prefix.extend_from_slice(DOMAIN_COMMITMENT);
    prefix.extend_from_slice(sponsor.as_bytes());
    prefix.extend_from_slice(&chain.0.to_le_bytes());
    prefix
}

/// Build the message the authority signs for a commitment.
pub fn authorization_message(commitment: &Commitment) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_AUTHORIZATION.len() + 32);
    message.extend_from_slice(DOMAIN_AUTHORIZATION);
    message.extend_from_slice(commitment.as_bytes());
    message
}

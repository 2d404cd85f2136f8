//! Authority authorization over a commitment, with validity-window checks.

use crate::{authorization_message, Commitment, KeyPair, PublicKey, Signature, Timestamp};
use serde::{Deserialize, Serialize};

/// An off-chain authority's signature over a commitment.
///
/// Valid only while the host clock lies inside the request's validity
/// window. Verification is side-effect-free and repeatable; consumption
/// happens only at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// The commitment being authorized.
    pub commitment: Commitment,

    /// Ed25519 signature over the domain-tagged commitment message.
    pub signature: Signature,
}

impl Authorization {
    /// Create an authorization from an existing signature.
    pub fn new(commitment: Commitment, signature: Signature) -> Self {
        Self {
            commitment,
            signature,
        }
    }

    /// Sign a commitment as the authority.
    pub fn sign(authority: &KeyPair, commitment: Commitment) -> Self {
        let signature = authority.sign(&authorization_message(&commitment));
        Self {
            commitment,
            signature,
        }
    }

    /// Verify the signature and validity window.
    ///
    /// Both window bounds are inclusive: a request at exactly `not_before`
    /// or `not_after` is valid.
    pub fn verify(
        &self,
        authority: &PublicKey,
        not_before: Timestamp,
        not_after: Timestamp,
        now: Timestamp,
    ) -> Result<(), AuthError> {
        let message = authorization_message(&self.commitment);
        if !authority.verify(&message, &self.signature) {
            return Err(AuthError::SignatureInvalid);
        }
        if now < not_before {
            return Err(AuthError::NotYetValid { now, not_before });
        }
        if now > not_after {
            return Err(AuthError::Expired { now, not_after });
        }
        Ok(())
    }
}

/// Errors from authorization verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Signature recovery failed or the signer is not the authority.
    #[error("Signature invalid or not from the configured authority")]
    SignatureInvalid,

    /// The validity window has not opened yet.
    #[error("Not yet valid: now={now}, not_before={not_before}")]
    NotYetValid {
        /// Host clock at verification time.
        now: Timestamp,
        /// Window start (inclusive).
        not_before: Timestamp,
    },

    /// The validity window has closed.
    #[error("Expired: now={now}, not_after={not_after}")]
    Expired {
        /// Host clock at verification time.
        now: Timestamp,
        /// Window end (inclusive).
        not_after: Timestamp,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hash;

    fn setup() -> (KeyPair, Commitment) {
        let authority = KeyPair::from_seed(&[7u8; 32]);
        let commitment = Commitment::from_hash(Hash::from_bytes(b"sponsored request"));
        (authority, commitment)
    }

    #[test]
    fn test_verify_valid_authorization() {
        let (authority, commitment) = setup();
        let auth = Authorization::sign(&authority, commitment);

        let result = auth.verify(
            &authority.public_key(),
            Timestamp(100),
            Timestamp(200),
            Timestamp(150),
        );
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_verify_rejects_wrong_authority() {
        let (authority, commitment) = setup();
        let impostor = KeyPair::from_seed(&[8u8; 32]);
        let auth = Authorization::sign(&impostor, commitment);

        let result = auth.verify(
            &authority.public_key(),
            Timestamp(100),
            Timestamp(200),
            Timestamp(150),
        );
        assert_eq!(result, Err(AuthError::SignatureInvalid));
    }

    #[test]
    fn test_verify_rejects_tampered_commitment() {
        let (authority, commitment) = setup();
        let mut auth = Authorization::sign(&authority, commitment);
        auth.commitment = Commitment::from_hash(Hash::from_bytes(b"different request"));

        let result = auth.verify(
            &authority.public_key(),
            Timestamp(100),
            Timestamp(200),
            Timestamp(150),
        );
        assert_eq!(result, Err(AuthError::SignatureInvalid));
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let (authority, commitment) = setup();
        let auth = Authorization::sign(&authority, commitment);
        let pk = authority.public_key();
        let (lo, hi) = (Timestamp(100), Timestamp(200));

        // Exact boundaries succeed.
        assert_eq!(auth.verify(&pk, lo, hi, Timestamp(100)), Ok(()));
        assert_eq!(auth.verify(&pk, lo, hi, Timestamp(200)), Ok(()));

        // One unit outside fails.
        assert!(matches!(
            auth.verify(&pk, lo, hi, Timestamp(99)),
            Err(AuthError::NotYetValid { .. })
        ));
        assert!(matches!(
            auth.verify(&pk, lo, hi, Timestamp(201)),
            Err(AuthError::Expired { .. })
        ));
    }

    #[test]
    fn test_verify_is_repeatable() {
        let (authority, commitment) = setup();
        let auth = Authorization::sign(&authority, commitment);
        let pk = authority.public_key();

        for _ in 0..3 {
            assert_eq!(
                auth.verify(&pk, Timestamp(0), Timestamp(10), Timestamp(5)),
                Ok(())
            );
        }
    }
}

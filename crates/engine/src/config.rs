//! Engine configuration.

use paymaster_types::{Address, ChainId, PublicKey};
use serde::{Deserialize, Serialize};

/// Static identity of one sponsor's engine.
///
/// The sponsor address and chain id feed the commitment's domain separation;
/// the authority key is the only identity whose signatures authorize
/// sponsorships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The sponsor whose collateral backs sponsorships.
    pub sponsor: Address,

    /// Network the engine settles on.
    pub chain: ChainId,

    /// Public key of the off-chain signing authority.
    pub authority: PublicKey,
}

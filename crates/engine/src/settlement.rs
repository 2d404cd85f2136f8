//! The settlement state machine.
//!
//! Per commitment the states are `Locked -> Settled` or `Locked ->
//! Rejected`, both terminal. `lock` runs every validation, then reserves the
//! request's worst-case native cost before the sponsored action executes,
//! bounding the sponsor's exposure. `settle` converts the actual cost into
//! token at the resolved rate and debits exactly once; `reject` releases the
//! reservation. Either way the commitment is consumed and can never be
//! processed again.
//!
//! The engine is synchronous and deterministic: no internal I/O, no timers;
//! the caller supplies `now` and the outbound ledger capability. Holding
//! `&mut self` for every transition serializes the collateral pool and makes
//! a settlement callback unable to reenter for the same commitment.

use crate::collateral::CollateralAccount;
use crate::config::EngineConfig;
use crate::error::SettlementError;
use crate::ledger::TokenLedger;
use crate::record::{RecordStore, RejectReason, SettlementOutcome, SettlementRecord};
use paymaster_oracle::{FeedStrategy, OracleAdapter, OraclePolicy};
use paymaster_types::{
    Address, Authorization, Commitment, NativeAmount, SponsorshipRequest, Timestamp, TokenAmount,
    TokenId,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A provisional reservation pending settlement.
#[derive(Debug, Clone)]
struct InFlightLock {
    request: SponsorshipRequest,
    reserved: NativeAmount,
    locked_at: Timestamp,
}

/// A token debit that was refused after the native cost was already
/// incurred. Kept for offline recovery; never silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    /// The consumed commitment.
    pub commitment: Commitment,

    /// Account that still owes the settlement.
    pub requester: Address,

    /// Settlement token the debt is denominated in.
    pub token: TokenId,

    /// Token amount that could not be collected.
    pub amount: TokenAmount,

    /// When the shortfall was recorded.
    pub recorded_at: Timestamp,
}

/// One sponsor's settlement engine.
///
/// Owns the collateral account, the oracle registry and the settlement
/// records; all registries are explicit owned state, not ambient singletons.
pub struct SettlementEngine {
    config: EngineConfig,
    oracle: OracleAdapter,
    collateral: CollateralAccount,
    in_flight: HashMap<Commitment, InFlightLock>,
    records: RecordStore,
    shortfalls: Vec<Shortfall>,
}

impl SettlementEngine {
    /// Create an engine with the given identity and oracle policy.
    pub fn new(config: EngineConfig, policy: OraclePolicy) -> Self {
        Self {
            config,
            oracle: OracleAdapter::new(policy),
            collateral: CollateralAccount::new(),
            in_flight: HashMap::new(),
            records: RecordStore::new(),
            shortfalls: Vec::new(),
        }
    }

    // --- hot path ---------------------------------------------------------

    /// Validate a request and reserve its worst-case native cost.
    ///
    /// Runs the commitment codec, the authorization verifier, the
    /// allow-list and the replay guard, in that order, then locks
    /// collateral. Every failure here leaves all state unchanged.
    pub fn lock(
        &mut self,
        request: SponsorshipRequest,
        authorization: &Authorization,
        now: Timestamp,
    ) -> Result<Commitment, SettlementError> {
        let commitment = request.commit(self.config.sponsor, self.config.chain)?;

        if self.records.is_consumed(&commitment) || self.in_flight.contains_key(&commitment) {
            return Err(SettlementError::AlreadyProcessed { commitment });
        }

        // A signature over any other commitment is not an authorization for
        // this request.
        if authorization.commitment != commitment {
            return Err(paymaster_types::AuthError::SignatureInvalid.into());
        }
        authorization.verify(
            &self.config.authority,
            request.not_before,
            request.not_after,
            now,
        )?;

        self.oracle.check_allowed(&request.token)?;

        let reserved = request.max_native_cost()?;
        self.collateral.lock(reserved)?;

        info!(%commitment, %reserved, token = %request.token, "Collateral locked");
        self.in_flight.insert(
            commitment,
            InFlightLock {
                request,
                reserved,
                locked_at: now,
            },
        );
        Ok(commitment)
    }

    /// Settle a locked commitment against the actual native cost.
    ///
    /// Resolves the exchange rate (pre-agreed if within tolerance, live
    /// otherwise), computes `token_owed = ceil(cost * rate) + surcharge`,
    /// and debits the requester through the ledger capability. On a refused
    /// debit the reservation is still resolved and the loss is recorded as
    /// a [`Shortfall`]; the commitment is consumed either way.
    pub fn settle(
        &mut self,
        commitment: Commitment,
        actual_cost: NativeAmount,
        now: Timestamp,
        ledger: &mut dyn TokenLedger,
    ) -> Result<TokenAmount, SettlementError> {
        let lock = self
            .in_flight
            .get(&commitment)
            .ok_or(SettlementError::UnknownOrAlreadySettled { commitment })?;
        let reserved = lock.reserved;
        let requester = lock.request.requester;
        let token = lock.request.token;
        let pre_agreed = lock.request.rate;
        let surcharge = lock.request.surcharge;

        // The reservation is the exposure bound; a larger reported cost is
        // clamped rather than trusted.
        let cost = if actual_cost > reserved {
            warn!(%commitment, %actual_cost, %reserved, "Reported cost above reservation, clamping");
            reserved
        } else {
            actual_cost
        };

        // Oracle failure leaves the lock in place; the caller resolves it
        // via reject or retries settle once the feed recovers.
        let rate = self.oracle.resolve_rate(pre_agreed, &token, now)?;
        let owed = rate
            .token_cost(cost)?
            .checked_add(surcharge)
            .ok_or(paymaster_types::AmountError::Overflow)?;

        self.in_flight.remove(&commitment);

        match ledger.debit(requester, token, owed) {
            Ok(()) => {
                self.collateral.consume(reserved, cost);
                self.records.append(SettlementRecord {
                    commitment,
                    outcome: SettlementOutcome::Settled,
                    native_cost: cost,
                    token_amount: owed,
                    recorded_at: now,
                });
                info!(%commitment, %cost, %owed, %rate, "Settled");
                Ok(owed)
            }
            Err(refusal) => {
                // The native cost was already incurred; release the
                // reservation, consume the spend, and surface the loss.
                self.collateral.consume(reserved, cost);
                self.records.append(SettlementRecord {
                    commitment,
                    outcome: SettlementOutcome::Shortfall,
                    native_cost: cost,
                    token_amount: owed,
                    recorded_at: now,
                });
                self.shortfalls.push(Shortfall {
                    commitment,
                    requester,
                    token,
                    amount: owed,
                    recorded_at: now,
                });
                warn!(%commitment, %owed, error = %refusal, "Token debit refused, shortfall recorded");
                Err(SettlementError::InsufficientTokenBalance {
                    requester,
                    token,
                    amount: owed,
                })
            }
        }
    }

    /// Resolve a locked commitment without settling.
    ///
    /// Used when the sponsored action failed before completion. Releases
    /// the full reservation and consumes the commitment so it cannot be
    /// retried.
    pub fn reject(
        &mut self,
        commitment: Commitment,
        reason: RejectReason,
        now: Timestamp,
    ) -> Result<(), SettlementError> {
        let lock = self
            .in_flight
            .remove(&commitment)
            .ok_or(SettlementError::UnknownOrAlreadySettled { commitment })?;

        self.collateral.release(lock.reserved);
        self.records.append(SettlementRecord {
            commitment,
            outcome: SettlementOutcome::Rejected(reason),
            native_cost: NativeAmount::ZERO,
            token_amount: TokenAmount::ZERO,
            recorded_at: now,
        });
        info!(%commitment, ?reason, "Rejected, collateral released");
        Ok(())
    }

    /// Reconciliation sweep for orphaned locks.
    ///
    /// Rejects every in-flight lock whose validity window has passed, so no
    /// collateral can remain locked with no path to resolution. Returns the
    /// swept commitments.
    pub fn sweep_expired(&mut self, now: Timestamp) -> Vec<Commitment> {
        let expired: Vec<Commitment> = self
            .in_flight
            .iter()
            .filter(|(_, lock)| now > lock.request.not_after)
            .map(|(commitment, _)| *commitment)
            .collect();

        for commitment in &expired {
            warn!(%commitment, "Sweeping expired lock");
            // The commitment is known in flight, reject cannot fail.
            let _ = self.reject(*commitment, RejectReason::WindowExpired, now);
        }
        expired
    }

    // --- administrative ---------------------------------------------------

    /// Deposit native collateral.
    pub fn deposit(&mut self, amount: NativeAmount) -> Result<(), SettlementError> {
        self.collateral.deposit(amount)?;
        debug!(%amount, "Collateral deposited");
        Ok(())
    }

    /// Withdraw unlocked native collateral.
    pub fn withdraw(&mut self, amount: NativeAmount) -> Result<(), SettlementError> {
        self.collateral.withdraw(amount)?;
        debug!(%amount, "Collateral withdrawn");
        Ok(())
    }

    /// Configure or replace a token's price feed.
    pub fn set_token_oracle(
        &mut self,
        token: TokenId,
        feed: FeedStrategy,
        token_decimals: u8,
        inverse: bool,
    ) {
        self.oracle
            .registry_mut()
            .set_token_oracle(token, feed, token_decimals, inverse);
    }

    /// Enable or disable a configured token.
    pub fn set_token_allowed(&mut self, token: TokenId, allowed: bool) -> bool {
        self.oracle.registry_mut().set_token_allowed(token, allowed)
    }

    // --- inspection -------------------------------------------------------

    /// The collateral account.
    pub fn collateral(&self) -> &CollateralAccount {
        &self.collateral
    }

    /// The oracle adapter and token registry.
    pub fn oracle(&self) -> &OracleAdapter {
        &self.oracle
    }

    /// The append-only settlement history.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Shortfalls awaiting offline recovery.
    pub fn shortfalls(&self) -> &[Shortfall] {
        &self.shortfalls
    }

    /// Whether a commitment is currently locked.
    pub fn is_in_flight(&self, commitment: &Commitment) -> bool {
        self.in_flight.contains_key(commitment)
    }

    /// Number of in-flight locks.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// When a commitment was locked, if it is in flight.
    pub fn locked_at(&self, commitment: &Commitment) -> Option<Timestamp> {
        self.in_flight.get(commitment).map(|lock| lock.locked_at)
    }
}

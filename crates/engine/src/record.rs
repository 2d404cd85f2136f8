//! Durable settlement records; the consumed set doubles as the replay guard.

use indexmap::IndexMap;
use paymaster_types::{Commitment, NativeAmount, Timestamp, TokenAmount};
use serde::{Deserialize, Serialize};

/// Why a locked request was rejected instead of settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The sponsored action itself failed before completion.
    ExecutionFailed,

    /// The validity window passed while the lock was in flight; resolved by
    /// the reconciliation sweep.
    WindowExpired,
}

/// Terminal outcome of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// Cost recovered in token.
    Settled,

    /// Lock released, no debit.
    Rejected(RejectReason),

    /// Token debit refused; collateral released, loss recorded for offline
    /// recovery.
    Shortfall,
}

/// Durable, append-only record of one consumed commitment.
///
/// Existence of a record is what makes a second submission of the same
/// commitment fail rather than double-charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// The consumed commitment.
    pub commitment: Commitment,

    /// How the lock resolved.
    pub outcome: SettlementOutcome,

    /// Native cost actually incurred (zero for rejections).
    pub native_cost: NativeAmount,

    /// Token amount computed at settlement (owed, even if the debit was
    /// refused).
    pub token_amount: TokenAmount,

    /// When the record was written.
    pub recorded_at: Timestamp,
}

/// Append-only log of settlement records, keyed by commitment.
///
/// Insertion order is preserved so the history reads as a log; point lookup
/// by commitment is O(1).
#[derive(Debug, Default)]
pub struct RecordStore {
    records: IndexMap<Commitment, SettlementRecord>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a commitment has been consumed.
    pub fn is_consumed(&self, commitment: &Commitment) -> bool {
        self.records.contains_key(commitment)
    }

    /// Append a record.
    ///
    /// The engine checks the replay guard before writing; inserting a
    /// duplicate is a logic error.
    pub fn append(&mut self, record: SettlementRecord) {
        let previous = self.records.insert(record.commitment, record);
        debug_assert!(previous.is_none(), "duplicate settlement record");
    }

    /// Point lookup by commitment.
    pub fn get(&self, commitment: &Commitment) -> Option<&SettlementRecord> {
        self.records.get(commitment)
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.records.values()
    }

    /// Number of consumed commitments.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paymaster_types::Hash;

    fn record(tag: &[u8], outcome: SettlementOutcome) -> SettlementRecord {
        SettlementRecord {
            commitment: Commitment::from_hash(Hash::from_bytes(tag)),
            outcome,
            native_cost: NativeAmount(100),
            token_amount: TokenAmount(98),
            recorded_at: Timestamp(1000),
        }
    }

    #[test]
    fn test_consumed_after_append() {
        let mut store = RecordStore::new();
        let settled = record(b"r1", SettlementOutcome::Settled);

        assert!(!store.is_consumed(&settled.commitment));
        store.append(settled);
        assert!(store.is_consumed(&settled.commitment));
        assert_eq!(store.get(&settled.commitment), Some(&settled));
    }

    #[test]
    fn test_rejected_commitment_is_consumed() {
        let mut store = RecordStore::new();
        let rejected = record(
            b"r2",
            SettlementOutcome::Rejected(RejectReason::ExecutionFailed),
        );
        store.append(rejected);
        assert!(store.is_consumed(&rejected.commitment));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = RecordStore::new();
        store.append(record(b"first", SettlementOutcome::Settled));
        store.append(record(b"second", SettlementOutcome::Shortfall));

        let order: Vec<_> = store.iter().map(|r| r.outcome).collect();
        assert_eq!(
            order,
            vec![SettlementOutcome::Settled, SettlementOutcome::Shortfall]
        );
    }
}

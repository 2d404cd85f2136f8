//! The sponsor's native-asset collateral account.

use paymaster_types::NativeAmount;
use serde::{Deserialize, Serialize};

/// Native-asset collateral backing in-flight sponsorships.
///
/// Invariant: `deposited >= locked` at all times. Locking reserves part of
/// the deposit for one in-flight request; settling consumes the actual cost
/// from the deposit and releases the rest of the reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollateralAccount {
    deposited: NativeAmount,
    locked: NativeAmount,
}

impl CollateralAccount {
    /// Create an empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total deposited balance.
    pub fn deposited(&self) -> NativeAmount {
        self.deposited
    }

    /// Sum of amounts locked for in-flight requests.
    pub fn locked(&self) -> NativeAmount {
        self.locked
    }

    /// Deposit balance not reserved by any lock.
    pub fn available(&self) -> NativeAmount {
        // Invariant keeps this from underflowing.
        self.deposited.saturating_sub(self.locked)
    }

    /// Add to the deposited balance.
    pub fn deposit(&mut self, amount: NativeAmount) -> Result<(), CollateralError> {
        self.deposited = self
            .deposited
            .checked_add(amount)
            .ok_or(CollateralError::BalanceOverflow)?;
        Ok(())
    }

    /// Remove from the deposited balance.
    ///
    /// Fails if the withdrawal would take the deposit below the sum of
    /// currently locked amounts, the invariant protecting in-flight
    /// requests from under-collateralization.
    pub fn withdraw(&mut self, amount: NativeAmount) -> Result<(), CollateralError> {
        let remaining = self
            .deposited
            .checked_sub(amount)
            .ok_or(CollateralError::CollateralLocked {
                requested: amount,
                available: self.available(),
            })?;
        if remaining < self.locked {
            return Err(CollateralError::CollateralLocked {
                requested: amount,
                available: self.available(),
            });
        }
        self.deposited = remaining;
        Ok(())
    }

    /// Reserve collateral for one in-flight request.
    pub fn lock(&mut self, amount: NativeAmount) -> Result<(), CollateralError> {
        let new_locked = self
            .locked
            .checked_add(amount)
            .ok_or(CollateralError::BalanceOverflow)?;
        if new_locked > self.deposited {
            return Err(CollateralError::InsufficientCollateral {
                requested: amount,
                available: self.available(),
            });
        }
        self.locked = new_locked;
        Ok(())
    }

    /// Release a reservation without consuming anything (reject path).
    ///
    /// # Panics
    ///
    /// Debug-asserts that the amount was actually locked; the engine only
    /// releases amounts it previously locked.
    pub fn release(&mut self, amount: NativeAmount) {
        debug_assert!(amount <= self.locked, "releasing more than locked");
        self.locked = self.locked.saturating_sub(amount);
    }

    /// Consume `spent` from the deposit and release the rest of a
    /// `reserved` reservation (settle path).
    pub fn consume(&mut self, reserved: NativeAmount, spent: NativeAmount) {
        debug_assert!(reserved <= self.locked, "consuming more than locked");
        debug_assert!(spent <= reserved, "spending more than reserved");
        self.locked = self.locked.saturating_sub(reserved);
        self.deposited = self.deposited.saturating_sub(spent);
    }
}

/// Errors from collateral accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CollateralError {
    /// Not enough unlocked deposit to reserve.
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

    /// Balance arithmetic overflowed the amount domain.
    #[error("Collateral balance overflow")]
    BalanceOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_available() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(1000)).unwrap();
        assert_eq!(account.available(), NativeAmount(1000));
        assert_eq!(account.locked(), NativeAmount::ZERO);
    }

    #[test]
    fn test_lock_reserves_available() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(1000)).unwrap();
        account.lock(NativeAmount(600)).unwrap();

        assert_eq!(account.available(), NativeAmount(400));
        assert!(matches!(
            account.lock(NativeAmount(500)),
            Err(CollateralError::InsufficientCollateral { .. })
        ));
    }

    #[test]
    fn test_withdraw_respects_locks() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(1000)).unwrap();
        account.lock(NativeAmount(600)).unwrap();

        assert!(matches!(
            account.withdraw(NativeAmount(500)),
            Err(CollateralError::CollateralLocked { .. })
        ));
        account.withdraw(NativeAmount(400)).unwrap();
        assert_eq!(account.deposited(), NativeAmount(600));
    }

    #[test]
    fn test_consume_releases_excess() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(1000)).unwrap();
        account.lock(NativeAmount(600)).unwrap();

        // Actual cost 450, reservation 600: 150 returns to available.
        account.consume(NativeAmount(600), NativeAmount(450));
        assert_eq!(account.deposited(), NativeAmount(550));
        assert_eq!(account.locked(), NativeAmount::ZERO);
        assert_eq!(account.available(), NativeAmount(550));
    }

    #[test]
    fn test_release_full_lock() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(1000)).unwrap();
        account.lock(NativeAmount(600)).unwrap();
        account.release(NativeAmount(600));

        assert_eq!(account.deposited(), NativeAmount(1000));
        assert_eq!(account.available(), NativeAmount(1000));
    }

    #[test]
    fn test_conservation_invariant() {
        let mut account = CollateralAccount::new();
        account.deposit(NativeAmount(500)).unwrap();
        account.lock(NativeAmount(200)).unwrap();
        account.lock(NativeAmount(300)).unwrap();
        assert!(account.deposited() >= account.locked());

        account.consume(NativeAmount(200), NativeAmount(150));
        assert!(account.deposited() >= account.locked());

        account.release(NativeAmount(300));
        assert!(account.deposited() >= account.locked());
    }
}

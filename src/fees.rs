//! Platform fee computation and the treasury accumulator.
//!
//! Fees are charged once, at open, on the gross collateral. They sit in the
//! engine's vault until the owner sweeps them; withdrawals are all-or-nothing.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::types::{Bps, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("No fees to withdraw")]
    NothingToWithdraw,

    #[error("Fee arithmetic overflow")]
    Overflow,
}

impl FeeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Split of a gross deposit into fee and the collateral actually stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: U256,
    pub net_collateral: U256,
}

/// `fee = collateral * bps / 10_000` floored, `net = collateral - fee`.
pub fn split_platform_fee(collateral: U256, fee_rate: Bps) -> Result<FeeSplit, FeeError> {
    let fee = fee_rate.apply(collateral).ok_or(FeeError::Overflow)?;
    let net_collateral = collateral.checked_sub(fee).ok_or(FeeError::Overflow)?;
    Ok(FeeSplit {
        fee,
        net_collateral,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    accumulated: U256,
    total_collected: U256,
    total_withdrawn: U256,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated(&self) -> U256 {
        self.accumulated
    }

    pub fn total_collected(&self) -> U256 {
        self.total_collected
    }

    pub fn total_withdrawn(&self) -> U256 {
        self.total_withdrawn
    }

    /// Fails without touching state if the accumulator would overflow.
    pub fn ensure_can_accrue(&self, fee: U256) -> Result<(), FeeError> {
        self.accumulated
            .checked_add(fee)
            .map(|_| ())
            .ok_or(FeeError::Overflow)
    }

    pub fn accrue(&mut self, fee: U256) -> Result<(), FeeError> {
        self.ensure_can_accrue(fee)?;
        self.accumulated += fee;
        self.total_collected = self.total_collected.saturating_add(fee);
        Ok(())
    }

    /// Zero the accumulator and hand back everything it held.
    pub fn withdraw_all(&mut self) -> Result<U256, FeeError> {
        if self.accumulated.is_zero() {
            return Err(FeeError::NothingToWithdraw);
        }
        let amount = std::mem::replace(&mut self.accumulated, U256::ZERO);
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
        Ok(amount)
    }

    /// Undo a `withdraw_all` whose payout never left the vault.
    pub fn revert_withdrawal(&mut self, amount: U256) {
        self.accumulated = self.accumulated.saturating_add(amount);
        self.total_withdrawn = self.total_withdrawn.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_percent() -> Bps {
        Bps::new(50)
    }

    #[test]
    fn fee_split_floors() {
        let split = split_platform_fee(U256::from(100u64), half_percent()).unwrap();
        assert_eq!(split.fee, U256::ZERO);
        assert_eq!(split.net_collateral, U256::from(100u64));

        let split = split_platform_fee(U256::from(10_050u64), half_percent()).unwrap();
        assert_eq!(split.fee, U256::from(50u64));
        assert_eq!(split.net_collateral, U256::from(10_000u64));
    }

    #[test]
    fn fee_split_overflow() {
        assert_eq!(
            split_platform_fee(U256::MAX, half_percent()),
            Err(FeeError::Overflow)
        );
    }

    #[test]
    fn accrue_and_withdraw() {
        let mut treasury = Treasury::new();
        treasury.accrue(U256::from(30u64)).unwrap();
        treasury.accrue(U256::from(20u64)).unwrap();
        assert_eq!(treasury.accumulated(), U256::from(50u64));

        assert_eq!(treasury.withdraw_all(), Ok(U256::from(50u64)));
        assert!(treasury.accumulated().is_zero());
        assert_eq!(treasury.total_collected(), U256::from(50u64));
        assert_eq!(treasury.total_withdrawn(), U256::from(50u64));

        assert_eq!(treasury.withdraw_all(), Err(FeeError::NothingToWithdraw));
    }

    #[test]
    fn reverted_withdrawal_restores_accumulator() {
        let mut treasury = Treasury::new();
        treasury.accrue(U256::from(75u64)).unwrap();

        let amount = treasury.withdraw_all().unwrap();
        treasury.revert_withdrawal(amount);

        assert_eq!(treasury.accumulated(), U256::from(75u64));
        assert!(treasury.total_withdrawn().is_zero());
    }

    #[test]
    fn accrue_overflow_is_rejected() {
        let mut treasury = Treasury::new();
        treasury.accrue(U256::MAX).unwrap();
        assert_eq!(treasury.accrue(U256::from(1u64)), Err(FeeError::Overflow));
        assert_eq!(treasury.accumulated(), U256::MAX);
    }
}

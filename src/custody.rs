// 9.2 custody.rs: the collateral token collaborator. the engine only ever talks to the
// `CollateralToken` trait; `CustodyLedger` is the in-memory balance book used by the
// simulation and the tests. exact-amount transfers, no fees, no rebasing.

use alloy_primitives::U256;
use std::collections::HashMap;

use crate::types::Address;

/// Fungible collateral asset as seen from the engine's vault.
pub trait CollateralToken {
    /// Move `amount` from `from` into the engine's vault.
    fn transfer_in(&mut self, from: Address, amount: U256) -> Result<(), CustodyError>;

    /// Move `amount` out of the engine's vault to `to`.
    fn transfer_out(&mut self, to: Address, amount: U256) -> Result<(), CustodyError>;

    fn balance_of(&self, account: Address) -> U256;

    /// Balance currently held by the engine's vault.
    fn custody_balance(&self) -> U256;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Insufficient balance for {account}: requested {requested}, available {available}")]
    InsufficientBalance {
        account: Address,
        requested: U256,
        available: U256,
    },

    #[error("Transfer amount must be positive")]
    InvalidAmount,

    #[error("Balance overflow for {0}")]
    Overflow(Address),
}

/// Balance book for one collateral asset. the vault address is where the engine
/// holds deposited collateral and accumulated fees.
#[derive(Debug, Clone)]
pub struct CustodyLedger {
    vault: Address,
    balances: HashMap<Address, U256>,
    total_supply: U256,
    // Total moved into the vault
    total_deposited: U256,
    // Total moved out of the vault
    total_withdrawn: U256,
}

impl CustodyLedger {
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            balances: HashMap::new(),
            total_supply: U256::ZERO,
            total_deposited: U256::ZERO,
            total_withdrawn: U256::ZERO,
        }
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    /// Credit fresh units to `account`. funding hook for simulations and tests.
    pub fn mint(&mut self, account: Address, amount: U256) -> Result<(), CustodyError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(CustodyError::Overflow(account))?;
        let balance = self.balance_of(account);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(CustodyError::Overflow(account))?;

        self.balances.insert(account, new_balance);
        self.total_supply = supply;
        Ok(())
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn total_deposited(&self) -> U256 {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> U256 {
        self.total_withdrawn
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), CustodyError> {
        if amount.is_zero() {
            return Err(CustodyError::InvalidAmount);
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(CustodyError::InsufficientBalance {
                account: from,
                requested: amount,
                available,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow(to))?;

        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl CollateralToken for CustodyLedger {
    fn transfer_in(&mut self, from: Address, amount: U256) -> Result<(), CustodyError> {
        self.transfer(from, self.vault, amount)?;
        self.total_deposited = self.total_deposited.saturating_add(amount);
        Ok(())
    }

    fn transfer_out(&mut self, to: Address, amount: U256) -> Result<(), CustodyError> {
        self.transfer(self.vault, to, amount)?;
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
        Ok(())
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    fn custody_balance(&self) -> U256 {
        self.balance_of(self.vault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Address {
        Address::repeat_byte(0xee)
    }

    fn alice() -> Address {
        Address::repeat_byte(0x01)
    }

    #[test]
    fn deposit_and_withdraw_through_vault() {
        let mut ledger = CustodyLedger::new(vault());
        ledger.mint(alice(), U256::from(1_000u64)).unwrap();

        ledger.transfer_in(alice(), U256::from(400u64)).unwrap();
        assert_eq!(ledger.balance_of(alice()), U256::from(600u64));
        assert_eq!(ledger.custody_balance(), U256::from(400u64));

        ledger.transfer_out(alice(), U256::from(150u64)).unwrap();
        assert_eq!(ledger.balance_of(alice()), U256::from(750u64));
        assert_eq!(ledger.custody_balance(), U256::from(250u64));

        assert_eq!(ledger.total_deposited(), U256::from(400u64));
        assert_eq!(ledger.total_withdrawn(), U256::from(150u64));
        assert_eq!(ledger.total_supply(), U256::from(1_000u64));
    }

    #[test]
    fn insufficient_balance_leaves_books_untouched() {
        let mut ledger = CustodyLedger::new(vault());
        ledger.mint(alice(), U256::from(10u64)).unwrap();

        let result = ledger.transfer_in(alice(), U256::from(11u64));
        assert!(matches!(result, Err(CustodyError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance_of(alice()), U256::from(10u64));
        assert!(ledger.custody_balance().is_zero());

        let result = ledger.transfer_out(alice(), U256::from(1u64));
        assert!(matches!(result, Err(CustodyError::InsufficientBalance { .. })));
    }

    #[test]
    fn zero_transfer_rejected() {
        let mut ledger = CustodyLedger::new(vault());
        assert_eq!(
            ledger.transfer_in(alice(), U256::ZERO),
            Err(CustodyError::InvalidAmount)
        );
    }
}

// 4.0: the position record and the pnl formula. positions are immutable values: the
// ledger creates them whole and removes them whole, nothing edits one in place.
// 4.1: calculate_pnl is pure. all math is signed 256-bit, multiply before divide,
// truncating toward zero at every step.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::types::{
    Address, Direction, ErrorKind, FeedId, Leverage, PositionId, Price, Timestamp, I256,
    LEVERAGE_PRECISION, PRECISION,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: Address,
    /// net of the platform fee, always > 0 while stored
    pub collateral: U256,
    pub entry_price: Price,
    pub leverage: Leverage,
    pub direction: Direction,
    pub open_timestamp: Timestamp,
    pub feed_id: FeedId,
}

impl Position {
    pub fn pnl_at(&self, current_price: Price) -> Result<PnlOutcome, PnlError> {
        calculate_pnl(self, current_price)
    }
}

/// Realized result of settling a position at some price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlOutcome {
    pub pnl: I256,
    /// what the owner would receive, never negative
    pub payout: U256,
}

impl PnlOutcome {
    pub fn is_loss(&self) -> bool {
        self.pnl.is_negative()
    }

    /// `|pnl|` when losing, zero otherwise.
    pub fn loss(&self) -> U256 {
        if self.pnl.is_negative() {
            self.pnl.unsigned_abs()
        } else {
            U256::ZERO
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PnlError {
    #[error("Arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("Collateral must be positive")]
    ZeroCollateral,
}

impl PnlError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

fn signed(value: U256, what: &'static str) -> Result<I256, PnlError> {
    I256::try_from(value).map_err(|_| PnlError::Overflow(what))
}

fn precision() -> I256 {
    I256::from_raw(PRECISION)
}

fn leverage_precision() -> I256 {
    I256::from_raw(U256::from(LEVERAGE_PRECISION))
}

/// Signed price move of the position's direction, scaled by 1e18.
pub fn price_change_percent(
    direction: Direction,
    entry_price: Price,
    current_price: Price,
) -> Result<I256, PnlError> {
    let entry = signed(entry_price.value(), "entry price")?;
    let current = signed(current_price.value(), "current price")?;

    let delta = match direction {
        Direction::Long => current.checked_sub(entry),
        Direction::Short => entry.checked_sub(current),
    }
    .ok_or(PnlError::Overflow("price delta"))?;

    delta
        .checked_mul(precision())
        .ok_or(PnlError::Overflow("price change"))?
        .checked_div(entry)
        .ok_or(PnlError::Overflow("price change"))
}

/// The pnl formula on raw parts:
///
/// ```text
/// change    = (current - entry) * 1e18 / entry     (negated for shorts)
/// leveraged = change * leverage / 1e4
/// pnl       = collateral * leveraged / 1e18
/// payout    = pnl >= 0 ? collateral + pnl : max(0, collateral - |pnl|)
/// ```
pub fn pnl_for(
    collateral: U256,
    entry_price: Price,
    leverage: Leverage,
    direction: Direction,
    current_price: Price,
) -> Result<PnlOutcome, PnlError> {
    let change = price_change_percent(direction, entry_price, current_price)?;

    let leveraged = change
        .checked_mul(I256::from_raw(U256::from(leverage.raw())))
        .ok_or(PnlError::Overflow("leveraged change"))?
        .checked_div(leverage_precision())
        .ok_or(PnlError::Overflow("leveraged change"))?;

    let pnl = signed(collateral, "collateral")?
        .checked_mul(leveraged)
        .ok_or(PnlError::Overflow("pnl"))?
        .checked_div(precision())
        .ok_or(PnlError::Overflow("pnl"))?;

    let payout = if pnl.is_negative() {
        collateral.saturating_sub(pnl.unsigned_abs())
    } else {
        collateral
            .checked_add(pnl.unsigned_abs())
            .ok_or(PnlError::Overflow("payout"))?
    };

    Ok(PnlOutcome { pnl, payout })
}

pub fn calculate_pnl(position: &Position, current_price: Price) -> Result<PnlOutcome, PnlError> {
    pnl_for(
        position.collateral,
        position.entry_price,
        position.leverage,
        position.direction,
        current_price,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(collateral: u64, leverage_x: u64, direction: Direction, entry: u64) -> Position {
        Position {
            id: PositionId(1),
            owner: Address::repeat_byte(0x01),
            collateral: U256::from(collateral),
            entry_price: Price::from_units(entry),
            leverage: Leverage::from_multiplier(leverage_x),
            direction,
            open_timestamp: Timestamp::from_secs(0),
            feed_id: FeedId::from("ETH/USD"),
        }
    }

    fn int(v: i64) -> I256 {
        I256::try_from(v).unwrap()
    }

    #[test]
    fn long_profit_five_x() {
        let pos = position(100, 5, Direction::Long, 2000);
        let outcome = calculate_pnl(&pos, Price::from_units(2200)).unwrap();
        assert_eq!(outcome.pnl, int(50));
        assert_eq!(outcome.payout, U256::from(150u64));
    }

    #[test]
    fn long_loss_five_x() {
        let pos = position(100, 5, Direction::Long, 2000);
        let outcome = calculate_pnl(&pos, Price::from_units(1800)).unwrap();
        assert_eq!(outcome.pnl, int(-50));
        assert_eq!(outcome.payout, U256::from(50u64));
        assert_eq!(outcome.loss(), U256::from(50u64));
    }

    #[test]
    fn loss_beyond_collateral_pays_zero() {
        let pos = position(100, 5, Direction::Long, 2000);
        let outcome = calculate_pnl(&pos, Price::from_units(1000)).unwrap();
        assert_eq!(outcome.pnl, int(-250));
        assert_eq!(outcome.payout, U256::ZERO);
    }

    #[test]
    fn short_mirrors_long() {
        let long = position(1_000, 3, Direction::Long, 2000);
        let short = position(1_000, 3, Direction::Short, 2000);
        let exit = Price::from_units(1900);

        let long_pnl = calculate_pnl(&long, exit).unwrap().pnl;
        let short_pnl = calculate_pnl(&short, exit).unwrap().pnl;
        assert_eq!(long_pnl, int(-150));
        assert_eq!(short_pnl, int(150));
    }

    #[test]
    fn truncation_follows_multiply_before_divide() {
        // 1/3 price move on 1x: change = 1e18/3 truncated, pnl = 10 * that / 1e18 = 3
        let pos = position(10, 1, Direction::Long, 3);
        let outcome = calculate_pnl(&pos, Price::from_units(4)).unwrap();
        assert_eq!(outcome.pnl, int(3));

        // truncation is toward zero for losses too
        let outcome = calculate_pnl(&pos, Price::from_units(2)).unwrap();
        assert_eq!(outcome.pnl, int(-3));
    }

    #[test]
    fn unchanged_price_is_flat() {
        let pos = position(500, 100, Direction::Short, 1234);
        let outcome = calculate_pnl(&pos, Price::from_units(1234)).unwrap();
        assert!(outcome.pnl.is_zero());
        assert_eq!(outcome.payout, U256::from(500u64));
    }

    #[test]
    fn absurd_inputs_overflow_instead_of_wrapping() {
        let mut pos = position(1, 1000, Direction::Long, 1);
        pos.collateral = U256::MAX >> 2;
        let result = calculate_pnl(&pos, Price::new_unchecked(U256::MAX >> 2));
        assert!(matches!(result, Err(PnlError::Overflow(_))));
    }
}

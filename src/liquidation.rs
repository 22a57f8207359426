//! Liquidation conditions and the liquidator reward.
//!
//! A position may be force-closed once its loss reaches a fixed share of its
//! collateral (80% by default). The liquidator earns a small cut of the stored
//! collateral; the owner forfeits everything.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::position::{calculate_pnl, PnlError, PnlOutcome, Position};
use crate::types::{Bps, Price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationParams {
    /// loss as a whole percent of collateral at which liquidation opens up
    pub threshold_pct: u64,
    /// liquidator reward on the stored collateral
    pub reward_rate: Bps,
}

impl Default for LiquidationParams {
    fn default() -> Self {
        Self {
            threshold_pct: 80,
            reward_rate: Bps::new(10), // 0.1%
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationStatus {
    /// at or above entry in the position's favour
    Profitable { outcome: PnlOutcome },
    /// losing, but below the threshold
    Underwater { outcome: PnlOutcome, loss_pct: U256 },
    Liquidatable { outcome: PnlOutcome, loss_pct: U256 },
}

impl LiquidationStatus {
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, LiquidationStatus::Liquidatable { .. })
    }

    pub fn outcome(&self) -> PnlOutcome {
        match self {
            LiquidationStatus::Profitable { outcome }
            | LiquidationStatus::Underwater { outcome, .. }
            | LiquidationStatus::Liquidatable { outcome, .. } => *outcome,
        }
    }

    pub fn loss_pct(&self) -> U256 {
        match self {
            LiquidationStatus::Profitable { .. } => U256::ZERO,
            LiquidationStatus::Underwater { loss_pct, .. }
            | LiquidationStatus::Liquidatable { loss_pct, .. } => *loss_pct,
        }
    }
}

/// `|loss| * 100 / collateral`, floored.
pub fn loss_percent(loss: U256, collateral: U256) -> Result<U256, PnlError> {
    if collateral.is_zero() {
        return Err(PnlError::ZeroCollateral);
    }
    loss.checked_mul(U256::from(100u64))
        .map(|scaled| scaled / collateral)
        .ok_or(PnlError::Overflow("loss percent"))
}

pub fn evaluate_liquidation(
    position: &Position,
    current_price: Price,
    params: &LiquidationParams,
) -> Result<LiquidationStatus, PnlError> {
    let outcome = calculate_pnl(position, current_price)?;
    if !outcome.is_loss() {
        return Ok(LiquidationStatus::Profitable { outcome });
    }

    let loss_pct = loss_percent(outcome.loss(), position.collateral)?;
    if loss_pct >= U256::from(params.threshold_pct) {
        Ok(LiquidationStatus::Liquidatable { outcome, loss_pct })
    } else {
        Ok(LiquidationStatus::Underwater { outcome, loss_pct })
    }
}

/// Liquidatable iff pnl < 0 and the loss is at least 80% of collateral.
pub fn should_liquidate(position: &Position, current_price: Price) -> Result<bool, PnlError> {
    evaluate_liquidation(position, current_price, &LiquidationParams::default())
        .map(|status| status.is_liquidatable())
}

pub fn liquidator_reward(collateral: U256, params: &LiquidationParams) -> Result<U256, PnlError> {
    params
        .reward_rate
        .apply(collateral)
        .ok_or(PnlError::Overflow("liquidator reward"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Direction, FeedId, Leverage, PositionId, Timestamp};

    fn position(collateral: u64, leverage_x: u64, entry: u64) -> Position {
        Position {
            id: PositionId(1),
            owner: Address::repeat_byte(0x01),
            collateral: U256::from(collateral),
            entry_price: Price::from_units(entry),
            leverage: Leverage::from_multiplier(leverage_x),
            direction: Direction::Long,
            open_timestamp: Timestamp::from_secs(0),
            feed_id: FeedId::from("ETH/USD"),
        }
    }

    #[test]
    fn fifty_percent_loss_is_not_liquidatable() {
        let pos = position(100, 5, 2000);
        let status = evaluate_liquidation(&pos, Price::from_units(1800), &LiquidationParams::default()).unwrap();
        assert!(matches!(status, LiquidationStatus::Underwater { .. }));
        assert_eq!(status.loss_pct(), U256::from(50u64));
        assert!(!should_liquidate(&pos, Price::from_units(1800)).unwrap());
    }

    #[test]
    fn full_loss_is_liquidatable() {
        let pos = position(100, 5, 2000);
        let status = evaluate_liquidation(&pos, Price::from_units(1600), &LiquidationParams::default()).unwrap();
        assert!(status.is_liquidatable());
        assert_eq!(status.loss_pct(), U256::from(100u64));
        assert_eq!(status.outcome().payout, U256::ZERO);
    }

    #[test]
    fn threshold_boundary() {
        // 1x long, entry 10000: exit 2001 loses 79.99%, exit 2000 loses exactly 80%
        let pos = position(10_000, 1, 10_000);
        assert!(!should_liquidate(&pos, Price::from_units(2001)).unwrap());
        assert!(should_liquidate(&pos, Price::from_units(2000)).unwrap());
    }

    #[test]
    fn profit_is_never_liquidatable() {
        let pos = position(100, 50, 2000);
        let status = evaluate_liquidation(&pos, Price::from_units(2500), &LiquidationParams::default()).unwrap();
        assert!(matches!(status, LiquidationStatus::Profitable { .. }));
        assert!(status.loss_pct().is_zero());
    }

    #[test]
    fn reward_is_a_tenth_of_a_percent() {
        let params = LiquidationParams::default();
        assert_eq!(liquidator_reward(U256::from(10_000u64), &params), Ok(U256::from(10u64)));
        assert_eq!(liquidator_reward(U256::from(999u64), &params), Ok(U256::ZERO));
    }

    #[test]
    fn loss_percent_rejects_zero_collateral() {
        assert_eq!(loss_percent(U256::from(1u64), U256::ZERO), Err(PnlError::ZeroCollateral));
    }
}

//! Permissionless liquidation.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult};
use crate::custody::CollateralToken;
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::liquidation::{evaluate_liquidation, liquidator_reward, LiquidationStatus};
use crate::price_feed::PriceOracle;
use crate::types::{Address, PositionId};

impl<T: CollateralToken, O: PriceOracle> Engine<T, O> {
    /// Force-close a position whose loss has reached the liquidation threshold.
    /// Anyone may call. The caller earns the reward, the owner receives nothing and
    /// the rest of the collateral stays in the vault.
    pub fn liquidate_position(
        &mut self,
        caller: Address,
        position_id: PositionId,
    ) -> Result<LiquidationResult, EngineError> {
        self.ensure_running()?;

        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;

        let exit_price = self.fresh_price(
            &position.feed_id,
            self.config.trading.liquidation_max_price_age_secs,
        )?;
        let params = self.config.trading.liquidation_params();

        let outcome = match evaluate_liquidation(position, exit_price, &params)? {
            LiquidationStatus::Liquidatable { outcome, .. } => outcome,
            status => {
                tracing::warn!(position_id = %position_id, loss_pct = %status.loss_pct(), "liquidation rejected");
                return Err(EngineError::NotLiquidatable {
                    position_id,
                    loss_pct: status.loss_pct(),
                });
            }
        };
        let reward = liquidator_reward(position.collateral, &params)?;

        let position = self
            .take_position(position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        let owner = position.owner;

        if !reward.is_zero() {
            if let Err(e) = self.token.transfer_out(caller, reward) {
                tracing::warn!(position_id = %position_id, error = %e, "liquidator reward failed, liquidation rolled back");
                self.insert_position(position);
                return Err(e.into());
            }
        }

        tracing::info!(
            position_id = %position_id,
            %owner,
            liquidator = %caller,
            exit_price = %exit_price,
            pnl = %outcome.pnl,
            %reward,
            "position liquidated"
        );

        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            position_id,
            owner,
            liquidator: caller,
            exit_price,
            pnl: outcome.pnl,
            reward,
        }));

        Ok(LiquidationResult {
            position_id,
            owner,
            liquidator: caller,
            exit_price,
            pnl: outcome.pnl,
            reward,
        })
    }
}

//! Owner-only controls: emergency stop, feed toggles, leverage caps, oracle swap and
//! fee withdrawal. None of these touch stored positions.

use super::core::Engine;
use super::results::EngineError;
use crate::custody::CollateralToken;
use crate::events::{
    EmergencyStopSetEvent, EventPayload, FeedStatusChangedEvent, FeesWithdrawnEvent,
    MaxLeverageUpdatedEvent,
};
use crate::price_feed::PriceOracle;
use crate::types::{Address, FeedId, Leverage};
use alloy_primitives::U256;

impl<T: CollateralToken, O: PriceOracle> Engine<T, O> {
    pub fn set_emergency_stop(&mut self, caller: Address, active: bool) -> Result<(), EngineError> {
        self.ensure_owner(caller, "set emergency stop")?;
        self.emergency_stop = active;

        tracing::info!(active, "emergency stop set");
        self.emit_event(EventPayload::EmergencyStopSet(EmergencyStopSetEvent { active }));
        Ok(())
    }

    pub fn set_feed_status(&mut self, caller: Address, feed_id: &FeedId, active: bool) -> Result<(), EngineError> {
        self.ensure_owner(caller, "set feed status")?;
        if active {
            self.active_feeds.insert(feed_id.clone());
        } else {
            self.active_feeds.remove(feed_id);
        }

        tracing::info!(feed = %feed_id, active, "feed status changed");
        self.emit_event(EventPayload::FeedStatusChanged(FeedStatusChangedEvent {
            feed_id: feed_id.clone(),
            active,
        }));
        Ok(())
    }

    /// Cap leverage for one feed. must sit within [1x, configured default].
    pub fn set_max_leverage_for_asset(
        &mut self,
        caller: Address,
        feed_id: &FeedId,
        max_leverage: Leverage,
    ) -> Result<(), EngineError> {
        self.ensure_owner(caller, "set max leverage")?;

        let ceiling = self.config.trading.default_max_leverage();
        if max_leverage < Leverage::ONE_X || max_leverage > ceiling {
            return Err(EngineError::LeverageOutOfRange {
                leverage: max_leverage,
                min: Leverage::ONE_X,
                max: ceiling,
            });
        }
        self.max_leverage.insert(feed_id.clone(), max_leverage);

        tracing::info!(feed = %feed_id, %max_leverage, "max leverage updated");
        self.emit_event(EventPayload::MaxLeverageUpdated(MaxLeverageUpdatedEvent {
            feed_id: feed_id.clone(),
            max_leverage,
        }));
        Ok(())
    }

    /// Swap the oracle collaborator. hands back the one it replaced.
    pub fn set_price_oracle(&mut self, caller: Address, oracle: O) -> Result<O, EngineError> {
        self.ensure_owner(caller, "set price oracle")?;
        tracing::info!("price oracle replaced");
        Ok(std::mem::replace(&mut self.oracle, oracle))
    }

    /// Send every accumulated fee to `recipient`. no partial withdrawals.
    pub fn withdraw_fees(&mut self, caller: Address, recipient: Address) -> Result<U256, EngineError> {
        self.ensure_owner(caller, "withdraw fees")?;

        let amount = self.treasury.withdraw_all()?;
        if let Err(e) = self.token.transfer_out(recipient, amount) {
            self.treasury.revert_withdrawal(amount);
            return Err(e.into());
        }

        tracing::info!(%recipient, %amount, "fees withdrawn");
        self.emit_event(EventPayload::FeesWithdrawn(FeesWithdrawnEvent { recipient, amount }));
        Ok(amount)
    }
}

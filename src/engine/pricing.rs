//! Oracle reads with staleness enforcement, and price pushes into an embedded store.

use super::core::Engine;
use super::results::EngineError;
use crate::custody::CollateralToken;
use crate::events::EventPayload;
use crate::liquidation::{evaluate_liquidation, LiquidationStatus};
use crate::position::PnlOutcome;
use crate::price_feed::{PriceFeedStore, PriceOracle};
use crate::types::{Address, FeedId, PositionId, Price};
use alloy_primitives::U256;

impl<T: CollateralToken, O: PriceOracle> Engine<T, O> {
    /// Latest oracle price, rejected if older than `max_age` seconds. a timestamp
    /// ahead of the engine clock is treated as stale too.
    pub(super) fn fresh_price(&self, feed_id: &FeedId, max_age: u64) -> Result<Price, EngineError> {
        let data = self.oracle.get_latest_price(feed_id)?;
        let now = self.current_time;

        match data.last_update.age_at(now) {
            Some(age) if age <= max_age => Ok(data.price),
            _ => {
                tracing::warn!(feed = %feed_id, last_update = %data.last_update, %now, max_age, "stale oracle price");
                Err(EngineError::StalePrice {
                    feed_id: feed_id.clone(),
                    last_update: data.last_update,
                    now,
                    max_age,
                })
            }
        }
    }

    /// PnL a position would realize at the oracle's latest price. no staleness check.
    pub fn position_pnl(&self, position_id: PositionId) -> Result<PnlOutcome, EngineError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        let data = self.oracle.get_latest_price(&position.feed_id)?;
        Ok(position.pnl_at(data.price)?)
    }

    /// Liquidation status at the oracle's latest price. no staleness check.
    pub fn liquidation_status(&self, position_id: PositionId) -> Result<LiquidationStatus, EngineError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        let data = self.oracle.get_latest_price(&position.feed_id)?;
        let params = self.config.trading.liquidation_params();
        Ok(evaluate_liquidation(position, data.price, &params)?)
    }

    pub fn is_liquidatable(&self, position_id: PositionId) -> Result<bool, EngineError> {
        self.liquidation_status(position_id)
            .map(|status| status.is_liquidatable())
    }
}

impl<T: CollateralToken> Engine<T, PriceFeedStore> {
    /// Publish a price into the embedded feed store at the engine clock.
    pub fn push_price(&mut self, caller: Address, feed_id: &FeedId, price: U256) -> Result<(), EngineError> {
        let now = self.current_time;
        self.oracle.update_price(caller, feed_id, price, now)?;
        self.mirror_oracle_events(1);
        Ok(())
    }

    /// Batch publish at the engine clock. zero prices are skipped.
    pub fn push_prices(
        &mut self,
        caller: Address,
        feed_ids: &[FeedId],
        prices: &[U256],
    ) -> Result<usize, EngineError> {
        let now = self.current_time;
        let written = self.oracle.update_prices(caller, feed_ids, prices, now)?;
        self.mirror_oracle_events(written);
        Ok(written)
    }

    /// Grant or revoke price publishing rights on the embedded store. store owner only.
    pub fn set_authorized_updater(
        &mut self,
        caller: Address,
        account: Address,
        authorized: bool,
    ) -> Result<(), EngineError> {
        let now = self.current_time;
        self.oracle.set_authorized_updater(caller, account, authorized, now)?;
        self.mirror_oracle_events(1);
        Ok(())
    }

    // copy the store's newest events into the engine log
    fn mirror_oracle_events(&mut self, count: usize) {
        let mirrored: Vec<EventPayload> = self
            .oracle
            .events()
            .recent(count)
            .iter()
            .map(|event| event.payload.clone())
            .collect();
        for payload in mirrored {
            self.emit_event(payload);
        }
    }
}

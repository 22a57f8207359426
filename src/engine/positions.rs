//! Opening and closing positions.

use super::core::Engine;
use super::results::{CloseResult, EngineError};
use crate::custody::CollateralToken;
use crate::events::{EventPayload, PositionClosedEvent, PositionOpenedEvent};
use crate::fees::split_platform_fee;
use crate::position::Position;
use crate::price_feed::PriceOracle;
use crate::types::{Address, Direction, FeedId, Leverage, PositionId};
use alloy_primitives::U256;

impl<T: CollateralToken, O: PriceOracle> Engine<T, O> {
    /// Open a leveraged position funded by `collateral` pulled from `caller`.
    pub fn open_position(
        &mut self,
        caller: Address,
        collateral: U256,
        leverage: Leverage,
        direction: Direction,
        feed_id: &FeedId,
    ) -> Result<PositionId, EngineError> {
        self.ensure_running()?;

        if collateral.is_zero() {
            return Err(EngineError::ZeroCollateral);
        }
        if !self.is_feed_active(feed_id) {
            return Err(EngineError::FeedInactive(feed_id.clone()));
        }

        let max = self.max_leverage_for(feed_id);
        if leverage < Leverage::ONE_X || leverage > max {
            return Err(EngineError::LeverageOutOfRange {
                leverage,
                min: Leverage::ONE_X,
                max,
            });
        }

        let entry_price = self.fresh_price(feed_id, self.config.trading.max_price_age_secs)?;

        let split = split_platform_fee(collateral, self.config.trading.platform_fee())?;
        if split.net_collateral.is_zero() {
            return Err(EngineError::CollateralBelowFee {
                collateral,
                fee: split.fee,
            });
        }
        self.treasury.ensure_can_accrue(split.fee)?;
        let position_id = self.allocate_position_id()?;

        // last fallible step; nothing has been written before it
        if let Err(e) = self.token.transfer_in(caller, collateral) {
            self.next_position_id = position_id.0;
            return Err(e.into());
        }

        self.treasury.accrue(split.fee)?;
        self.insert_position(Position {
            id: position_id,
            owner: caller,
            collateral: split.net_collateral,
            entry_price,
            leverage,
            direction,
            open_timestamp: self.current_time,
            feed_id: feed_id.clone(),
        });

        tracing::info!(
            position_id = %position_id,
            owner = %caller,
            feed = %feed_id,
            %direction,
            %leverage,
            collateral = %split.net_collateral,
            fee = %split.fee,
            entry_price = %entry_price,
            "position opened"
        );

        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            position_id,
            owner: caller,
            feed_id: feed_id.clone(),
            direction,
            collateral: split.net_collateral,
            fee: split.fee,
            entry_price,
            leverage,
        }));

        Ok(position_id)
    }

    /// Settle the caller's position at the current oracle price.
    pub fn close_position(
        &mut self,
        caller: Address,
        position_id: PositionId,
    ) -> Result<CloseResult, EngineError> {
        self.ensure_running()?;

        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if position.owner != caller {
            return Err(EngineError::NotPositionOwner {
                position_id,
                caller,
            });
        }

        let exit_price = self.fresh_price(&position.feed_id, self.config.trading.max_price_age_secs)?;
        let outcome = position.pnl_at(exit_price)?;

        // finalize the ledger before any funds leave custody
        let position = self
            .take_position(position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;

        if !outcome.payout.is_zero() {
            if let Err(e) = self.token.transfer_out(caller, outcome.payout) {
                tracing::warn!(position_id = %position_id, error = %e, "payout failed, close rolled back");
                self.insert_position(position);
                return Err(e.into());
            }
        }

        tracing::info!(
            position_id = %position_id,
            owner = %caller,
            exit_price = %exit_price,
            pnl = %outcome.pnl,
            payout = %outcome.payout,
            "position closed"
        );

        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            position_id,
            owner: caller,
            exit_price,
            pnl: outcome.pnl,
            payout: outcome.payout,
        }));

        Ok(CloseResult {
            position_id,
            exit_price,
            pnl: outcome.pnl,
            payout: outcome.payout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::CustodyLedger;
    use crate::engine::EngineConfig;
    use crate::price_feed::PriceFeedStore;
    use crate::types::{ErrorKind, Price};

    fn owner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn trader() -> Address {
        Address::repeat_byte(0x01)
    }

    fn eth() -> FeedId {
        FeedId::from("ETH/USD")
    }

    fn setup() -> Engine<CustodyLedger, PriceFeedStore> {
        let mut token = CustodyLedger::new(Address::repeat_byte(0xee));
        token.mint(trader(), U256::from(1_000_000u64)).unwrap();
        let mut engine = Engine::new(
            EngineConfig::default(),
            owner(),
            token,
            PriceFeedStore::new(owner()),
        )
        .unwrap();
        engine.set_time(crate::types::Timestamp::from_secs(1_000));
        engine.set_feed_status(owner(), &eth(), true).unwrap();
        engine.push_price(owner(), &eth(), Price::from_units(2000).value()).unwrap();
        engine
    }

    #[test]
    fn open_charges_fee_and_indexes_owner() {
        let mut engine = setup();
        let id = engine
            .open_position(trader(), U256::from(10_050u64), Leverage::from_multiplier(5), Direction::Long, &eth())
            .unwrap();

        assert_eq!(id, PositionId(1));
        let position = engine.position(id).unwrap();
        assert_eq!(position.collateral, U256::from(10_000u64));
        assert_eq!(position.entry_price, Price::from_units(2000));
        assert_eq!(engine.accumulated_fees(), U256::from(50u64));
        assert_eq!(engine.positions_of(trader()), &[id]);
        assert_eq!(engine.token().custody_balance(), U256::from(10_050u64));
    }

    #[test]
    fn ids_are_monotonic() {
        let mut engine = setup();
        let first = engine
            .open_position(trader(), U256::from(100u64), Leverage::ONE_X, Direction::Long, &eth())
            .unwrap();
        engine.close_position(trader(), first).unwrap();
        let second = engine
            .open_position(trader(), U256::from(100u64), Leverage::ONE_X, Direction::Short, &eth())
            .unwrap();
        assert_eq!(second, PositionId(2));
    }

    #[test]
    fn open_validation_order() {
        let mut engine = setup();

        let err = engine
            .open_position(trader(), U256::ZERO, Leverage::ONE_X, Direction::Long, &eth())
            .unwrap_err();
        assert_eq!(err, EngineError::ZeroCollateral);

        let err = engine
            .open_position(trader(), U256::from(100u64), Leverage::ONE_X, Direction::Long, &FeedId::from("DOGE/USD"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine
            .open_position(trader(), U256::from(100u64), Leverage::from_raw(9_999), Direction::Long, &eth())
            .unwrap_err();
        assert!(matches!(err, EngineError::LeverageOutOfRange { .. }));

        let err = engine
            .open_position(trader(), U256::from(100u64), Leverage::from_multiplier(1001), Direction::Long, &eth())
            .unwrap_err();
        assert!(matches!(err, EngineError::LeverageOutOfRange { .. }));

        assert_eq!(engine.position_count(), 0);
        assert!(engine.accumulated_fees().is_zero());
    }

    #[test]
    fn failed_pull_leaves_no_trace() {
        let mut engine = setup();
        let broke = Address::repeat_byte(0x09);

        let err = engine
            .open_position(broke, U256::from(100u64), Leverage::ONE_X, Direction::Long, &eth())
            .unwrap_err();
        assert!(matches!(err, EngineError::Custody(_)));
        assert_eq!(engine.position_count(), 0);

        // the id that was reserved is handed out again
        let id = engine
            .open_position(trader(), U256::from(100u64), Leverage::ONE_X, Direction::Long, &eth())
            .unwrap();
        assert_eq!(id, PositionId(1));
    }

    #[test]
    fn stranger_cannot_close() {
        let mut engine = setup();
        let id = engine
            .open_position(trader(), U256::from(100u64), Leverage::ONE_X, Direction::Long, &eth())
            .unwrap();

        let err = engine.close_position(Address::repeat_byte(0x02), id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(engine.position(id).is_some());
    }

    #[test]
    fn unfunded_profit_rolls_back_close() {
        let mut engine = setup();
        let id = engine
            .open_position(trader(), U256::from(1_000u64), Leverage::from_multiplier(10), Direction::Long, &eth())
            .unwrap();

        // +50% at 10x: payout far exceeds the vault
        engine.push_price(owner(), &eth(), Price::from_units(3000).value()).unwrap();
        let err = engine.close_position(trader(), id).unwrap_err();

        assert!(matches!(err, EngineError::Custody(_)));
        assert!(engine.position(id).is_some());
        assert_eq!(engine.positions_of(trader()), &[id]);
    }
}

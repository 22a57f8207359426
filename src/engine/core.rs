// 8.0 engine/core.rs: main engine. holds the position ledger, treasury, admin flags,
// the oracle and the collateral token. every state change goes through `&mut self`,
// so operations are serialized and none can observe another half done.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::custody::CollateralToken;
use crate::events::{Event, EventCollector, EventPayload};
use crate::fees::Treasury;
use crate::position::Position;
use crate::price_feed::PriceOracle;
use crate::types::{Address, FeedId, Leverage, PositionId, Timestamp};
use alloy_primitives::U256;
use std::collections::{BTreeMap, HashMap, HashSet};

/** 8.1: main engine struct. all ledger state lives here */
#[derive(Debug)]
pub struct Engine<T, O> {
    pub(super) config: EngineConfig,
    pub(super) owner: Address,
    pub(super) token: T,
    pub(super) oracle: O,
    pub(super) positions: BTreeMap<PositionId, Position>,
    pub(super) positions_by_owner: HashMap<Address, Vec<PositionId>>,
    pub(super) active_feeds: HashSet<FeedId>,
    pub(super) max_leverage: HashMap<FeedId, Leverage>,
    pub(super) treasury: Treasury,
    pub(super) emergency_stop: bool,
    pub(super) next_position_id: u64,
    pub(super) events: EventCollector,
    pub(super) current_time: Timestamp,
}

impl<T: CollateralToken, O: PriceOracle> Engine<T, O> {
    pub fn new(config: EngineConfig, owner: Address, token: T, oracle: O) -> Result<Self, EngineError> {
        config.trading.validate()?;
        let events = EventCollector::with_capacity_limit(config.max_events);

        Ok(Self {
            config,
            owner,
            token,
            oracle,
            positions: BTreeMap::new(),
            positions_by_owner: HashMap::new(),
            active_feeds: HashSet::new(),
            max_leverage: HashMap::new(),
            treasury: Treasury::new(),
            emergency_stop: false,
            next_position_id: 1,
            events,
            current_time: Timestamp::from_secs(0),
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn position(&self, position_id: PositionId) -> Option<&Position> {
        self.positions.get(&position_id)
    }

    /// Ids of the owner's open positions, in opening order.
    pub fn positions_of(&self, owner: Address) -> &[PositionId] {
        self.positions_by_owner
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn positions_iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Sum of collateral across open positions.
    pub fn total_collateral(&self) -> U256 {
        self.positions
            .values()
            .fold(U256::ZERO, |acc, p| acc.saturating_add(p.collateral))
    }

    pub fn accumulated_fees(&self) -> U256 {
        self.treasury.accumulated()
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn is_feed_active(&self, feed_id: &FeedId) -> bool {
        self.active_feeds.contains(feed_id)
    }

    /// Per-feed override if one is set, otherwise the configured default.
    pub fn max_leverage_for(&self, feed_id: &FeedId) -> Leverage {
        self.max_leverage
            .get(feed_id)
            .copied()
            .unwrap_or_else(|| self.config.trading.default_max_leverage())
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stop
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.events.record(self.current_time, payload);
    }

    pub(super) fn ensure_owner(&self, caller: Address, action: &'static str) -> Result<(), EngineError> {
        if caller == self.owner {
            Ok(())
        } else {
            tracing::warn!(%caller, action, "rejected non-owner admin call");
            Err(EngineError::Unauthorized { caller, action })
        }
    }

    pub(super) fn ensure_running(&self) -> Result<(), EngineError> {
        if self.emergency_stop {
            Err(EngineError::EmergencyStopped)
        } else {
            Ok(())
        }
    }

    pub(super) fn allocate_position_id(&mut self) -> Result<PositionId, EngineError> {
        let id = PositionId(self.next_position_id);
        self.next_position_id = self
            .next_position_id
            .checked_add(1)
            .ok_or(EngineError::PositionIdsExhausted)?;
        Ok(id)
    }

    pub(super) fn insert_position(&mut self, position: Position) {
        let ids = self.positions_by_owner.entry(position.owner).or_default();
        // keep opening order when a rolled back position comes back
        let slot = ids.partition_point(|id| *id < position.id);
        ids.insert(slot, position.id);
        self.positions.insert(position.id, position);
    }

    /// Remove a position and its owner index entry together.
    pub(super) fn take_position(&mut self, position_id: PositionId) -> Option<Position> {
        let position = self.positions.remove(&position_id)?;
        if let Some(ids) = self.positions_by_owner.get_mut(&position.owner) {
            ids.retain(|id| *id != position_id);
            if ids.is_empty() {
                self.positions_by_owner.remove(&position.owner);
            }
        }
        Some(position)
    }
}

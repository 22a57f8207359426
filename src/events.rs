// 11.0: every committed state change produces an event. an off-chain indexer can rebuild
// the ledger, the treasury and the feed store from this stream alone, so each payload
// carries the full set of fields for its transition.

use crate::types::{Address, Direction, FeedId, Leverage, PositionId, Price, Timestamp, I256};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),

    // Treasury events
    FeesWithdrawn(FeesWithdrawnEvent),

    // Admin events
    EmergencyStopSet(EmergencyStopSetEvent),
    FeedStatusChanged(FeedStatusChangedEvent),
    MaxLeverageUpdated(MaxLeverageUpdatedEvent),

    // Oracle events
    PriceUpdated(PriceUpdatedEvent),
    UpdaterAuthorized(UpdaterAuthorizedEvent),
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::PositionOpened(_) => "PositionOpened",
            EventPayload::PositionClosed(_) => "PositionClosed",
            EventPayload::PositionLiquidated(_) => "PositionLiquidated",
            EventPayload::FeesWithdrawn(_) => "FeesWithdrawn",
            EventPayload::EmergencyStopSet(_) => "EmergencyStopSet",
            EventPayload::FeedStatusChanged(_) => "FeedStatusChanged",
            EventPayload::MaxLeverageUpdated(_) => "MaxLeverageUpdated",
            EventPayload::PriceUpdated(_) => "PriceUpdated",
            EventPayload::UpdaterAuthorized(_) => "UpdaterAuthorized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub position_id: PositionId,
    pub owner: Address,
    pub feed_id: FeedId,
    pub direction: Direction,
    /// collateral stored on the position, after the platform fee
    pub collateral: U256,
    pub fee: U256,
    pub entry_price: Price,
    pub leverage: Leverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub position_id: PositionId,
    pub owner: Address,
    pub exit_price: Price,
    pub pnl: I256,
    pub payout: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub position_id: PositionId,
    pub owner: Address,
    pub liquidator: Address,
    pub exit_price: Price,
    pub pnl: I256,
    pub reward: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeesWithdrawnEvent {
    pub recipient: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyStopSetEvent {
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedStatusChangedEvent {
    pub feed_id: FeedId,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxLeverageUpdatedEvent {
    pub feed_id: FeedId,
    pub max_leverage: Leverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub feed_id: FeedId,
    pub price: Price,
    pub timestamp: Timestamp,
    pub update_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterAuthorizedEvent {
    pub account: Address,
    pub authorized: bool,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded in-memory event log. oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCollector {
    pub fn new() -> Self {
        Self::with_capacity_limit(100_000)
    }

    pub fn with_capacity_limit(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Stamp a payload with the next id and append it.
    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = self.next_id();
        tracing::debug!(event_id = id.0, event = payload.name(), "event recorded");
        self.emit(Event::new(id, timestamp, payload));
        id
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

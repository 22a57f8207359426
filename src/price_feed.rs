// Price Feed Store
//
// Holds the latest price per feed and who may publish it. The store never judges
// freshness on behalf of the engine: it records when each price was written and the
// engine decides what age it tolerates. Anything that can answer `PriceOracle` can
// stand in for the store (an external oracle network, a test double).

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::events::{EventCollector, EventPayload, PriceUpdatedEvent, UpdaterAuthorizedEvent};
use crate::types::{Address, ErrorKind, FeedId, Price, Timestamp};

/// Latest state of one price series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
    pub id: FeedId,
    pub price: Price,
    pub last_update: Timestamp,
    pub update_count: u64,
}

/// What an oracle answers for a single feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    pub price: Price,
    pub last_update: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceFeedError {
    #[error("Account {0} is not allowed to publish prices")]
    Unauthorized(Address),

    #[error("Price for feed {0} must be non-zero")]
    ZeroPrice(FeedId),

    #[error("Batch length mismatch: {feeds} feed ids, {prices} prices")]
    LengthMismatch { feeds: usize, prices: usize },

    #[error("No price has been published for feed {0}")]
    NoPriceAvailable(FeedId),
}

impl PriceFeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PriceFeedError::Unauthorized(_) => ErrorKind::Authorization,
            PriceFeedError::ZeroPrice(_) | PriceFeedError::LengthMismatch { .. } => {
                ErrorKind::Validation
            }
            PriceFeedError::NoPriceAvailable(_) => ErrorKind::State,
        }
    }
}

/// Read side of a price source. freshness is the caller's business.
pub trait PriceOracle {
    fn get_latest_price(&self, feed_id: &FeedId) -> Result<PriceData, PriceFeedError>;

    /// Batch read. feeds with no price report zero price and zero timestamp.
    fn get_prices(&self, feed_ids: &[FeedId]) -> (Vec<U256>, Vec<Timestamp>) {
        feed_ids
            .iter()
            .map(|id| match self.get_latest_price(id) {
                Ok(data) => (data.price.value(), data.last_update),
                Err(_) => (U256::ZERO, Timestamp::from_secs(0)),
            })
            .unzip()
    }
}

#[derive(Debug, Clone)]
pub struct PriceFeedStore {
    owner: Address,
    authorized_updaters: HashSet<Address>,
    feeds: HashMap<FeedId, PriceFeed>,
    events: EventCollector,
}

impl PriceFeedStore {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            authorized_updaters: HashSet::new(),
            feeds: HashMap::new(),
            events: EventCollector::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_authorized(&self, account: Address) -> bool {
        account == self.owner || self.authorized_updaters.contains(&account)
    }

    fn ensure_updater(&self, caller: Address) -> Result<(), PriceFeedError> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(PriceFeedError::Unauthorized(caller))
        }
    }

    /// Owner only. grants or revokes publishing rights.
    pub fn set_authorized_updater(
        &mut self,
        caller: Address,
        account: Address,
        authorized: bool,
        now: Timestamp,
    ) -> Result<(), PriceFeedError> {
        if caller != self.owner {
            return Err(PriceFeedError::Unauthorized(caller));
        }

        if authorized {
            self.authorized_updaters.insert(account);
        } else {
            self.authorized_updaters.remove(&account);
        }

        tracing::info!(%account, authorized, "price updater authorization changed");
        self.events.record(
            now,
            EventPayload::UpdaterAuthorized(UpdaterAuthorizedEvent {
                account,
                authorized,
            }),
        );
        Ok(())
    }

    /// Publish a price. the feed is created on its first update.
    pub fn update_price(
        &mut self,
        caller: Address,
        feed_id: &FeedId,
        price: U256,
        now: Timestamp,
    ) -> Result<(), PriceFeedError> {
        self.ensure_updater(caller)?;
        let price = Price::new(price).ok_or_else(|| PriceFeedError::ZeroPrice(feed_id.clone()))?;
        self.write_price(feed_id, price, now);
        Ok(())
    }

    /// Publish many prices. zero entries are skipped, the rest are written; the batch
    /// is not atomic. returns how many feeds were written.
    pub fn update_prices(
        &mut self,
        caller: Address,
        feed_ids: &[FeedId],
        prices: &[U256],
        now: Timestamp,
    ) -> Result<usize, PriceFeedError> {
        self.ensure_updater(caller)?;
        if feed_ids.len() != prices.len() {
            return Err(PriceFeedError::LengthMismatch {
                feeds: feed_ids.len(),
                prices: prices.len(),
            });
        }

        let mut written = 0;
        for (feed_id, raw) in feed_ids.iter().zip(prices) {
            match Price::new(*raw) {
                Some(price) => {
                    self.write_price(feed_id, price, now);
                    written += 1;
                }
                None => tracing::debug!(feed = %feed_id, "skipping zero price in batch"),
            }
        }
        Ok(written)
    }

    fn write_price(&mut self, feed_id: &FeedId, price: Price, now: Timestamp) {
        let feed = self
            .feeds
            .entry(feed_id.clone())
            .or_insert_with(|| PriceFeed {
                id: feed_id.clone(),
                price,
                last_update: now,
                update_count: 0,
            });

        feed.price = price;
        feed.last_update = now;
        feed.update_count += 1;
        let update_count = feed.update_count;

        tracing::debug!(feed = %feed_id, %price, update_count, "price published");
        self.events.record(
            now,
            EventPayload::PriceUpdated(PriceUpdatedEvent {
                feed_id: feed_id.clone(),
                price,
                timestamp: now,
                update_count,
            }),
        );
    }

    /// True when no price exists yet or the last one is older than `max_age` seconds.
    pub fn is_stale(&self, feed_id: &FeedId, max_age: u64, now: Timestamp) -> bool {
        match self.feeds.get(feed_id) {
            Some(feed) => now > feed.last_update.plus_secs(max_age),
            None => true,
        }
    }

    pub fn price_feed(&self, feed_id: &FeedId) -> Option<&PriceFeed> {
        self.feeds.get(feed_id)
    }

    pub fn feed_ids(&self) -> Vec<FeedId> {
        let mut ids: Vec<FeedId> = self.feeds.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn events(&self) -> &EventCollector {
        &self.events
    }
}

impl PriceOracle for PriceFeedStore {
    fn get_latest_price(&self, feed_id: &FeedId) -> Result<PriceData, PriceFeedError> {
        self.feeds
            .get(feed_id)
            .map(|feed| PriceData {
                price: feed.price,
                last_update: feed.last_update,
            })
            .ok_or_else(|| PriceFeedError::NoPriceAvailable(feed_id.clone()))
    }
}

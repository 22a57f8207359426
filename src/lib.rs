// margin-core: leveraged position engine over an oracle price feed.
// isolated positions, collateral held in one vault, liquidation by anyone.
// all computation is deterministic: the engine clock is advanced by the caller.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: FeedId, Direction, Price, Leverage, Bps, Timestamp
//   3.x  fees.rs: platform fee split and the treasury accumulator
//   4.x  position.rs: position record, fixed-point pnl
//   6.x  liquidation.rs: 80% loss threshold, liquidator reward
//   7.x  config.rs: fees, liquidation, staleness windows, leverage caps
//   8.x  engine/: core engine: positions, liquidations, pricing, admin
//   9.x  price_feed.rs: authorized price publishing, oracle trait
//   9.2  custody.rs: collateral token trait + in-memory ledger
//   11.x events.rs: state transition events for indexers

// core trading modules
pub mod engine;
pub mod events;
pub mod fees;
pub mod liquidation;
pub mod position;
pub mod types;

// integration modules
pub mod config;
pub mod custody;
pub mod price_feed;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use fees::*;
pub use liquidation::*;
pub use position::*;
pub use types::*;
pub use config::{ConfigError, TradingConfig};
pub use custody::{CollateralToken, CustodyError, CustodyLedger};
pub use price_feed::{PriceData, PriceFeed, PriceFeedError, PriceFeedStore, PriceOracle};

// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::custody::CustodyError;
use crate::fees::FeeError;
use crate::position::PnlError;
use crate::price_feed::PriceFeedError;
use crate::types::{Address, ErrorKind, FeedId, Leverage, PositionId, Price, Timestamp, I256};
use alloy_primitives::U256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseResult {
    pub position_id: PositionId,
    pub exit_price: Price,
    pub pnl: I256,
    pub payout: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationResult {
    pub position_id: PositionId,
    pub owner: Address,
    pub liquidator: Address,
    pub exit_price: Price,
    pub pnl: I256,
    pub reward: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Emergency stop is active")]
    EmergencyStopped,

    #[error("Caller {caller} is not allowed to {action}")]
    Unauthorized { caller: Address, action: &'static str },

    #[error("Caller {caller} does not own position {position_id}")]
    NotPositionOwner { position_id: PositionId, caller: Address },

    #[error("Collateral must be positive")]
    ZeroCollateral,

    #[error("Collateral {collateral} leaves nothing after the {fee} platform fee")]
    CollateralBelowFee { collateral: U256, fee: U256 },

    #[error("Feed {0} is not active")]
    FeedInactive(FeedId),

    #[error("Leverage {leverage} outside [{min}, {max}]")]
    LeverageOutOfRange { leverage: Leverage, min: Leverage, max: Leverage },

    #[error("Price for {feed_id} last updated at {last_update} is too old at {now} (max age {max_age}s)")]
    StalePrice {
        feed_id: FeedId,
        last_update: Timestamp,
        now: Timestamp,
        max_age: u64,
    },

    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Position {position_id} is not liquidatable (loss {loss_pct}%)")]
    NotLiquidatable { position_id: PositionId, loss_pct: U256 },

    #[error("Position id space exhausted")]
    PositionIdsExhausted,

    #[error("Price feed error: {0}")]
    PriceFeed(#[from] PriceFeedError),

    #[error("PnL error: {0}")]
    Pnl(#[from] PnlError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmergencyStopped => ErrorKind::EmergencyStop,
            EngineError::Unauthorized { .. } | EngineError::NotPositionOwner { .. } => {
                ErrorKind::Authorization
            }
            EngineError::ZeroCollateral
            | EngineError::CollateralBelowFee { .. }
            | EngineError::FeedInactive(_)
            | EngineError::LeverageOutOfRange { .. }
            | EngineError::Config(_) => ErrorKind::Validation,
            EngineError::StalePrice { .. } => ErrorKind::Staleness,
            EngineError::PositionNotFound(_)
            | EngineError::NotLiquidatable { .. }
            | EngineError::PositionIdsExhausted
            | EngineError::Custody(_) => ErrorKind::State,
            EngineError::PriceFeed(e) => e.kind(),
            EngineError::Pnl(e) => e.kind(),
            EngineError::Fee(e) => e.kind(),
        }
    }
}

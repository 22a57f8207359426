// 8.0: margin engine. owns the position ledger and coordinates oracle reads,
// custody transfers, fee accrual and liquidation.
// deterministic and event-driven: the clock is set by the caller, never read from the OS.

mod admin;
mod config;
mod core;
mod liquidations;
mod positions;
mod pricing;
mod results;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{CloseResult, EngineError, LiquidationResult};

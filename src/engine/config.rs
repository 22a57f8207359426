//! Engine configuration options.

use crate::config::TradingConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Fee, liquidation, staleness and leverage parameters.
    pub trading: TradingConfig,
}

impl EngineConfig {
    pub fn new(trading: TradingConfig) -> Self {
        Self {
            trading,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            trading: TradingConfig::default(),
        }
    }
}

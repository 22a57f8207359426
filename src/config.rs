// 7.0 config.rs: every trading constant in one place. fees, liquidation, staleness, leverage caps.
// 7.1 defaults reproduce the deployed contract; presets only exist for test networks.

use serde::{Deserialize, Serialize};

use crate::liquidation::LiquidationParams;
use crate::types::{Bps, Leverage, LEVERAGE_PRECISION};

/** 7.2: trading parameters. fees in bps, windows in seconds, leverage in 1e4 units */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    // Platform fee charged on gross collateral at open
    pub platform_fee_bps: u32,
    // Loss, in whole percent of collateral, at which a position becomes liquidatable
    pub liquidation_threshold_pct: u64,
    // Liquidator reward on the stored collateral
    pub liquidator_reward_bps: u32,
    // Oldest price open/close will accept
    pub max_price_age_secs: u64,
    // Oldest price liquidation will accept
    pub liquidation_max_price_age_secs: u64,
    // Leverage cap for feeds without an override
    pub default_max_leverage: u64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: 50,                  // 0.5%
            liquidation_threshold_pct: 80,         // 80% of collateral lost
            liquidator_reward_bps: 10,             // 0.1%
            max_price_age_secs: 5 * 60,            // 5 minutes
            liquidation_max_price_age_secs: 10 * 60, // 10 minutes
            default_max_leverage: 1000 * LEVERAGE_PRECISION, // 1000x
        }
    }
}

impl TradingConfig {
    // Looser windows for networks with slow keepers
    pub fn testnet() -> Self {
        Self {
            max_price_age_secs: 15 * 60,
            liquidation_max_price_age_secs: 30 * 60,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // fee checks
        if self.platform_fee_bps >= 10_000 {
            return Err(ConfigError::InvalidFees {
                reason: "Platform fee must be below 100%".to_string(),
            });
        }
        if self.liquidator_reward_bps > 10_000 {
            return Err(ConfigError::InvalidFees {
                reason: "Liquidator reward cannot exceed the collateral".to_string(),
            });
        }

        // liquidation checks
        if self.liquidation_threshold_pct == 0 || self.liquidation_threshold_pct > 100 {
            return Err(ConfigError::InvalidLiquidation {
                reason: "Threshold must be between 1 and 100 percent".to_string(),
            });
        }

        // staleness checks
        if self.max_price_age_secs == 0 {
            return Err(ConfigError::InvalidStaleness {
                reason: "Price age window must be positive".to_string(),
            });
        }
        if self.liquidation_max_price_age_secs < self.max_price_age_secs {
            return Err(ConfigError::InvalidStaleness {
                reason: "Liquidation window cannot be tighter than the trading window".to_string(),
            });
        }

        // leverage checks
        if self.default_max_leverage < LEVERAGE_PRECISION {
            return Err(ConfigError::InvalidLeverage {
                reason: "Default max leverage must be at least 1x".to_string(),
            });
        }

        Ok(())
    }

    pub fn platform_fee(&self) -> Bps {
        Bps::new(self.platform_fee_bps)
    }

    pub fn default_max_leverage(&self) -> Leverage {
        Leverage::from_raw(self.default_max_leverage)
    }

    pub fn liquidation_params(&self) -> LiquidationParams {
        LiquidationParams {
            threshold_pct: self.liquidation_threshold_pct,
            reward_rate: Bps::new(self.liquidator_reward_bps),
        }
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("Invalid liquidation settings: {reason}")]
    InvalidLiquidation { reason: String },

    #[error("Invalid staleness windows: {reason}")]
    InvalidStaleness { reason: String },

    #[error("Invalid leverage settings: {reason}")]
    InvalidLeverage { reason: String },

    #[error("Could not parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = TradingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.platform_fee_bps, 50);
        assert_eq!(config.default_max_leverage().raw(), 10_000_000);
    }

    #[test]
    fn test_testnet_config_valid() {
        let config = TradingConfig::testnet();
        assert!(config.validate().is_ok());
        assert_eq!(config.platform_fee_bps, 50);
        assert!(config.max_price_age_secs > TradingConfig::default().max_price_age_secs);
    }

    #[test]
    fn test_liquidation_params() {
        let params = TradingConfig::default().liquidation_params();
        assert_eq!(params, LiquidationParams::default());
    }

    #[test]
    fn test_invalid_fee() {
        let config = TradingConfig {
            platform_fee_bps: 10_000,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFees { .. })));
    }

    #[test]
    fn test_invalid_windows() {
        let config = TradingConfig {
            liquidation_max_price_age_secs: 60,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidStaleness { .. })));
    }

    #[test]
    fn test_invalid_threshold() {
        let config = TradingConfig {
            liquidation_threshold_pct: 101,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLiquidation { .. })));
    }

    #[test]
    fn test_invalid_leverage() {
        let config = TradingConfig {
            default_max_leverage: 9_999,
            ..TradingConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLeverage { .. })));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TradingConfig::from_json_str(r#"{ "platform_fee_bps": 30 }"#).unwrap();
        assert_eq!(config.platform_fee_bps, 30);
        assert_eq!(config.liquidation_threshold_pct, 80);

        let err = TradingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = TradingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TradingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

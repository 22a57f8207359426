// 1.0: all the primitives live here. nothing in the engine works without these types.
// ids, feed keys, prices, leverage, basis points, timestamps. each is a newtype so the
// compiler catches type mixups between a 1e18 price and a 1e4 leverage.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::{Address, I256};

/// 1e18. scale of prices and of the intermediate percentage terms in pnl math.
pub const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// 1e4. 1x leverage is 10_000 raw units.
pub const LEVERAGE_PRECISION: u64 = 10_000;

pub const BPS_DENOMINATOR: u64 = 10_000;

const PRICE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.1: name of a price series, e.g. "ETH/USD".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedId(String);

impl FeedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeedId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("long"),
            Direction::Short => f.write_str("short"),
        }
    }
}

// 1.2: oracle price, 1e18 fixed point. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(U256);

impl Price {
    #[must_use]
    pub fn new(value: U256) -> Option<Self> {
        if value.is_zero() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn new_unchecked(value: U256) -> Self {
        debug_assert!(!value.is_zero());
        Self(value)
    }

    /// Whole quote units, so `from_units(2000)` is 2000e18 raw.
    pub fn from_units(units: u64) -> Self {
        Self::new_unchecked(U256::from(units) * PRECISION)
    }

    /// Human decimal to 1e18 fixed point. digits past the 18th are truncated.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() {
            return None;
        }
        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let scale = value.scale();
        let raw = if scale <= PRICE_DECIMALS {
            mantissa.checked_mul(pow10(PRICE_DECIMALS - scale))?
        } else {
            mantissa / pow10(scale - PRICE_DECIMALS)
        };
        Self::new(raw)
    }

    pub fn value(&self) -> U256 {
        self.0
    }

    /// Back to a human decimal. `None` when the raw value exceeds what `Decimal` can hold.
    pub fn to_decimal(&self) -> Option<Decimal> {
        let raw = u128::try_from(self.0).ok()?;
        let raw = i128::try_from(raw).ok()?;
        Decimal::try_from_i128_with_scale(raw, PRICE_DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{}", d),
            None => write!(f, "{}e-18", self.0),
        }
    }
}

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

// 1.3: leverage multiplier in 1e4 units. range checks live in the engine
// because the cap depends on the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Leverage(u64);

impl Leverage {
    pub const ONE_X: Leverage = Leverage(LEVERAGE_PRECISION);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Whole multiplier, so `from_multiplier(5)` is 50_000 raw.
    pub fn from_multiplier(multiplier: u64) -> Self {
        Self(multiplier.saturating_mul(LEVERAGE_PRECISION))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(LEVERAGE_PRECISION)
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_decimal().normalize())
    }
}

// 1.4: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    /// `amount * bps / 10_000`, floored. `None` on overflow.
    pub fn apply(&self, amount: U256) -> Option<U256> {
        amount
            .checked_mul(U256::from(self.0))
            .map(|scaled| scaled / U256::from(BPS_DENOMINATOR))
    }
}

// 1.5: second resolution timestamp, same unit as a block timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Calendar view of the clock for logs and reports. `None` past chrono's range.
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        chrono::DateTime::from_timestamp(secs, 0)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `self` until `now`. `None` if `self` lies in the future.
    pub fn age_at(&self, now: Timestamp) -> Option<u64> {
        now.0.checked_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Coarse error taxonomy every component error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// zero or invalid amount, out of range leverage, length mismatch
    Validation,
    /// non-owner admin call or non-owner position action
    Authorization,
    /// position missing or already settled, not liquidatable
    State,
    /// oracle price older than the operation allows
    Staleness,
    /// blocked by the global emergency stop
    EmergencyStop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn precision_constant() {
        assert_eq!(PRECISION, U256::from(10u64).pow(U256::from(18)));
    }

    #[test]
    fn price_decimal_conversion() {
        let price = Price::from_decimal(dec!(2000.5)).unwrap();
        assert_eq!(price.value(), U256::from(20005u64) * PRECISION / U256::from(10u64));
        assert_eq!(price.to_decimal(), Some(dec!(2000.5)));
        assert_eq!(Price::from_units(2000).to_string(), "2000");

        assert!(Price::from_decimal(dec!(0)).is_none());
        assert!(Price::from_decimal(dec!(-1)).is_none());
    }

    #[test]
    fn leverage_units() {
        assert_eq!(Leverage::from_multiplier(5).raw(), 50_000);
        assert_eq!(Leverage::ONE_X.raw(), LEVERAGE_PRECISION);
        assert_eq!(Leverage::from_raw(25_000).to_string(), "2.5x");
    }

    #[test]
    fn bps_apply_floors() {
        let half_percent = Bps::new(50);
        assert_eq!(half_percent.as_fraction(), dec!(0.005));
        assert_eq!(half_percent.apply(U256::from(100u64)), Some(U256::ZERO)); // 0.5 floors
        assert_eq!(half_percent.apply(U256::from(10_000u64)), Some(U256::from(50u64)));
        assert_eq!(half_percent.apply(U256::MAX), None);
    }

    #[test]
    fn timestamp_age() {
        let updated = Timestamp::from_secs(1_000);
        assert_eq!(updated.age_at(Timestamp::from_secs(1_300)), Some(300));
        assert_eq!(updated.age_at(Timestamp::from_secs(999)), None);
    }

    #[test]
    fn timestamp_calendar_view() {
        let ts = Timestamp::from_secs(1_700_000_000);
        assert_eq!(ts.to_datetime().unwrap().to_rfc3339(), "2023-11-14T22:13:20+00:00");
        assert!(Timestamp::from_secs(u64::MAX).to_datetime().is_none());
    }
}

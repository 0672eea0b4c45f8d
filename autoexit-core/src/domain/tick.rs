//! Price ticks: the discretized price unit used for range bounds and the
//! oracle's current price.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lowest tick a concentrated-liquidity pool can report.
pub const MIN_TICK: i32 = -887_272;

/// Highest tick a concentrated-liquidity pool can report.
pub const MAX_TICK: i32 = 887_272;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("tick {0} is outside [{MIN_TICK}, {MAX_TICK}]")]
    OutOfBounds(i64),
}

/// A validated price tick in `[MIN_TICK, MAX_TICK]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Tick(i32);

impl Tick {
    pub const MIN: Tick = Tick(MIN_TICK);
    pub const MAX: Tick = Tick(MAX_TICK);
    pub const ZERO: Tick = Tick(0);

    pub fn new(value: i32) -> Result<Self, TickError> {
        if (MIN_TICK..=MAX_TICK).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TickError::OutOfBounds(value as i64))
        }
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// Shift the tick by `delta`, failing if the result leaves the valid domain.
    pub fn offset(self, delta: i64) -> Result<Self, TickError> {
        let shifted = self.0 as i64 + delta;
        i32::try_from(shifted)
            .map_err(|_| TickError::OutOfBounds(shifted))
            .and_then(Tick::new)
    }
}

impl TryFrom<i32> for Tick {
    type Error = TickError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Tick::new(value)
    }
}

impl From<Tick> for i32 {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds_inclusive() {
        assert_eq!(Tick::new(MIN_TICK).unwrap(), Tick::MIN);
        assert_eq!(Tick::new(MAX_TICK).unwrap(), Tick::MAX);
        assert_eq!(Tick::new(0).unwrap(), Tick::ZERO);
    }

    #[test]
    fn rejects_out_of_bounds() {
        assert_eq!(
            Tick::new(MAX_TICK + 1),
            Err(TickError::OutOfBounds(MAX_TICK as i64 + 1))
        );
        assert!(Tick::new(MIN_TICK - 1).is_err());
    }

    #[test]
    fn offset_stays_in_domain() {
        let t = Tick::new(79_700).unwrap();
        assert_eq!(t.offset(-100).unwrap().get(), 79_600);
        assert!(Tick::MAX.offset(1).is_err());
        assert!(Tick::MIN.offset(i64::MIN / 2).is_err());
    }

    #[test]
    fn ordering_follows_price() {
        let low = Tick::new(79_000).unwrap();
        let high = Tick::new(80_500).unwrap();
        assert!(low < high);
    }

    #[test]
    fn deserialize_rejects_invalid_tick() {
        let ok: Tick = serde_json::from_str("80000").unwrap();
        assert_eq!(ok.get(), 80_000);
        assert!(serde_json::from_str::<Tick>("900000").is_err());
    }
}

//! Settlement math for simulated positions.
//!
//! A single-sided position holds only base above its range, converts linearly
//! to quote while the price moves through the range, and holds only quote
//! once the price is at or below the lower bound.

use crate::domain::Tick;
use serde::{Deserialize, Serialize};

/// How much quote the converted base is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceedsModel {
    /// A full conversion of the position yields exactly `amount` quote; partial
    /// conversions yield the proportional share.
    Fixed { amount: u128 },
    /// Each converted base unit yields `numerator / denominator` quote.
    Ratio { numerator: u128, denominator: u128 },
}

impl Default for ProceedsModel {
    fn default() -> Self {
        ProceedsModel::Ratio {
            numerator: 1,
            denominator: 1,
        }
    }
}

impl ProceedsModel {
    /// Quote owed for `converted` of a position that held `principal` base.
    pub fn quote_for(&self, converted: u128, principal: u128) -> u128 {
        match *self {
            ProceedsModel::Fixed { amount } => {
                if principal == 0 {
                    0
                } else {
                    mul_div(amount, converted, principal)
                }
            }
            ProceedsModel::Ratio {
                numerator,
                denominator,
            } => {
                if denominator == 0 {
                    0
                } else {
                    mul_div(converted, numerator, denominator)
                }
            }
        }
    }
}

/// Base units converted out of `principal` with the price at `tick`.
pub fn converted_base(principal: u128, lower: Tick, upper: Tick, tick: Tick) -> u128 {
    if tick <= lower {
        return principal;
    }
    if tick >= upper {
        return 0;
    }
    let span = (upper.get() as i64 - lower.get() as i64) as u128;
    let crossed = (upper.get() as i64 - tick.get() as i64) as u128;
    mul_div(principal, crossed, span)
}

/// `a * b / d`, rounding down, without overflowing on large `a * b`.
pub(crate) fn mul_div(a: u128, b: u128, d: u128) -> u128 {
    match a.checked_mul(b) {
        Some(product) => product / d,
        None => (a / d).saturating_mul(b) + (a % d).saturating_mul(b) / d,
    }
}

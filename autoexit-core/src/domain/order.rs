//! The range order record and the parameters used to open one.

use super::ids::{AssetId, FeeTier, PositionHandle};
use super::tick::Tick;
use serde::{Deserialize, Serialize};

/// Controller-wide lifecycle state.
///
/// `Idle` is both the initial and the terminal state; there is exactly one
/// live order at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// No order open. `open_order` is accepted, `execute_upkeep` is a no-op.
    Idle,
    /// An order is open and waiting for the price to cross below its target.
    Active,
}

/// A proposed order as submitted by the owner.
///
/// Ticks are raw integers here: range ordering is checked before the bounds
/// of the tick domain so that an inverted range always reports as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrderParams {
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    pub fee_tier: FeeTier,
    pub committed_amount: u128,
    pub lower_tick: i32,
    pub upper_tick: i32,
}

/// The singleton order record owned by the controller.
///
/// Populated by the opener, read by the evaluator, and closed by the executor.
/// After an exit the descriptive fields keep the last order's values for
/// observers; only `is_active` and `position` are reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOrder {
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    pub fee_tier: FeeTier,
    pub committed_amount: u128,
    pub lower_tick: Tick,
    pub upper_tick: Tick,
    /// Trigger price. Set to `lower_tick` at open: crossing below it means the
    /// position has fully converted into the quote asset.
    pub target_tick: Tick,
    pub position: Option<PositionHandle>,
    /// Liquidity units the issuer reported for the position.
    pub liquidity: u128,
    pub is_active: bool,
    /// Ledger sequence number of the transaction that opened the order.
    pub opened_seq: u64,
}

impl RangeOrder {
    /// Build an active order from validated inputs. The position handle is
    /// attached separately once the issuer has returned it.
    pub fn activate(params: &OpenOrderParams, lower: Tick, upper: Tick, seq: u64) -> Self {
        debug_assert!(lower < upper, "range must be validated before activation");
        Self {
            base_asset: params.base_asset.clone(),
            quote_asset: params.quote_asset.clone(),
            fee_tier: params.fee_tier,
            committed_amount: params.committed_amount,
            lower_tick: lower,
            upper_tick: upper,
            target_tick: lower,
            position: None,
            liquidity: 0,
            is_active: true,
            opened_seq: seq,
        }
    }

    pub fn status(&self) -> OrderStatus {
        if self.is_active {
            OrderStatus::Active
        } else {
            OrderStatus::Idle
        }
    }

    /// The live position, if the order is active and the issuer has already
    /// returned a handle for it.
    pub fn live_position(&self) -> Option<PositionHandle> {
        if self.is_active {
            self.position
        } else {
            None
        }
    }

    /// The trigger condition shared by the evaluator and the executor.
    ///
    /// Strictly below the target triggers; at or above it (inside the range or
    /// above it) does not.
    pub fn is_triggered_at(&self, tick: Tick) -> bool {
        self.live_position().is_some() && tick < self.target_tick
    }

    /// Whether `tick` lies inside `[lower_tick, upper_tick]`.
    pub fn contains(&self, tick: Tick) -> bool {
        self.lower_tick <= tick && tick <= self.upper_tick
    }

    /// Close the order, returning the position that must now be liquidated.
    pub fn close(&mut self) -> Option<PositionHandle> {
        let position = self.live_position();
        self.is_active = false;
        self.position = None;
        position
    }
}

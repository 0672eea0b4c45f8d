//! `evaluate_upkeep`: the read-only trigger check polled by keepers.

use super::AutoExitController;
use crate::collab::PriceOracle;
use crate::domain::{UpkeepCheck, UpkeepPayload};
use tracing::{debug, warn};

impl AutoExitController {
    /// Report whether the live order should be exited now.
    ///
    /// Never mutates anything. The `hint` is accepted for interface
    /// compatibility and ignored. An unreadable oracle reads as "not
    /// triggered".
    pub fn evaluate_upkeep<O>(&self, oracle: &O, hint: &[u8]) -> UpkeepCheck
    where
        O: PriceOracle + ?Sized,
    {
        let order = self.current_order();
        let Some(position) = order.live_position() else {
            debug!(target: "autoexit::evaluator", hint_len = hint.len(), "no live order");
            return UpkeepCheck::idle();
        };

        let tick = match oracle.current_tick(&order.base_asset, &order.quote_asset, order.fee_tier) {
            Ok(tick) => tick,
            Err(err) => {
                warn!(target: "autoexit::evaluator", %position, error = %err, "oracle read failed");
                return UpkeepCheck::idle();
            }
        };

        let triggered = order.is_triggered_at(tick);
        debug!(
            target: "autoexit::evaluator",
            %position,
            %tick,
            target = %order.target_tick,
            triggered,
            "evaluated"
        );
        if triggered {
            UpkeepCheck::triggered(&UpkeepPayload {
                position,
                observed_tick: tick,
            })
        } else {
            UpkeepCheck::idle()
        }
    }
}

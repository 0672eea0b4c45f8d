//! `execute_upkeep`: permissionless exit.
//!
//! The caller's payload is only a hint. The trigger is re-derived from the
//! order record and a fresh oracle read, the order is closed, and only then
//! are the issuer and asset contracts called.

use super::{AutoExitController, ControllerError, ExitReceipt, NoUpkeepReason, TxContext};
use crate::collab::Environment;
use crate::domain::{LifecycleEvent, UpkeepPayload};
use crate::lock;
use tracing::{debug, info};

impl AutoExitController {
    /// Liquidate the position and forward the quote proceeds to the owner.
    ///
    /// Fails with [`ControllerError::NoUpkeepNeeded`] when there is no live
    /// order or the price is not below the target any more. Any collaborator
    /// failure rolls the whole exit back and leaves the order active.
    pub fn execute_upkeep<E>(
        &self,
        env: &E,
        tx: &TxContext,
        payload: &[u8],
    ) -> Result<ExitReceipt, ControllerError>
    where
        E: Environment + ?Sized,
    {
        self.transact(env, "execute_upkeep", || self.execute_in_tx(env, tx, payload))
    }

    fn execute_in_tx<E>(
        &self,
        env: &E,
        tx: &TxContext,
        payload: &[u8],
    ) -> Result<ExitReceipt, ControllerError>
    where
        E: Environment + ?Sized,
    {
        match UpkeepPayload::decode(payload) {
            Ok(hint) => debug!(
                target: "autoexit::executor",
                caller = %tx.caller,
                hinted_position = %hint.position,
                hinted_tick = %hint.observed_tick,
                "upkeep requested"
            ),
            Err(err) => debug!(
                target: "autoexit::executor",
                caller = %tx.caller,
                error = %err,
                "upkeep requested with unreadable hint"
            ),
        }

        let order = self.current_order();
        let Some(position) = order.live_position() else {
            return Err(ControllerError::NoUpkeepNeeded(NoUpkeepReason::NoActiveOrder));
        };

        let tick = env.current_tick(&order.base_asset, &order.quote_asset, order.fee_tier)?;
        if !order.is_triggered_at(tick) {
            return Err(ControllerError::NoUpkeepNeeded(
                NoUpkeepReason::AboveTarget {
                    tick,
                    target: order.target_tick,
                },
            ));
        }

        // Close before any outbound call.
        {
            let mut current = lock(&self.order);
            if current.live_position() != Some(position) {
                return Err(ControllerError::NoUpkeepNeeded(NoUpkeepReason::NoActiveOrder));
            }
            current.close();
        }

        let drained = env.decrease_liquidity(position, order.liquidity)?;
        let collected = env.collect(position, &self.account)?;
        debug!(
            target: "autoexit::executor",
            %position,
            drained_base = drained.base,
            drained_quote = drained.quote,
            collected_base = collected.base,
            collected_quote = collected.quote,
            "position liquidated"
        );

        let quote_disbursed = env.balance_of(&order.quote_asset, &self.account);
        if quote_disbursed > 0 {
            env.transfer(&order.quote_asset, &self.account, &self.owner, quote_disbursed)?;
        }

        let mut base_disbursed = 0;
        if self.config.sweep_residual_base {
            base_disbursed = env.balance_of(&order.base_asset, &self.account);
            if base_disbursed > 0 {
                env.transfer(&order.base_asset, &self.account, &self.owner, base_disbursed)?;
            }
        }

        self.record(LifecycleEvent::UpkeepPerformed {
            seq: tx.seq,
            caller: tx.caller.clone(),
            position,
            observed_tick: tick,
            quote_disbursed,
            base_disbursed,
        });
        info!(
            target: "autoexit::executor",
            seq = tx.seq,
            caller = %tx.caller,
            %position,
            %tick,
            quote_disbursed,
            base_disbursed,
            "order exited"
        );

        Ok(ExitReceipt {
            position,
            observed_tick: tick,
            collected,
            quote_disbursed,
            base_disbursed,
        })
    }
}

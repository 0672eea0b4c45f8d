//! `open_order`: validate, record the order, then pull the deposit and open
//! the position.
//!
//! The order is committed as active (without a position handle) before the
//! first external call, so a collaborator re-entering `open_order` sees
//! `OrderAlreadyActive` and one re-entering `execute_upkeep` sees no live
//! position.

use super::{guards, AutoExitController, ControllerError, TxContext};
use crate::collab::{Environment, OpenPositionRequest};
use crate::domain::{LifecycleEvent, OpenOrderParams, PositionHandle, RangeOrder};
use crate::lock;
use tracing::{debug, info};

impl AutoExitController {
    /// Open a new range order with the caller's base asset.
    ///
    /// The owner must have approved the controller for `committed_amount` of
    /// `base_asset`. All-or-nothing: on any error the order stays idle and no
    /// asset has moved.
    pub fn open_order<E>(
        &self,
        env: &E,
        tx: &TxContext,
        params: &OpenOrderParams,
    ) -> Result<PositionHandle, ControllerError>
    where
        E: Environment + ?Sized,
    {
        self.transact(env, "open_order", || self.open_in_tx(env, tx, params))
    }

    fn open_in_tx<E>(
        &self,
        env: &E,
        tx: &TxContext,
        params: &OpenOrderParams,
    ) -> Result<PositionHandle, ControllerError>
    where
        E: Environment + ?Sized,
    {
        let range = {
            let mut order = lock(&self.order);
            let range = guards::admit(params, &tx.caller, &self.owner, &order)?;
            *order = RangeOrder::activate(params, range.lower, range.upper, tx.seq);
            range
        };
        debug!(
            target: "autoexit::opener",
            seq = tx.seq,
            lower = %range.lower,
            upper = %range.upper,
            amount = params.committed_amount,
            "order admitted"
        );

        let amount = params.committed_amount;
        env.transfer_from(
            &params.base_asset,
            &self.account,
            &self.owner,
            &self.account,
            amount,
        )?;

        let issuer = env.issuer_account();
        env.approve(&params.base_asset, &self.account, &issuer, amount)?;

        let receipt = env.open_position(&OpenPositionRequest {
            payer: self.account.clone(),
            base_asset: params.base_asset.clone(),
            quote_asset: params.quote_asset.clone(),
            fee_tier: params.fee_tier,
            lower_tick: range.lower,
            upper_tick: range.upper,
            base_amount: amount,
        })?;

        {
            let mut order = lock(&self.order);
            order.position = Some(receipt.position);
            order.liquidity = receipt.liquidity;
        }
        self.record(LifecycleEvent::OrderOpened {
            seq: tx.seq,
            position: receipt.position,
            committed_amount: amount,
            liquidity: receipt.liquidity,
            lower_tick: range.lower,
            upper_tick: range.upper,
            target_tick: range.lower,
        });

        info!(
            target: "autoexit::opener",
            seq = tx.seq,
            position = %receipt.position,
            liquidity = receipt.liquidity,
            base = %params.base_asset,
            quote = %params.quote_asset,
            "order opened"
        );
        Ok(receipt.position)
    }
}

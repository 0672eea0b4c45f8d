//! Serialized runtime around one controller and its environment.
//!
//! The ledger is the only way the runner drives the controller. Mutating
//! entrypoints take `&mut self`, so calls are totally ordered; each gets the
//! next sequence number and a [`TxContext`] naming its caller. Re-entrant
//! calls made by collaborators during a call run inside that call's
//! transaction.

use crate::collab::Environment;
use crate::controller::{AutoExitController, ControllerError, ExitReceipt, TxContext};
use crate::domain::{
    AccountId, LifecycleEvent, OpenOrderParams, PositionHandle, RangeOrder, UpkeepCheck,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entrypoint {
    OpenOrder,
    ExecuteUpkeep,
}

/// One entry of the transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub seq: u64,
    pub caller: AccountId,
    pub entrypoint: Entrypoint,
    /// `None` when the transaction committed.
    pub error: Option<String>,
}

impl TxRecord {
    pub fn committed(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Ledger<E> {
    controller: Arc<AutoExitController>,
    env: E,
    next_seq: u64,
    history: Vec<TxRecord>,
}

impl<E: Environment> Ledger<E> {
    pub fn new(controller: Arc<AutoExitController>, env: E) -> Self {
        Self {
            controller,
            env,
            next_seq: 1,
            history: Vec::new(),
        }
    }

    pub fn controller(&self) -> &Arc<AutoExitController> {
        &self.controller
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    /// Sequence number the next mutating call will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn history(&self) -> &[TxRecord] {
        &self.history
    }

    pub fn open_order(
        &mut self,
        caller: &AccountId,
        params: &OpenOrderParams,
    ) -> Result<PositionHandle, ControllerError> {
        let tx = self.begin(caller);
        let result = self.controller.open_order(&self.env, &tx, params);
        self.finish(tx, Entrypoint::OpenOrder, result.as_ref().err());
        result
    }

    /// Read-only; does not consume a sequence number.
    pub fn evaluate_upkeep(&self, hint: &[u8]) -> UpkeepCheck {
        self.controller.evaluate_upkeep(&self.env, hint)
    }

    pub fn execute_upkeep(
        &mut self,
        caller: &AccountId,
        payload: &[u8],
    ) -> Result<ExitReceipt, ControllerError> {
        let tx = self.begin(caller);
        let result = self.controller.execute_upkeep(&self.env, &tx, payload);
        self.finish(tx, Entrypoint::ExecuteUpkeep, result.as_ref().err());
        result
    }

    pub fn current_order(&self) -> RangeOrder {
        self.controller.current_order()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.controller.events()
    }

    fn begin(&mut self, caller: &AccountId) -> TxContext {
        let tx = TxContext::new(caller.clone(), self.next_seq);
        self.next_seq += 1;
        tx
    }

    fn finish(&mut self, tx: TxContext, entrypoint: Entrypoint, error: Option<&ControllerError>) {
        debug!(
            target: "autoexit::ledger",
            seq = tx.seq,
            caller = %tx.caller,
            ?entrypoint,
            committed = error.is_none(),
            "transaction finished"
        );
        self.history.push(TxRecord {
            seq: tx.seq,
            caller: tx.caller,
            entrypoint,
            error: error.map(ToString::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::AssetLedger;
    use crate::controller::ControllerConfig;
    use crate::domain::{AssetId, FeeTier, Tick};
    use crate::sim::SimMarket;

    #[test]
    fn numbers_transactions_and_records_outcomes() {
        let owner = AccountId::new("owner");
        let keeper = AccountId::new("keeper");
        let base = AssetId::new("USDC");
        let quote = AssetId::new("WETH");
        let controller = Arc::new(AutoExitController::new(
            AccountId::new("controller"),
            owner.clone(),
            ControllerConfig::default(),
        ));
        let market = SimMarket::default();
        market.mint(&base, &owner, 3000);
        market
            .approve(&base, &owner, controller.account(), 3000)
            .unwrap();
        market.set_tick(&base, &quote, FeeTier::MEDIUM, Tick::new(80_500).unwrap());

        let mut ledger = Ledger::new(controller, market);
        let params = OpenOrderParams {
            base_asset: base.clone(),
            quote_asset: quote.clone(),
            fee_tier: FeeTier::MEDIUM,
            committed_amount: 3000,
            lower_tick: 79_700,
            upper_tick: 80_000,
        };
        ledger.open_order(&owner, &params).unwrap();
        assert!(ledger.execute_upkeep(&keeper, &[]).is_err());

        ledger
            .env()
            .set_tick(&base, &quote, FeeTier::MEDIUM, Tick::new(79_000).unwrap());
        assert!(ledger.evaluate_upkeep(&[]).triggered);
        ledger.execute_upkeep(&keeper, &[]).unwrap();

        let seqs: Vec<u64> = ledger.history().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(ledger.history()[0].committed());
        assert!(!ledger.history()[1].committed());
        assert_eq!(ledger.history()[2].entrypoint, Entrypoint::ExecuteUpkeep);
        assert_eq!(ledger.next_seq(), 4);

        let events = ledger.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq(), 1);
        assert_eq!(events[1].seq(), 3);
        assert!(!ledger.current_order().is_active);
    }
}

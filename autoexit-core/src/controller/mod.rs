//! The AutoExit controller: one range order at a time, opened by its owner and
//! closed by any keeper once the price crosses below the target.
//!
//! Entrypoints:
//! - [`AutoExitController::open_order`]: owner deposits base and opens the position
//! - [`AutoExitController::evaluate_upkeep`]: read-only trigger check
//! - [`AutoExitController::execute_upkeep`]: permissionless exit and payout
//! - [`AutoExitController::current_order`]: snapshot of the order record
//!
//! Every mutating entrypoint runs inside `transact`: on
//! any error the controller restores its own record and asks the environment
//! to roll back every collaborator effect of the call.
//!
//! The controller holds no lock while calling out. Collaborators may call back
//! into any entrypoint before they return; those re-entrant calls observe the
//! state already committed by the outer call and are rejected by the usual
//! checks (`OrderAlreadyActive`, `NoUpkeepNeeded`).

pub mod error;
mod evaluator;
mod executor;
pub mod guards;
mod opener;

pub use error::{ControllerError, NoUpkeepReason};

use crate::collab::{PairAmounts, Transactional};
use crate::domain::{AccountId, LifecycleEvent, PositionHandle, RangeOrder, Tick};
use crate::lock;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Static controller settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// On exit, also forward any base asset the position returned (a partial
    /// fill near the boundary) to the owner instead of leaving it with the
    /// controller.
    #[serde(default)]
    pub sweep_residual_base: bool,
}

/// Per-call context supplied by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// Account that invoked the entrypoint.
    pub caller: AccountId,
    /// Monotonic transaction sequence number.
    pub seq: u64,
}

impl TxContext {
    pub fn new(caller: AccountId, seq: u64) -> Self {
        Self { caller, seq }
    }
}

/// Outcome of a successful exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReceipt {
    pub position: PositionHandle,
    pub observed_tick: Tick,
    /// Amounts the issuer paid to the controller on collect.
    pub collected: PairAmounts,
    pub quote_disbursed: u128,
    pub base_disbursed: u128,
}

/// The stop-loss controller.
///
/// Entrypoints take `&self`; state sits behind mutexes that are never held
/// across a collaborator call. Callers must still serialize entrypoints (see
/// `Ledger`), since rollback restores a snapshot taken when the call began.
#[derive(Debug)]
pub struct AutoExitController {
    account: AccountId,
    owner: AccountId,
    config: ControllerConfig,
    order: Mutex<RangeOrder>,
    events: Mutex<Vec<LifecycleEvent>>,
}

impl AutoExitController {
    /// Create an idle controller. `account` is the controller's own address on
    /// the asset ledger, `owner` the only account allowed to open orders.
    pub fn new(account: AccountId, owner: AccountId, config: ControllerConfig) -> Self {
        Self {
            account,
            owner,
            config,
            order: Mutex::new(RangeOrder::default()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Snapshot of the order record. Never fails, never mutates.
    pub fn current_order(&self) -> RangeOrder {
        lock(&self.order).clone()
    }

    /// Committed lifecycle events, oldest first.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        lock(&self.events).clone()
    }

    fn record(&self, event: LifecycleEvent) {
        lock(&self.events).push(event);
    }

    /// Run `body` as one all-or-nothing transaction.
    fn transact<E, T>(
        &self,
        env: &E,
        entrypoint: &'static str,
        body: impl FnOnce() -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError>
    where
        E: Transactional + ?Sized,
    {
        let saved_order = self.current_order();
        let saved_events = lock(&self.events).len();
        env.checkpoint();

        match body() {
            Ok(value) => {
                env.commit();
                Ok(value)
            }
            Err(err) => {
                env.rollback();
                *lock(&self.order) = saved_order;
                lock(&self.events).truncate(saved_events);
                if err.is_no_upkeep() {
                    debug!(target: "autoexit::controller", entrypoint, error = %err, "rolled back");
                } else {
                    warn!(target: "autoexit::controller", entrypoint, error = %err, "rolled back");
                }
                Err(err)
            }
        }
    }
}

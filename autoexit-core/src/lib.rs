//! AutoExit Core: a keeper-driven stop-loss controller for a single
//! concentrated-liquidity range order.
//!
//! This crate contains:
//! - Domain types (ticks, the range order record, payloads, lifecycle events)
//! - Collaborator traits for the asset contracts, the position issuer, and the
//!   price oracle
//! - The transactional controller (open, evaluate, execute, current order)
//! - An in-memory simulated market implementing every collaborator
//! - A serialized ledger runtime that numbers and records transactions

pub mod collab;
pub mod controller;
pub mod domain;
pub mod ledger;
pub mod sim;

pub use controller::{
    AutoExitController, ControllerConfig, ControllerError, ExitReceipt, NoUpkeepReason, TxContext,
};
pub use ledger::Ledger;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

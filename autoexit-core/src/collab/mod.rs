//! External collaborator traits.
//!
//! The controller never touches balances, positions, or prices directly. It
//! talks to three capability boundaries:
//! - [`AssetLedger`]: the fungible asset contracts (pull, push, approve)
//! - [`PositionIssuer`]: opens, drains, and collects concentrated-liquidity positions
//! - [`PriceOracle`]: reports the current tick of a pool
//!
//! plus [`Transactional`], through which the platform applies or discards
//! every effect of a call as a unit.
//!
//! All methods take `&self`. Any outbound call may call back into the
//! controller before it returns, so implementations must not hold locks
//! across those callbacks, and the controller must not either.

pub mod error;

pub use error::{AssetError, CollabError, IssuerError, OracleError};

use crate::domain::{AccountId, AssetId, FeeTier, PositionHandle, Tick};
use serde::{Deserialize, Serialize};

/// Fungible asset contracts, addressed by [`AssetId`].
pub trait AssetLedger {
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u128;

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> u128;

    /// Set the amount `spender` may pull from `owner`.
    fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Push `amount` from `from` to `to`.
    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Pull `amount` from `from` to `to` using an allowance granted to `spender`.
    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError>;
}

/// Request to open a single-sided concentrated-liquidity position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPositionRequest {
    /// Account the issuer pulls the deposit from; it also owns the position.
    pub payer: AccountId,
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    pub fee_tier: FeeTier,
    pub lower_tick: Tick,
    pub upper_tick: Tick,
    pub base_amount: u128,
}

/// What the issuer returns for a newly opened position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReceipt {
    pub position: PositionHandle,
    pub liquidity: u128,
    pub base_deposited: u128,
}

/// Amounts of both assets, in (base, quote) order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAmounts {
    pub base: u128,
    pub quote: u128,
}

/// The concentrated-liquidity position issuer.
pub trait PositionIssuer {
    /// Account that must be approved to pull deposits.
    fn issuer_account(&self) -> AccountId;

    fn open_position(&self, request: &OpenPositionRequest) -> Result<PositionReceipt, IssuerError>;

    /// Remove `liquidity` from the position. The withdrawn assets become owed
    /// to the position owner; nothing is transferred yet.
    fn decrease_liquidity(
        &self,
        position: PositionHandle,
        liquidity: u128,
    ) -> Result<PairAmounts, IssuerError>;

    /// Transfer everything owed on the position to `recipient`.
    fn collect(
        &self,
        position: PositionHandle,
        recipient: &AccountId,
    ) -> Result<PairAmounts, IssuerError>;
}

/// Read access to the current pool price.
pub trait PriceOracle {
    fn current_tick(
        &self,
        base: &AssetId,
        quote: &AssetId,
        fee: FeeTier,
    ) -> Result<Tick, OracleError>;
}

/// Checkpoint/commit/rollback of collaborator state.
///
/// Checkpoints nest: a re-entrant call opens its own frame inside the outer
/// one, and each `commit` or `rollback` closes the innermost open frame.
pub trait Transactional {
    fn checkpoint(&self);
    fn commit(&self);
    fn rollback(&self);
}

/// Everything the controller needs from the outside world.
pub trait Environment: AssetLedger + PositionIssuer + PriceOracle + Transactional {}

impl<T> Environment for T where T: AssetLedger + PositionIssuer + PriceOracle + Transactional + ?Sized {}

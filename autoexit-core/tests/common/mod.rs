//! Shared fixture: one controller, one simulated market, owner funded and
//! approved, pool initialized above the range.

#![allow(dead_code)]

use autoexit_core::collab::AssetLedger;
use autoexit_core::domain::{AccountId, AssetId, FeeTier, OpenOrderParams, Tick};
use autoexit_core::sim::{ProceedsModel, SimMarket};
use autoexit_core::{AutoExitController, ControllerConfig, Ledger};
use std::sync::Arc;

pub const PROCEEDS: u128 = 1_000;

pub fn base() -> AssetId {
    AssetId::new("USDC")
}

pub fn quote() -> AssetId {
    AssetId::new("WETH")
}

pub fn owner() -> AccountId {
    AccountId::new("owner")
}

pub fn keeper(n: usize) -> AccountId {
    AccountId::new(format!("keeper-{n}"))
}

pub fn params(lower: i32, upper: i32, amount: u128) -> OpenOrderParams {
    OpenOrderParams {
        base_asset: base(),
        quote_asset: quote(),
        fee_tier: FeeTier::MEDIUM,
        committed_amount: amount,
        lower_tick: lower,
        upper_tick: upper,
    }
}

/// A ledger whose owner holds and has approved `funds` base units.
pub fn ledger_with(funds: u128, config: ControllerConfig) -> Ledger<SimMarket> {
    let controller = Arc::new(AutoExitController::new(
        AccountId::new("controller"),
        owner(),
        config,
    ));
    let market = SimMarket::default();
    market.set_proceeds(ProceedsModel::Fixed { amount: PROCEEDS });
    market.mint(&base(), &owner(), funds);
    market
        .approve(&base(), &owner(), controller.account(), funds)
        .expect("approve");
    market.set_tick(&base(), &quote(), FeeTier::MEDIUM, tick(80_500));
    Ledger::new(controller, market)
}

pub fn ledger(funds: u128) -> Ledger<SimMarket> {
    ledger_with(funds, ControllerConfig::default())
}

pub fn tick(value: i32) -> Tick {
    Tick::new(value).expect("valid tick")
}

pub fn set_price(ledger: &Ledger<SimMarket>, value: i32) {
    ledger
        .env()
        .set_tick(&base(), &quote(), FeeTier::MEDIUM, tick(value));
}

pub fn owner_quote(ledger: &Ledger<SimMarket>) -> u128 {
    ledger.env().balance_of(&quote(), &owner())
}

pub fn owner_base(ledger: &Ledger<SimMarket>) -> u128 {
    ledger.env().balance_of(&base(), &owner())
}

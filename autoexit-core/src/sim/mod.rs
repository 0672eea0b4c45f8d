//! In-memory market implementing every collaborator the controller needs.
//!
//! `SimMarket` plays three roles at once: the asset contracts (balances and
//! allowances per asset), the position issuer (a position book with handles
//! starting at 1), and the price oracle (one tick per pool). It also provides
//! nested checkpoints so a failed controller call can be rolled back.
//!
//! Test controls: [`SimMarket::set_tick`] moves the price,
//! [`SimMarket::set_proceeds`] chooses what a conversion pays,
//! [`SimMarket::fail_on`] injects collaborator failures, and
//! [`SimMarket::on_receive`] registers a hook that runs whenever an account is
//! credited, which is how re-entrant callers are simulated.
//!
//! Failure plans, hooks, and the proceeds model are test configuration and
//! are not affected by rollback.

pub mod failure;
pub mod proceeds;

pub use failure::{FailurePlan, SimOp};
pub use proceeds::ProceedsModel;

use crate::collab::{
    AssetError, AssetLedger, IssuerError, OpenPositionRequest, OracleError, PairAmounts,
    PositionIssuer, PositionReceipt, PriceOracle, Transactional,
};
use crate::domain::{AccountId, AssetId, FeeTier, PositionHandle, Tick};
use crate::lock;
use proceeds::{converted_base, mul_div};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Account name used by [`SimMarket::default`] for the position issuer.
pub const DEFAULT_ISSUER: &str = "position-issuer";

/// A position held by the simulated issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimPosition {
    /// Account the deposit was pulled from.
    pub owner: AccountId,
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    pub fee_tier: FeeTier,
    pub lower_tick: Tick,
    pub upper_tick: Tick,
    pub liquidity: u128,
    /// Base deposited at open.
    pub deposited: u128,
    /// Base still backing the remaining liquidity.
    pub principal: u128,
    /// Withdrawn but not yet collected.
    pub owed: PairAmounts,
}

/// A credit to `to`, passed to receive hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveEvent {
    pub asset: AssetId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
}

/// Runs after `to` has been credited. An error fails the transfer that
/// triggered it.
pub type ReceiveHook =
    Arc<dyn Fn(&SimMarket, &ReceiveEvent) -> Result<(), AssetError> + Send + Sync>;

type PoolKey = (AssetId, AssetId, FeeTier);

#[derive(Debug, Clone, Default)]
struct MarketState {
    balances: HashMap<(AssetId, AccountId), u128>,
    allowances: HashMap<(AssetId, AccountId, AccountId), u128>,
    pools: HashMap<PoolKey, Tick>,
    positions: BTreeMap<PositionHandle, SimPosition>,
    last_position: u64,
}

impl MarketState {
    fn balance(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.balances
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances
            .get(&(asset.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn credit(&mut self, asset: &AssetId, account: &AccountId, amount: u128) {
        let entry = self
            .balances
            .entry((asset.clone(), account.clone()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    fn move_funds(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        let available = self.balance(asset, from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                asset: asset.clone(),
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        self.balances
            .insert((asset.clone(), from.clone()), available - amount);
        self.credit(asset, to, amount);
        Ok(())
    }

    /// Move `amount` on behalf of `spender`, consuming its allowance.
    fn pull(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                asset: asset.clone(),
                owner: from.clone(),
                spender: spender.clone(),
                needed: amount,
                available: allowed,
            });
        }
        self.move_funds(asset, from, to, amount)?;
        self.allowances.insert(
            (asset.clone(), from.clone(), spender.clone()),
            allowed - amount,
        );
        Ok(())
    }
}

/// The simulated market. See the module docs.
pub struct SimMarket {
    issuer: AccountId,
    state: Mutex<MarketState>,
    checkpoints: Mutex<Vec<MarketState>>,
    proceeds: Mutex<ProceedsModel>,
    failures: Mutex<FailurePlan>,
    hooks: Mutex<HashMap<AccountId, ReceiveHook>>,
}

impl Default for SimMarket {
    fn default() -> Self {
        Self::new(AccountId::new(DEFAULT_ISSUER))
    }
}

impl fmt::Debug for SimMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SimMarket")
            .field("issuer", &self.issuer)
            .field("pools", &state.pools.len())
            .field("positions", &state.positions.len())
            .field("checkpoint_depth", &lock(&self.checkpoints).len())
            .finish()
    }
}

impl SimMarket {
    pub fn new(issuer: AccountId) -> Self {
        Self {
            issuer,
            state: Mutex::new(MarketState::default()),
            checkpoints: Mutex::new(Vec::new()),
            proceeds: Mutex::new(ProceedsModel::default()),
            failures: Mutex::new(FailurePlan::default()),
            hooks: Mutex::new(HashMap::new()),
        }
    }

    pub fn issuer(&self) -> AccountId {
        self.issuer.clone()
    }

    /// Create `amount` of `asset` out of thin air for `account`.
    pub fn mint(&self, asset: &AssetId, account: &AccountId, amount: u128) {
        lock(&self.state).credit(asset, account, amount);
    }

    /// Sum of all balances of `asset`.
    pub fn total_balance(&self, asset: &AssetId) -> u128 {
        lock(&self.state)
            .balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Set (or initialize) the current tick of a pool.
    pub fn set_tick(&self, base: &AssetId, quote: &AssetId, fee: FeeTier, tick: Tick) {
        trace!(target: "autoexit::sim", %base, %quote, %fee, %tick, "tick set");
        lock(&self.state)
            .pools
            .insert((base.clone(), quote.clone(), fee), tick);
    }

    pub fn tick(&self, base: &AssetId, quote: &AssetId, fee: FeeTier) -> Option<Tick> {
        lock(&self.state)
            .pools
            .get(&(base.clone(), quote.clone(), fee))
            .copied()
    }

    pub fn set_proceeds(&self, model: ProceedsModel) {
        *lock(&self.proceeds) = model;
    }

    pub fn proceeds(&self) -> ProceedsModel {
        *lock(&self.proceeds)
    }

    /// Fail every call to `op` until cleared.
    pub fn fail_on(&self, op: SimOp, reason: impl Into<String>) {
        lock(&self.failures).always(op, reason);
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: SimOp, times: u32, reason: impl Into<String>) {
        lock(&self.failures).times(op, times, reason);
    }

    pub fn clear_failure(&self, op: SimOp) {
        lock(&self.failures).clear(op);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear_all();
    }

    /// Run `hook` every time `account` is credited. Replaces any earlier hook.
    pub fn on_receive<F>(&self, account: &AccountId, hook: F)
    where
        F: Fn(&SimMarket, &ReceiveEvent) -> Result<(), AssetError> + Send + Sync + 'static,
    {
        lock(&self.hooks).insert(account.clone(), Arc::new(hook));
    }

    pub fn remove_hook(&self, account: &AccountId) {
        lock(&self.hooks).remove(account);
    }

    pub fn position(&self, handle: PositionHandle) -> Option<SimPosition> {
        lock(&self.state).positions.get(&handle).cloned()
    }

    pub fn position_count(&self) -> usize {
        lock(&self.state).positions.len()
    }

    /// Open checkpoint frames. Zero whenever no transaction is in flight.
    pub fn checkpoint_depth(&self) -> usize {
        lock(&self.checkpoints).len()
    }

    fn injected(&self, op: SimOp) -> Option<String> {
        let reason = lock(&self.failures).take(op);
        if let Some(reason) = &reason {
            debug!(target: "autoexit::sim", %op, reason = reason.as_str(), "injected failure");
        }
        reason
    }

    /// Invoke the receive hook of `event.to`, if any, with no lock held.
    fn notify(&self, event: ReceiveEvent) -> Result<(), AssetError> {
        let hook = lock(&self.hooks).get(&event.to).cloned();
        match hook {
            Some(hook) => hook(self, &event),
            None => Ok(()),
        }
    }
}

impl AssetLedger for SimMarket {
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u128 {
        lock(&self.state).balance(asset, account)
    }

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> u128 {
        lock(&self.state).allowance(asset, owner, spender)
    }

    fn approve(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        if let Some(reason) = self.injected(SimOp::Approve) {
            return Err(AssetError::Rejected {
                asset: asset.clone(),
                reason,
            });
        }
        lock(&self.state)
            .allowances
            .insert((asset.clone(), owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        if let Some(reason) = self.injected(SimOp::Transfer) {
            return Err(AssetError::Rejected {
                asset: asset.clone(),
                reason,
            });
        }
        lock(&self.state).move_funds(asset, from, to, amount)?;
        self.notify(ReceiveEvent {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        })
    }

    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), AssetError> {
        if let Some(reason) = self.injected(SimOp::TransferFrom) {
            return Err(AssetError::Rejected {
                asset: asset.clone(),
                reason,
            });
        }
        lock(&self.state).pull(asset, spender, from, to, amount)?;
        self.notify(ReceiveEvent {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        })
    }
}

impl PositionIssuer for SimMarket {
    fn issuer_account(&self) -> AccountId {
        self.issuer.clone()
    }

    fn open_position(&self, request: &OpenPositionRequest) -> Result<PositionReceipt, IssuerError> {
        if let Some(reason) = self.injected(SimOp::OpenPosition) {
            return Err(IssuerError::Rejected(reason));
        }
        if request.lower_tick >= request.upper_tick {
            return Err(IssuerError::InvalidRange {
                lower: request.lower_tick.get(),
                upper: request.upper_tick.get(),
            });
        }
        if request.base_amount == 0 {
            return Err(IssuerError::ZeroLiquidity);
        }

        let position = {
            let mut state = lock(&self.state);
            let pool = (
                request.base_asset.clone(),
                request.quote_asset.clone(),
                request.fee_tier,
            );
            if !state.pools.contains_key(&pool) {
                return Err(IssuerError::PoolNotInitialized {
                    base: pool.0,
                    quote: pool.1,
                    fee: pool.2,
                });
            }
            state.pull(
                &request.base_asset,
                &self.issuer,
                &request.payer,
                &self.issuer,
                request.base_amount,
            )?;

            state.last_position += 1;
            let handle = PositionHandle(state.last_position);
            state.positions.insert(
                handle,
                SimPosition {
                    owner: request.payer.clone(),
                    base_asset: request.base_asset.clone(),
                    quote_asset: request.quote_asset.clone(),
                    fee_tier: request.fee_tier,
                    lower_tick: request.lower_tick,
                    upper_tick: request.upper_tick,
                    liquidity: request.base_amount,
                    deposited: request.base_amount,
                    principal: request.base_amount,
                    owed: PairAmounts::default(),
                },
            );
            handle
        };

        debug!(
            target: "autoexit::sim",
            %position,
            payer = %request.payer,
            amount = request.base_amount,
            "position opened"
        );
        self.notify(ReceiveEvent {
            asset: request.base_asset.clone(),
            from: request.payer.clone(),
            to: self.issuer.clone(),
            amount: request.base_amount,
        })?;

        Ok(PositionReceipt {
            position,
            liquidity: request.base_amount,
            base_deposited: request.base_amount,
        })
    }

    fn decrease_liquidity(
        &self,
        position: PositionHandle,
        liquidity: u128,
    ) -> Result<PairAmounts, IssuerError> {
        if let Some(reason) = self.injected(SimOp::DecreaseLiquidity) {
            return Err(IssuerError::Rejected(reason));
        }
        let proceeds = self.proceeds();

        let mut state = lock(&self.state);
        let pos = state
            .positions
            .get(&position)
            .cloned()
            .ok_or(IssuerError::UnknownPosition(position))?;
        if liquidity > pos.liquidity {
            return Err(IssuerError::InsufficientLiquidity {
                position,
                requested: liquidity,
                available: pos.liquidity,
            });
        }
        let pool = (pos.base_asset.clone(), pos.quote_asset.clone(), pos.fee_tier);
        let tick = state
            .pools
            .get(&pool)
            .copied()
            .ok_or_else(|| IssuerError::PoolNotInitialized {
                base: pool.0.clone(),
                quote: pool.1.clone(),
                fee: pool.2,
            })?;

        let share = if pos.liquidity == 0 {
            0
        } else {
            mul_div(pos.principal, liquidity, pos.liquidity)
        };
        let converted = converted_base(share, pos.lower_tick, pos.upper_tick, tick);
        let amounts = PairAmounts {
            base: share - converted,
            quote: proceeds.quote_for(converted, pos.deposited),
        };

        // Settle the conversion against the issuer's reserves.
        let reserve = state.balance(&pos.base_asset, &self.issuer);
        state.balances.insert(
            (pos.base_asset.clone(), self.issuer.clone()),
            reserve.saturating_sub(converted),
        );
        state.credit(&pos.quote_asset, &self.issuer, amounts.quote);

        if let Some(entry) = state.positions.get_mut(&position) {
            entry.liquidity -= liquidity;
            entry.principal -= share;
            entry.owed.base += amounts.base;
            entry.owed.quote += amounts.quote;
        }
        drop(state);

        debug!(
            target: "autoexit::sim",
            %position,
            %tick,
            liquidity,
            base = amounts.base,
            quote = amounts.quote,
            "liquidity decreased"
        );
        Ok(amounts)
    }

    fn collect(
        &self,
        position: PositionHandle,
        recipient: &AccountId,
    ) -> Result<PairAmounts, IssuerError> {
        if let Some(reason) = self.injected(SimOp::Collect) {
            return Err(IssuerError::Rejected(reason));
        }

        let (owed, base_asset, quote_asset) = {
            let mut state = lock(&self.state);
            let pos = state
                .positions
                .get(&position)
                .cloned()
                .ok_or(IssuerError::UnknownPosition(position))?;
            let owed = pos.owed;
            if owed.base > 0 {
                state.move_funds(&pos.base_asset, &self.issuer, recipient, owed.base)?;
            }
            if owed.quote > 0 {
                state.move_funds(&pos.quote_asset, &self.issuer, recipient, owed.quote)?;
            }
            if let Some(entry) = state.positions.get_mut(&position) {
                entry.owed = PairAmounts::default();
            }
            (owed, pos.base_asset, pos.quote_asset)
        };

        for (asset, amount) in [(base_asset, owed.base), (quote_asset, owed.quote)] {
            if amount > 0 {
                self.notify(ReceiveEvent {
                    asset,
                    from: self.issuer.clone(),
                    to: recipient.clone(),
                    amount,
                })?;
            }
        }
        Ok(owed)
    }
}

impl PriceOracle for SimMarket {
    fn current_tick(
        &self,
        base: &AssetId,
        quote: &AssetId,
        fee: FeeTier,
    ) -> Result<Tick, OracleError> {
        if let Some(reason) = self.injected(SimOp::Oracle) {
            return Err(OracleError::Unavailable(reason));
        }
        self.tick(base, quote, fee)
            .ok_or_else(|| OracleError::PoolNotFound {
                base: base.clone(),
                quote: quote.clone(),
                fee,
            })
    }
}

impl Transactional for SimMarket {
    fn checkpoint(&self) {
        let snapshot = lock(&self.state).clone();
        lock(&self.checkpoints).push(snapshot);
    }

    fn commit(&self) {
        lock(&self.checkpoints).pop();
    }

    fn rollback(&self) {
        let snapshot = lock(&self.checkpoints).pop();
        match snapshot {
            Some(snapshot) => *lock(&self.state) = snapshot,
            None => debug!(target: "autoexit::sim", "rollback without checkpoint"),
        }
    }
}

//! Keeper polling loop.
//!
//! Drives one scenario end to end: funds the owner, opens the order, then
//! walks the price path. At every polling step each keeper evaluates the
//! controller off-chain, and the keepers that saw a trigger submit executions
//! in rotation. Only the first can win; the rest must come back as
//! `NoUpkeepNeeded` without moving any funds.

use std::sync::Arc;

use autoexit_core::collab::AssetLedger;
use autoexit_core::domain::{AccountId, FeeTier, Tick};
use autoexit_core::sim::SimMarket;
use autoexit_core::{AutoExitController, Ledger};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ScenarioConfig, ScenarioError};
use crate::path;
use crate::report::{Balances, ExitSummary, KeeperReport, StepRecord, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("scenario setup failed: {0}")]
    Setup(String),

    /// The controller broke one of its guarantees during the run.
    #[error("invariant violated at step {step}: {message}")]
    Invariant { step: usize, message: String },
}

/// Keeper account names, `keeper-0` onwards.
pub fn keeper_accounts(count: usize) -> Vec<AccountId> {
    (0..count)
        .map(|i| AccountId::new(format!("keeper-{i}")))
        .collect()
}

/// Position of keeper `index` in the submission queue at `step`. Keepers
/// submit round-robin so no keeper always wins the race.
fn rotation_rank(index: usize, count: usize, step: usize) -> usize {
    (index + count - step % count) % count
}

fn owner_balances(market: &SimMarket, config: &ScenarioConfig) -> Balances {
    let owner = config.accounts.owner_id();
    Balances {
        base: market.balance_of(&config.base(), &owner),
        quote: market.balance_of(&config.quote(), &owner),
    }
}

/// Run one scenario to the end of its price path.
///
/// A rejected open is part of the outcome, not an error: it is recorded in the
/// report and the keepers then poll an idle controller. Errors are reserved
/// for invalid scenarios and for broken controller guarantees.
pub fn run_scenario(config: &ScenarioConfig) -> Result<KeeperReport, KeeperError> {
    config.validate()?;
    let started_at = Utc::now();
    let ticks = path::generate(&config.path)?;
    let base = config.base();
    let quote = config.quote();
    let fee = FeeTier(config.order.fee_tier);
    let owner = config.accounts.owner_id();

    let market = SimMarket::new(config.accounts.issuer_id());
    market.set_proceeds(config.proceeds_model()?);
    market.mint(&base, &owner, config.owner_funding()?);
    market
        .approve(&base, &owner, &config.accounts.controller_id(), config.allowance()?)
        .map_err(|e| KeeperError::Setup(e.to_string()))?;
    let initial = Tick::new(config.market.initial_tick).map_err(ScenarioError::from)?;
    market.set_tick(&base, &quote, fee, initial);

    let controller = Arc::new(AutoExitController::new(
        config.accounts.controller_id(),
        owner.clone(),
        config.controller.clone(),
    ));
    let mut ledger = Ledger::new(controller, market);
    let owner_before = owner_balances(ledger.env(), config);

    info!(
        target: "autoexit::keeper",
        scenario = %config.name,
        steps = ticks.len(),
        keepers = config.keepers.count,
        "starting keeper run"
    );

    let (position, open_error) = match ledger.open_order(&owner, &config.order_params()?) {
        Ok(position) => (Some(position), None),
        Err(err) => {
            warn!(target: "autoexit::keeper", error = %err, "open rejected");
            (None, Some(err.to_string()))
        }
    };

    let keepers = keeper_accounts(config.keepers.count);
    let mut exit: Option<ExitSummary> = None;
    let mut steps = Vec::with_capacity(ticks.len());

    for (step, &tick) in ticks.iter().enumerate() {
        for failure in config.failures.iter().filter(|f| f.at_step == step) {
            match failure.times {
                Some(n) => ledger.env().fail_times(failure.op, n, failure.reason.as_str()),
                None => ledger.env().fail_on(failure.op, failure.reason.as_str()),
            }
            debug!(target: "autoexit::keeper", step, op = %failure.op, "failure armed");
        }
        ledger.env().set_tick(&base, &quote, fee, tick);

        let mut record = StepRecord {
            step,
            tick: tick.get(),
            polled: step % config.keepers.stride == 0,
            triggered: 0,
            exit_by: None,
            quote_disbursed: 0,
            stale: 0,
            failed: 0,
            last_error: None,
            active_after: false,
        };

        if record.polled {
            // Every keeper looks at the same state before anyone submits.
            let mut triggered: Vec<(usize, Vec<u8>)> = Vec::new();
            for i in 0..keepers.len() {
                let check = ledger.evaluate_upkeep(&[]);
                if check.triggered {
                    triggered.push((i, check.payload));
                }
            }
            record.triggered = triggered.len();
            triggered.sort_by_key(|(i, _)| rotation_rank(*i, keepers.len(), step));

            for (i, payload) in triggered {
                match ledger.execute_upkeep(&keepers[i], &payload) {
                    Ok(receipt) => {
                        if let Some(previous) = &exit {
                            return Err(KeeperError::Invariant {
                                step,
                                message: format!(
                                    "second exit by {} after {} at step {}",
                                    keepers[i], previous.keeper, previous.step
                                ),
                            });
                        }
                        info!(
                            target: "autoexit::keeper",
                            step,
                            keeper = %keepers[i],
                            quote = receipt.quote_disbursed,
                            "exit committed"
                        );
                        record.exit_by = Some(keepers[i].clone());
                        record.quote_disbursed = receipt.quote_disbursed;
                        exit = Some(ExitSummary {
                            step,
                            tick: receipt.observed_tick.get(),
                            keeper: keepers[i].clone(),
                            position: receipt.position,
                            quote_disbursed: receipt.quote_disbursed,
                            base_disbursed: receipt.base_disbursed,
                        });
                    }
                    Err(err) if err.is_no_upkeep() => record.stale += 1,
                    Err(err) => {
                        warn!(
                            target: "autoexit::keeper",
                            step,
                            keeper = %keepers[i],
                            error = %err,
                            "execution failed"
                        );
                        record.failed += 1;
                        record.last_error = Some(err.to_string());
                    }
                }
            }
        }

        record.active_after = ledger.current_order().is_active;
        let depth = ledger.env().checkpoint_depth();
        if depth != 0 {
            return Err(KeeperError::Invariant {
                step,
                message: format!("{depth} checkpoints left open"),
            });
        }
        steps.push(record);
    }

    let report = KeeperReport {
        schema_version: SCHEMA_VERSION,
        scenario_id: config.scenario_id(),
        name: config.name.clone(),
        started_at,
        finished_at: Utc::now(),
        keepers: keepers.len(),
        position,
        open_error,
        exit,
        owner_before,
        owner_after: owner_balances(ledger.env(), config),
        final_order: ledger.current_order(),
        events: ledger.events(),
        transactions: ledger.history().to_vec(),
        steps,
    };
    info!(
        target: "autoexit::keeper",
        scenario = %report.name,
        exited = report.exited(),
        attempts = report.execute_attempts(),
        "keeper run finished"
    );
    Ok(report)
}

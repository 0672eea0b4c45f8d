//! Keeper runs end to end: race between keepers, failure injection, polling
//! stride, rejected opens, unit scaling.

use autoexit_core::domain::LifecycleEvent;
use autoexit_core::ledger::Entrypoint;
use autoexit_core::sim::SimOp;
use autoexit_runner::config::{FailureConfig, PathConfig};
use autoexit_runner::{run_scenario, KeeperError, ScenarioConfig, ScenarioError};

const BASE_SCENARIO: &str = r#"
name = "test"

[assets]
base = { symbol = "USDC" }
quote = { symbol = "WETH" }

[funding]
owner_base = 3000

[order]
committed = 3000
lower_tick = 79700
upper_tick = 80000

[market]
initial_tick = 80500
proceeds = { fixed = { amount = 1000 } }

[path.explicit]
ticks = [80500, 80200, 79900, 79000, 78500]

[keepers]
count = 3
"#;

fn scenario() -> ScenarioConfig {
    ScenarioConfig::from_toml_str(BASE_SCENARIO).unwrap()
}

fn with_ticks(ticks: &[i32]) -> ScenarioConfig {
    let mut config = scenario();
    config.path = PathConfig::Explicit {
        ticks: ticks.to_vec(),
    };
    config
}

#[test]
fn keepers_race_and_exactly_one_wins() {
    let report = run_scenario(&scenario()).unwrap();

    let exit = report.exit.as_ref().expect("exit committed");
    assert_eq!(exit.step, 3);
    assert_eq!(exit.tick, 79_000);
    assert_eq!(exit.keeper.as_str(), "keeper-0");
    assert_eq!(exit.quote_disbursed, 1000);

    let step = &report.steps[3];
    assert_eq!(step.triggered, 3);
    assert_eq!(step.stale, 2);
    assert_eq!(step.failed, 0);
    assert!(!step.active_after);

    // Nothing left to trigger afterwards.
    assert_eq!(report.steps[4].triggered, 0);
    assert_eq!(report.owner_before.base, 3000);
    assert_eq!(report.owner_after.base, 0);
    assert_eq!(report.owner_after.quote, 1000);

    let exits = report
        .events
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::UpkeepPerformed { .. }))
        .count();
    assert_eq!(exits, 1);
    assert_eq!(report.transactions.len(), 4);
    assert_eq!(report.transactions[0].entrypoint, Entrypoint::OpenOrder);
    assert_eq!(
        report.transactions.iter().filter(|t| t.committed()).count(),
        2
    );
}

#[test]
fn no_trigger_while_price_stays_in_or_above_range() {
    let report = run_scenario(&with_ticks(&[80_500, 80_000, 79_800, 79_700])).unwrap();
    assert!(report.exit.is_none());
    assert!(report.final_order.is_active);
    assert!(report.steps.iter().all(|s| s.triggered == 0));
    assert_eq!(report.execute_attempts(), 0);
    assert_eq!(report.owner_after.quote, 0);
}

#[test]
fn rotation_changes_the_winner() {
    // Trigger first seen at step 4: keeper-1 submits first.
    let report = run_scenario(&with_ticks(&[80_500, 80_400, 80_300, 80_200, 79_000])).unwrap();
    assert_eq!(report.exit.unwrap().keeper.as_str(), "keeper-1");
}

#[test]
fn failed_collect_rolls_back_and_next_keeper_exits() {
    let mut config = scenario();
    config.failures.push(FailureConfig {
        op: SimOp::Collect,
        at_step: 3,
        times: Some(1),
        reason: "collect reverted".into(),
    });
    let report = run_scenario(&config).unwrap();

    let step = &report.steps[3];
    assert_eq!(step.failed, 1);
    assert!(step.last_error.as_deref().unwrap().contains("collect reverted"));
    assert_eq!(step.exit_by.as_ref().unwrap().as_str(), "keeper-1");
    assert_eq!(step.stale, 1);
    assert_eq!(report.owner_after.quote, 1000);
    assert_eq!(report.failed_attempts(), 1);
}

#[test]
fn persistent_transfer_failure_keeps_order_active() {
    let mut config = scenario();
    config.failures.push(FailureConfig {
        op: SimOp::Transfer,
        at_step: 0,
        times: None,
        reason: "paused".into(),
    });
    let report = run_scenario(&config).unwrap();

    assert!(report.exit.is_none());
    assert!(report.final_order.is_active);
    // Every triggered keeper at steps 3 and 4 failed and rolled back.
    assert_eq!(report.failed_attempts(), 6);
    assert_eq!(report.owner_after.quote, 0);
}

#[test]
fn oracle_outage_reads_as_no_trigger() {
    let mut config = scenario();
    config.failures.push(FailureConfig {
        op: SimOp::Oracle,
        at_step: 3,
        times: None,
        reason: "stale feed".into(),
    });
    let report = run_scenario(&config).unwrap();
    assert!(report.exit.is_none());
    assert!(report.final_order.is_active);
    assert_eq!(report.execute_attempts(), 0);
}

#[test]
fn stride_skips_steps() {
    let mut config = with_ticks(&[80_500, 79_000, 79_000, 79_000]);
    config.keepers.stride = 2;
    let report = run_scenario(&config).unwrap();
    assert!(!report.steps[1].polled);
    assert_eq!(report.steps[1].triggered, 0);
    assert_eq!(report.exit.unwrap().step, 2);
}

#[test]
fn rejected_open_is_reported_not_raised() {
    let mut config = scenario();
    config.order.lower_tick = 80_000;
    config.order.upper_tick = 79_700;
    let report = run_scenario(&config).unwrap();

    assert!(!report.opened());
    assert!(report
        .open_error
        .as_deref()
        .unwrap()
        .contains("invalid tick range"));
    assert!(report.exit.is_none());
    assert_eq!(report.owner_after.base, 3000);
    assert!(report.events.is_empty());
}

#[test]
fn insufficient_allowance_rejects_open() {
    let mut config = scenario();
    config.funding.allowance = Some(100);
    let report = run_scenario(&config).unwrap();
    assert!(!report.opened());
    assert_eq!(report.owner_after.base, 3000);
}

#[test]
fn decimals_scale_committed_amount() {
    let mut config = scenario();
    config.assets.base.decimals = 6;
    config.market.proceeds = autoexit_runner::config::ProceedsConfig::Ratio {
        numerator: 1,
        denominator: 1,
    };
    let report = run_scenario(&config).unwrap();
    assert_eq!(report.owner_before.base, 3_000_000_000);
    assert_eq!(report.owner_after.quote, 3_000_000_000);
}

#[test]
fn invalid_scenario_is_an_error() {
    let mut config = scenario();
    config.keepers.count = 0;
    assert!(matches!(
        run_scenario(&config),
        Err(KeeperError::Scenario(ScenarioError::Invalid(_)))
    ));
}

//! Keeper run reports: JSON, CSV, and Markdown.
//!
//! A [`KeeperReport`] is the full record of one scenario run. JSON keeps the
//! whole report and is versioned; unknown schema versions are rejected on
//! load. The per-step CSV is meant for spreadsheets and plotting.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use autoexit_core::domain::{AccountId, LifecycleEvent, PositionHandle, RangeOrder};
use autoexit_core::ledger::TxRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScenarioId;

pub const SCHEMA_VERSION: u32 = 1;

/// One account's holdings of the order's two assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub base: u128,
    pub quote: u128,
}

/// What happened at one step of the price path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub tick: i32,
    /// Whether keepers polled at this step (see the keeper stride).
    pub polled: bool,
    /// Keepers whose evaluation reported a trigger.
    pub triggered: usize,
    /// Keeper whose execution committed the exit.
    pub exit_by: Option<AccountId>,
    pub quote_disbursed: u128,
    /// Executions rejected as `NoUpkeepNeeded` (lost the race, or stale).
    pub stale: usize,
    /// Executions that failed and rolled back.
    pub failed: usize,
    pub last_error: Option<String>,
    pub active_after: bool,
}

/// The committed exit, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSummary {
    pub step: usize,
    pub tick: i32,
    pub keeper: AccountId,
    pub position: PositionHandle,
    pub quote_disbursed: u128,
    pub base_disbursed: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeeperReport {
    pub schema_version: u32,
    pub scenario_id: ScenarioId,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub keepers: usize,
    /// Position opened by the owner, `None` when the open was rejected.
    pub position: Option<PositionHandle>,
    pub open_error: Option<String>,
    pub exit: Option<ExitSummary>,
    pub owner_before: Balances,
    pub owner_after: Balances,
    pub final_order: RangeOrder,
    pub events: Vec<LifecycleEvent>,
    pub transactions: Vec<TxRecord>,
    pub steps: Vec<StepRecord>,
}

impl KeeperReport {
    pub fn opened(&self) -> bool {
        self.position.is_some()
    }

    pub fn exited(&self) -> bool {
        self.exit.is_some()
    }

    /// Executions that reached the controller, committed or not.
    pub fn execute_attempts(&self) -> usize {
        self.steps
            .iter()
            .map(|s| s.stale + s.failed + usize::from(s.exit_by.is_some()))
            .sum()
    }

    pub fn failed_attempts(&self) -> usize {
        self.steps.iter().map(|s| s.failed).sum()
    }

    /// Quote the owner gained over the run.
    pub fn quote_gained(&self) -> u128 {
        self.owner_after.quote.saturating_sub(self.owner_before.quote)
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &KeeperReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize KeeperReport to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<KeeperReport> {
    let report: KeeperReport =
        serde_json::from_str(json).context("failed to deserialize KeeperReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: step, tick, polled, triggered, exit_by, quote_disbursed, stale,
/// failed, last_error, active_after
pub fn export_steps_csv(steps: &[StepRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "step",
        "tick",
        "polled",
        "triggered",
        "exit_by",
        "quote_disbursed",
        "stale",
        "failed",
        "last_error",
        "active_after",
    ])?;

    for s in steps {
        wtr.write_record([
            s.step.to_string(),
            s.tick.to_string(),
            s.polled.to_string(),
            s.triggered.to_string(),
            s.exit_by.as_ref().map(ToString::to_string).unwrap_or_default(),
            s.quote_disbursed.to_string(),
            s.stale.to_string(),
            s.failed.to_string(),
            s.last_error.clone().unwrap_or_default(),
            s.active_after.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Report bundle ──────────────────────────────────────────────────

/// Save a report under `output_dir/{name}_{timestamp}/`:
/// - `report.json`: the full `KeeperReport`
/// - `steps.csv`: one row per path step
/// - `summary.md`: human-readable summary
pub fn save_report(report: &KeeperReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        report.name,
        report.started_at.format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create report dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("steps.csv"), export_steps_csv(&report.steps)?)?;
    std::fs::write(run_dir.join("summary.md"), generate_summary(report))?;

    Ok(run_dir)
}

pub fn load_report(dir: &Path) -> Result<KeeperReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

pub fn generate_summary(report: &KeeperReport) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str(&format!("# Keeper Run: {}\n\n", report.name));

    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Scenario | `{}` |\n", report.scenario_id));
    md.push_str(&format!("| Started | {} |\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("| Keepers | {} |\n", report.keepers));
    md.push_str(&format!("| Steps | {} |\n", report.steps.len()));
    match (&report.position, &report.open_error) {
        (Some(position), _) => md.push_str(&format!("| Position | {position} |\n")),
        (None, Some(err)) => md.push_str(&format!("| Open | **rejected**: {err} |\n")),
        (None, None) => md.push_str("| Open | not attempted |\n"),
    }
    md.push('\n');

    md.push_str("## Exit\n\n");
    match &report.exit {
        Some(exit) => {
            md.push_str("| Field | Value |\n");
            md.push_str("| --- | --- |\n");
            md.push_str(&format!("| Step | {} |\n", exit.step));
            md.push_str(&format!("| Tick | {} |\n", exit.tick));
            md.push_str(&format!("| Keeper | {} |\n", exit.keeper));
            md.push_str(&format!("| Quote Disbursed | {} |\n", exit.quote_disbursed));
            if exit.base_disbursed > 0 {
                md.push_str(&format!("| Base Swept | {} |\n", exit.base_disbursed));
            }
        }
        None if report.final_order.is_active => {
            md.push_str("Order still active at the end of the path.\n");
        }
        None => md.push_str("No exit.\n"),
    }
    md.push('\n');

    md.push_str("## Owner Balances\n\n");
    md.push_str("| Asset | Before | After |\n");
    md.push_str("| --- | ---: | ---: |\n");
    md.push_str(&format!(
        "| {} (base) | {} | {} |\n",
        report.final_order.base_asset, report.owner_before.base, report.owner_after.base
    ));
    md.push_str(&format!(
        "| {} (quote) | {} | {} |\n",
        report.final_order.quote_asset, report.owner_before.quote, report.owner_after.quote
    ));
    md.push('\n');

    md.push_str("## Execution Attempts\n\n");
    md.push_str(&format!(
        "- {} attempts, {} rolled back, {} no-ops\n",
        report.execute_attempts(),
        report.failed_attempts(),
        report.steps.iter().map(|s| s.stale).sum::<usize>()
    ));
    let errors: Vec<&StepRecord> = report
        .steps
        .iter()
        .filter(|s| s.failed > 0)
        .collect();
    for s in errors {
        if let Some(err) = &s.last_error {
            md.push_str(&format!("- step {}: {err}\n", s.step));
        }
    }
    md.push('\n');

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoexit_core::domain::AssetId;

    fn step(step: usize, tick: i32) -> StepRecord {
        StepRecord {
            step,
            tick,
            polled: true,
            triggered: 0,
            exit_by: None,
            quote_disbursed: 0,
            stale: 0,
            failed: 0,
            last_error: None,
            active_after: true,
        }
    }

    fn sample_report() -> KeeperReport {
        let now = Utc::now();
        let mut exit_step = step(1, 79_000);
        exit_step.triggered = 2;
        exit_step.exit_by = Some(AccountId::new("keeper-0"));
        exit_step.quote_disbursed = 1000;
        exit_step.stale = 1;
        exit_step.active_after = false;

        KeeperReport {
            schema_version: SCHEMA_VERSION,
            scenario_id: "abc123".into(),
            name: "sample".into(),
            started_at: now,
            finished_at: now,
            keepers: 2,
            position: Some(PositionHandle(1)),
            open_error: None,
            exit: Some(ExitSummary {
                step: 1,
                tick: 79_000,
                keeper: AccountId::new("keeper-0"),
                position: PositionHandle(1),
                quote_disbursed: 1000,
                base_disbursed: 0,
            }),
            owner_before: Balances { base: 3000, quote: 0 },
            owner_after: Balances { base: 0, quote: 1000 },
            final_order: RangeOrder {
                base_asset: AssetId::new("USDC"),
                quote_asset: AssetId::new("WETH"),
                ..RangeOrder::default()
            },
            events: vec![],
            transactions: vec![],
            steps: vec![step(0, 80_500), exit_step],
        }
    }

    #[test]
    fn json_roundtrip() {
        let original = sample_report();
        let restored = import_json(&export_json(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn json_keeps_amounts_beyond_u64() {
        let mut report = sample_report();
        report.owner_after.quote = u128::MAX;
        let restored = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(restored.owner_after.quote, u128::MAX);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut report = sample_report();
        report.schema_version = 99;
        let err = import_json(&export_json(&report).unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version 99"));
    }

    #[test]
    fn steps_csv_has_one_row_per_step() {
        let report = sample_report();
        let csv = export_steps_csv(&report.steps).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("step,tick,polled"));
        assert_eq!(lines[2], "1,79000,true,2,keeper-0,1000,1,0,,false");
    }

    #[test]
    fn counters() {
        let report = sample_report();
        assert!(report.opened());
        assert!(report.exited());
        assert_eq!(report.execute_attempts(), 2);
        assert_eq!(report.failed_attempts(), 0);
        assert_eq!(report.quote_gained(), 1000);
    }

    #[test]
    fn summary_sections() {
        let md = generate_summary(&sample_report());
        assert!(md.contains("# Keeper Run: sample"));
        assert!(md.contains("## Exit"));
        assert!(md.contains("| Keeper | keeper-0 |"));
        assert!(md.contains("| USDC (base) | 3000 | 0 |"));
        assert!(md.contains("2 attempts, 0 rolled back, 1 no-ops"));
    }

    #[test]
    fn summary_reports_rejected_open() {
        let mut report = sample_report();
        report.position = None;
        report.exit = None;
        report.open_error = Some("zero amount".into());
        let md = generate_summary(&report);
        assert!(md.contains("**rejected**: zero amount"));
        assert!(md.contains("No exit."));
    }
}

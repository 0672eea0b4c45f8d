//! Run many scenarios in parallel.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ScenarioConfig, ScenarioId};
use crate::keeper::run_scenario;
use crate::report::KeeperReport;

/// Outcome of one scenario in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub scenario_id: ScenarioId,
    /// `Err` holds the run error message; the rest of the batch still runs.
    pub outcome: Result<KeeperReport, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub scenarios: usize,
    pub errored: usize,
    pub opened: usize,
    pub exited: usize,
    /// Orders still active at the end of their path.
    pub still_active: usize,
    pub execute_attempts: usize,
    pub failed_attempts: usize,
}

impl BatchSummary {
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut summary = BatchSummary {
            scenarios: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match &entry.outcome {
                Ok(report) => {
                    summary.opened += usize::from(report.opened());
                    summary.exited += usize::from(report.exited());
                    summary.still_active += usize::from(report.final_order.is_active);
                    summary.execute_attempts += report.execute_attempts();
                    summary.failed_attempts += report.failed_attempts();
                }
                Err(_) => summary.errored += 1,
            }
        }
        summary
    }
}

/// Run every scenario; in parallel on the rayon pool when `parallel` is set.
///
/// Results come back in input order either way. `progress` is called with
/// `(completed, total)` after each scenario.
pub fn run_batch<F>(configs: &[ScenarioConfig], parallel: bool, progress: F) -> Vec<BatchEntry>
where
    F: Fn(usize, usize) + Sync + Send,
{
    let total = configs.len();
    let completed = std::sync::atomic::AtomicUsize::new(0);
    let run_one = |config: &ScenarioConfig| {
        let entry = BatchEntry {
            name: config.name.clone(),
            scenario_id: config.scenario_id(),
            outcome: run_scenario(config).map_err(|e| e.to_string()),
        };
        let done = completed.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        progress(done, total);
        entry
    };

    if parallel {
        configs.par_iter().map(run_one).collect()
    } else {
        configs.iter().map(run_one).collect()
    }
}

/// One row per scenario.
///
/// Columns: name, scenario_id, status, exit_step, exit_tick, exit_keeper,
/// quote_gained, attempts, failed, error
pub fn export_batch_csv(entries: &[BatchEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "name",
        "scenario_id",
        "status",
        "exit_step",
        "exit_tick",
        "exit_keeper",
        "quote_gained",
        "attempts",
        "failed",
        "error",
    ])?;

    for entry in entries {
        let row: [String; 10] = match &entry.outcome {
            Ok(report) => {
                let status = match (&report.exit, report.opened()) {
                    (Some(_), _) => "exited",
                    (None, true) => "active",
                    (None, false) => "rejected",
                };
                [
                    entry.name.clone(),
                    entry.scenario_id.clone(),
                    status.to_string(),
                    report.exit.as_ref().map(|e| e.step.to_string()).unwrap_or_default(),
                    report.exit.as_ref().map(|e| e.tick.to_string()).unwrap_or_default(),
                    report.exit.as_ref().map(|e| e.keeper.to_string()).unwrap_or_default(),
                    report.quote_gained().to_string(),
                    report.execute_attempts().to_string(),
                    report.failed_attempts().to_string(),
                    report.open_error.clone().unwrap_or_default(),
                ]
            }
            Err(err) => [
                entry.name.clone(),
                entry.scenario_id.clone(),
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                err.clone(),
            ],
        };
        wtr.write_record(row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

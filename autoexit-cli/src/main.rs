//! AutoExit CLI: run keeper scenarios against the simulated market.
//!
//! Commands:
//! - `run`: run one scenario file and print or save its report
//! - `batch`: run many scenario files in parallel and summarize
//! - `check`: validate a scenario file without running it

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use autoexit_runner::{
    export_batch_csv, export_json, generate_summary, run_batch, run_scenario, save_report,
    BatchSummary, KeeperReport, ScenarioConfig,
};
use clap::{Parser, Subcommand};
use logging::LogFormat;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "autoexit",
    about = "AutoExit: range-order stop-loss controller and keeper simulator"
)]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. `info`, `autoexit::keeper=debug`).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario to the end of its price path.
    Run {
        /// Path to a TOML scenario file.
        #[arg(long)]
        scenario: PathBuf,

        /// Save report.json, steps.csv and summary.md under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full report as JSON instead of the Markdown summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run several scenarios and print one line per scenario.
    Batch {
        /// Scenario files.
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Run one scenario at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Also write the per-scenario table as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Parse and validate a scenario file.
    Check {
        #[arg(long)]
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
            json,
        } => run_cmd(&scenario, output_dir.as_deref(), json),
        Commands::Batch {
            scenarios,
            sequential,
            csv,
        } => batch_cmd(&scenarios, !sequential, csv.as_deref()),
        Commands::Check { scenario } => check_cmd(&scenario),
    }
}

fn run_cmd(path: &Path, output_dir: Option<&Path>, json: bool) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    info!(target: "autoexit::cli", scenario = %config.name, id = %config.scenario_id(), "scenario loaded");
    let report = run_scenario(&config)?;

    if json {
        println!("{}", export_json(&report)?);
    } else {
        print!("{}", generate_summary(&report));
    }

    if let Some(dir) = output_dir {
        let run_dir = save_report(&report, dir)?;
        eprintln!("Report saved to: {}", run_dir.display());
    }
    Ok(())
}

fn batch_cmd(paths: &[PathBuf], parallel: bool, csv_path: Option<&Path>) -> Result<()> {
    let configs = paths
        .iter()
        .map(|p| ScenarioConfig::load(p).with_context(|| format!("loading {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let entries = run_batch(&configs, parallel, |done, total| {
        eprintln!("[{done}/{total}] scenarios finished");
    });

    println!(
        "{:<24} {:<10} {:>8} {:>10} {:>22} {:>9}",
        "Scenario", "Status", "Step", "Tick", "Quote Gained", "Attempts"
    );
    println!("{}", "-".repeat(88));
    for entry in &entries {
        match &entry.outcome {
            Ok(report) => print_row(&entry.name, report),
            Err(err) => println!("{:<24} {:<10} {err}", entry.name, "error"),
        }
    }

    let summary = BatchSummary::from_entries(&entries);
    println!();
    println!(
        "{} scenarios: {} exited, {} still active, {} rejected at open, {} errored",
        summary.scenarios,
        summary.exited,
        summary.still_active,
        summary.scenarios - summary.errored - summary.opened,
        summary.errored
    );
    println!(
        "{} executions, {} rolled back",
        summary.execute_attempts, summary.failed_attempts
    );

    if let Some(path) = csv_path {
        std::fs::write(path, export_batch_csv(&entries)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("CSV saved to: {}", path.display());
    }

    if summary.errored > 0 {
        bail!("{} scenario(s) failed", summary.errored);
    }
    Ok(())
}

fn print_row(name: &str, report: &KeeperReport) {
    let (status, step, tick) = match &report.exit {
        Some(exit) => ("exited", exit.step.to_string(), exit.tick.to_string()),
        None if report.opened() => ("active", "-".into(), "-".into()),
        None => ("rejected", "-".into(), "-".into()),
    };
    println!(
        "{:<24} {:<10} {:>8} {:>10} {:>22} {:>9}",
        name,
        status,
        step,
        tick,
        report.quote_gained(),
        report.execute_attempts()
    );
}

fn check_cmd(path: &Path) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    let params = config.order_params()?;
    println!("Scenario:   {}", config.name);
    println!("Id:         {}", config.scenario_id());
    println!(
        "Order:      {} {} in [{}, {}) fee {}",
        params.committed_amount,
        params.base_asset,
        params.lower_tick,
        params.upper_tick,
        params.fee_tier
    );
    println!(
        "Keepers:    {} (every {} step(s))",
        config.keepers.count, config.keepers.stride
    );
    println!("Failures:   {}", config.failures.len());
    if !config.description.is_empty() {
        println!("{}", config.description);
    }
    Ok(())
}

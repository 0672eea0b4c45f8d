//! AutoExit Runner: scenario configs, keeper polling, batch runs, reports.
//!
//! This crate builds on `autoexit-core` to provide:
//! - TOML scenario files with content-addressed ids
//! - Seeded price paths (explicit or random walk)
//! - A keeper fleet racing to execute the exit against a simulated market
//! - Failure injection at chosen steps
//! - Parallel batch runs and JSON/CSV/Markdown reports

pub mod batch;
pub mod config;
pub mod keeper;
pub mod path;
pub mod report;

pub use batch::{export_batch_csv, run_batch, BatchEntry, BatchSummary};
pub use config::{ScenarioConfig, ScenarioError, ScenarioId};
pub use keeper::{keeper_accounts, run_scenario, KeeperError};
pub use report::{
    export_json, export_steps_csv, generate_summary, import_json, load_report, save_report,
    KeeperReport, StepRecord, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn scenario_config_is_send_sync() {
        assert_send::<ScenarioConfig>();
        assert_sync::<ScenarioConfig>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<KeeperReport>();
        assert_sync::<KeeperReport>();
        assert_send::<BatchEntry>();
        assert_sync::<BatchEntry>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<KeeperError>();
        assert_sync::<KeeperError>();
    }
}

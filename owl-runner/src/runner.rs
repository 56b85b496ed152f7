//! Backtest runner: wires together config, data loading, engine, and metrics.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads the CSV files named in the config, then runs. Used by CLI.
//! - `run_backtest_from_data()`: takes pre-loaded bars. No I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use owl_core::domain::{filter_by_date, Bar};
use owl_core::{Engine, RunResult};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_data, LoadError};
use crate::metrics::PerformanceReport;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("no {series} bars between {start} and {end}")]
    EmptyRange {
        series: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl From<owl_core::ConfigError> for RunError {
    fn from(e: owl_core::ConfigError) -> Self {
        RunError::Config(ConfigError::Invalid(e))
    }
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 over the config fingerprint and the dataset hash.
    pub run_id: RunId,
    pub config_fingerprint: RunId,
    pub dataset_hash: String,
    pub config: BacktestConfig,
    pub report: PerformanceReport,
    pub run: RunResult,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn symbol(&self) -> &str {
        &self.run.symbol
    }
}

/// Run a single backtest from a BacktestConfig, reading both CSV files.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_data(&config.data)?;
    run_backtest_from_data(config, &loaded.daily, &loaded.hourly, &loaded.dataset_hash)
}

/// Run a backtest on pre-loaded bars.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    daily: &[Bar],
    hourly: &[Bar],
    dataset_hash: &str,
) -> Result<BacktestResult, RunError> {
    let params = config.validate()?;
    if filter_by_date(daily, params.start_date, params.end_date).is_empty() {
        return Err(RunError::EmptyRange {
            series: "daily",
            start: params.start_date,
            end: params.end_date,
        });
    }

    let config_fingerprint = config.fingerprint()?;
    let run_id = blake3::hash(format!("{config_fingerprint}:{dataset_hash}").as_bytes())
        .to_hex()
        .to_string();

    let engine = Engine::from_params(params)?;
    let run = engine.run(daily, hourly);

    let report = PerformanceReport::compute(
        &run.snapshots,
        &run.trades,
        config.backtest.initial_capital,
        config.backtest.risk_free_rate,
    );
    info!(
        run_id = &run_id[..12],
        final_value = report.final_value,
        return_pct = report.total_return_pct,
        trades = report.total_trades,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config_fingerprint,
        dataset_hash: dataset_hash.to_string(),
        config: config.clone(),
        report,
        run,
    })
}

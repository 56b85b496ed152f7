//! Owl Runner: backtest orchestration around the core engine.
//!
//! This crate builds on `owl-core` to provide:
//! - TOML run configuration and a deterministic config fingerprint
//! - CSV bar loading for the daily and hourly series
//! - Single-backtest runner producing a `BacktestResult`
//! - Performance report (return, drawdown, Sharpe, commission)
//! - Artifact export (manifest.json, trades.csv, snapshots.csv)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_bars_csv, load_data, LoadError, LoadedData};
pub use export::{load_artifacts, save_artifacts};
pub use metrics::PerformanceReport;
pub use runner::{run_backtest_from_data, run_single_backtest, BacktestResult, RunError};

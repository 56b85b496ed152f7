//! Owl Core: breakout backtest engine.
//!
//! This crate contains the simulation itself:
//! - Domain types (bars, positions, trade records, snapshots, ledger)
//! - Strategy configuration and validation
//! - N-period high breakout signal
//! - Fine-grained price resolution for buy and sell instants
//! - Order simulation with proportional commission
//! - Day-by-day main loop producing a `RunResult`
//!
//! No I/O happens here. Loading CSVs, TOML and writing artifacts lives in
//! `owl-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod signal;

pub use config::{ConfigError, StrategyConfig, StrategyParams};
pub use engine::{run_backtest, Engine, RunResult};

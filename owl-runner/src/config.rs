//! TOML run configuration.
//!
//! One file describes one backtest:
//!
//! ```toml
//! [backtest]
//! symbol = "BTC/USDT"
//! initial_capital = 10000.0
//! commission_rate = 0.001
//! start_date = "2024-01-01"
//! end_date = "2024-06-30"
//!
//! [data]
//! daily_csv = "data/btc_1d.csv"
//! hourly_csv = "data/btc_1h.csv"
//!
//! [strategy]
//! lookback_period = 20
//! holding_period_hours = 24
//! buy_cash_percentage = 0.5
//! sell_asset_percentage = 1.0
//! buy_window_end_time = "16:00"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use owl_core::config::EXCHANGE_UTC_OFFSET_HOURS;
use owl_core::{StrategyConfig, StrategyParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content-addressable identifier (BLAKE3 hex).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid strategy parameters: {0}")]
    Invalid(#[from] owl_core::ConfigError),
    #[error("risk_free_rate must be a finite rate above -1, got {0}")]
    RiskFreeRate(f64),
    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub data: DataSection,
    pub strategy: StrategySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub start_date: String,
    pub end_date: String,
    /// Annual rate used by the Sharpe ratio.
    #[serde(default)]
    pub risk_free_rate: f64,
}

/// Bar files. Relative paths are resolved against the config file's directory
/// by [`BacktestConfig::from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub daily_csv: PathBuf,
    pub hourly_csv: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    pub lookback_period: i64,
    pub holding_period_hours: i64,
    pub buy_cash_percentage: f64,
    pub sell_asset_percentage: f64,
    pub buy_window_end_time: String,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_utc_offset_hours() -> i32 {
    EXCHANGE_UTC_OFFSET_HOURS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BacktestConfig {
    /// Parse a TOML config file. Relative data paths become relative to the
    /// file's own directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.data.daily_csv = resolve(dir, &config.data.daily_csv);
            config.data.hourly_csv = resolve(dir, &config.data.hourly_csv);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// The engine's view of this config.
    pub fn to_strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            symbol: self.backtest.symbol.clone(),
            initial_capital: self.backtest.initial_capital,
            lookback_period: self.strategy.lookback_period,
            commission_rate: self.backtest.commission_rate,
            holding_period_hours: self.strategy.holding_period_hours,
            buy_cash_percentage: self.strategy.buy_cash_percentage,
            sell_asset_percentage: self.strategy.sell_asset_percentage,
            buy_window_end_time: self.strategy.buy_window_end_time.clone(),
            utc_offset_hours: self.strategy.utc_offset_hours,
            start_date: self.backtest.start_date.clone(),
            end_date: self.backtest.end_date.clone(),
        }
    }

    /// Validate everything the run depends on.
    pub fn validate(&self) -> Result<StrategyParams, ConfigError> {
        let params = self.to_strategy_config().validate()?;
        let rfr = self.backtest.risk_free_rate;
        if !rfr.is_finite() || rfr <= -1.0 {
            return Err(ConfigError::RiskFreeRate(rfr));
        }
        Ok(params)
    }

    /// BLAKE3 of the canonical JSON of the `[backtest]` and `[strategy]`
    /// sections. Data paths and log level do not affect the result, so they
    /// are left out.
    pub fn fingerprint(&self) -> Result<RunId, ConfigError> {
        let canonical = serde_json::to_vec(&FingerprintView {
            backtest: &self.backtest,
            strategy: &self.strategy,
        })?;
        Ok(blake3::hash(&canonical).to_hex().to_string())
    }
}

#[derive(Serialize)]
struct FingerprintView<'a> {
    backtest: &'a BacktestSection,
    strategy: &'a StrategySection,
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

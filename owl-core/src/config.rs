//! Strategy configuration and its validation.
//!
//! `StrategyConfig` is the serializable surface (what a TOML file carries).
//! `StrategyConfig::validate()` turns it into `StrategyParams`, the typed,
//! range-checked form the engine runs on. Validation is the only place a
//! run can fail; everything after it degrades per day instead of aborting.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// UTC offset of the exchange clock the buy window is expressed in (UTC+8).
pub const EXCHANGE_UTC_OFFSET_HOURS: i32 = 8;

/// Errors raised before the simulation starts. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("lookback_period must be a positive integer, got {0}")]
    LookbackPeriod(i64),
    #[error("commission_rate must be in [0, 1), got {0}")]
    CommissionRate(f64),
    #[error("holding_period_hours must be a positive integer, got {0}")]
    HoldingPeriod(i64),
    #[error("buy_cash_percentage must be in (0, 1], got {0}")]
    BuyCashPercentage(f64),
    #[error("sell_asset_percentage must be in (0, 1], got {0}")]
    SellAssetPercentage(f64),
    #[error("buy_window_end_time must be HH:MM, got '{0}'")]
    BuyWindowTime(String),
    #[error("{field} must be YYYY-MM-DD, got '{value}'")]
    Date { field: &'static str, value: String },
    #[error("start_date {start} is after end_date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },
    #[error("initial_capital must be positive, got {0}")]
    InitialCapital(f64),
    #[error("utc_offset_hours must be within -23..=23, got {0}")]
    UtcOffset(i32),
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Serializable strategy configuration. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub symbol: String,
    pub initial_capital: f64,
    /// N: number of preceding coarse bars in the breakout lookback.
    pub lookback_period: i64,
    pub commission_rate: f64,
    pub holding_period_hours: i64,
    pub buy_cash_percentage: f64,
    pub sell_asset_percentage: f64,
    /// Local exchange clock time, "HH:MM".
    pub buy_window_end_time: String,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Inclusive, "YYYY-MM-DD".
    pub start_date: String,
    /// Inclusive, "YYYY-MM-DD".
    pub end_date: String,
}

fn default_utc_offset_hours() -> i32 {
    EXCHANGE_UTC_OFFSET_HOURS
}

/// Validated, typed strategy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub symbol: String,
    pub initial_capital: f64,
    pub lookback_period: usize,
    pub commission_rate: f64,
    pub holding_period: Duration,
    pub buy_cash_percentage: f64,
    pub sell_asset_percentage: f64,
    pub buy_window_end: NaiveTime,
    pub local_offset: FixedOffset,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl StrategyConfig {
    /// Check every parameter range and parse the string fields.
    pub fn validate(&self) -> Result<StrategyParams, ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(ConfigError::InitialCapital(self.initial_capital));
        }
        if self.lookback_period <= 0 {
            return Err(ConfigError::LookbackPeriod(self.lookback_period));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(ConfigError::CommissionRate(self.commission_rate));
        }
        if self.holding_period_hours <= 0 {
            return Err(ConfigError::HoldingPeriod(self.holding_period_hours));
        }
        if !in_unit_interval(self.buy_cash_percentage) {
            return Err(ConfigError::BuyCashPercentage(self.buy_cash_percentage));
        }
        if !in_unit_interval(self.sell_asset_percentage) {
            return Err(ConfigError::SellAssetPercentage(
                self.sell_asset_percentage,
            ));
        }

        let buy_window_end = parse_clock(&self.buy_window_end_time)?;

        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(ConfigError::UtcOffset(self.utc_offset_hours));
        }
        let local_offset = FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or(ConfigError::UtcOffset(self.utc_offset_hours))?;

        let start_date = parse_date("start_date", &self.start_date)?;
        let end_date = parse_date("end_date", &self.end_date)?;
        if start_date > end_date {
            return Err(ConfigError::DateRange {
                start: start_date,
                end: end_date,
            });
        }

        Ok(StrategyParams {
            symbol: self.symbol.clone(),
            initial_capital: self.initial_capital,
            lookback_period: self.lookback_period as usize,
            commission_rate: self.commission_rate,
            holding_period: Duration::hours(self.holding_period_hours),
            buy_cash_percentage: self.buy_cash_percentage,
            sell_asset_percentage: self.sell_asset_percentage,
            buy_window_end,
            local_offset,
            start_date,
            end_date,
        })
    }
}

/// (0, 1]
fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn parse_clock(raw: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = raw.trim();
    // Exactly HH:MM; chrono alone would also accept a single-digit hour.
    if trimmed.len() != 5 {
        return Err(ConfigError::BuyWindowTime(raw.to_string()));
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| ConfigError::BuyWindowTime(raw.to_string()))
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ConfigError::Date {
        field,
        value: raw.to_string(),
    })
}

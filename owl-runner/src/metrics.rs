//! Performance report: pure functions over the snapshot history and trade log.
//!
//! No dependencies on the data pipeline or the engine loop. Percentages are
//! in percent (12.5 means 12.5%), drawdown is negative or zero.

use owl_core::domain::{OrderSide, PortfolioSnapshot, TradeRecord};
use serde::{Deserialize, Serialize};

/// Periods per year used to annualize per-step returns.
pub const PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub max_drawdown_pct: f64,
    /// `None` with fewer than two returns or zero volatility.
    pub sharpe_ratio: Option<f64>,
    pub total_commission: f64,
}

impl PerformanceReport {
    pub fn compute(
        snapshots: &[PortfolioSnapshot],
        trades: &[TradeRecord],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let values: Vec<f64> = snapshots.iter().map(|s| s.total_value).collect();
        let final_value = values.last().copied().unwrap_or(initial_capital);
        let buy_trades = trades.iter().filter(|t| t.side == OrderSide::Buy).count();

        Self {
            initial_capital,
            final_value,
            total_return_pct: total_return_pct(initial_capital, final_value),
            total_trades: trades.len(),
            buy_trades,
            sell_trades: trades.len() - buy_trades,
            max_drawdown_pct: max_drawdown_pct(&values),
            sharpe_ratio: sharpe_ratio(&values, risk_free_rate),
            total_commission: trades.iter().map(|t| t.commission).sum(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_return_pct(initial: f64, final_value: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_value - initial) / initial * 100.0
}

/// Largest peak-to-trough decline, as a negative percentage.
pub fn max_drawdown_pct(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.min((v - peak) / peak);
        }
    }
    max_dd * 100.0
}

/// Simple returns between consecutive values. Steps from a non-positive
/// value are skipped.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annual rate to the equivalent per-period rate.
pub fn periodic_rate(annual: f64) -> f64 {
    if annual == 0.0 {
        return 0.0;
    }
    (1.0 + annual).powf(1.0 / PERIODS_PER_YEAR) - 1.0
}

/// Annualized Sharpe ratio: mean(excess) / std(excess) * sqrt(252).
pub fn sharpe_ratio(values: &[f64], annual_risk_free_rate: f64) -> Option<f64> {
    let rf = periodic_rate(annual_risk_free_rate);
    let excess: Vec<f64> = period_returns(values).iter().map(|r| r - rf).collect();
    if excess.len() < 2 {
        return None;
    }
    let std = std_dev(&excess);
    if std < 1e-15 {
        return None;
    }
    Some(mean_f64(&excess) / std * PERIODS_PER_YEAR.sqrt())
}

fn mean_f64(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1).
fn std_dev(xs: &[f64]) -> f64 {
    let mean = mean_f64(xs);
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

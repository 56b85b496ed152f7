//! Loop state, per-run diagnostics and the run result.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{PortfolioSnapshot, Position, TradeRecord};

/// Main-loop state. `Holding` from a filled buy until the next filled sell;
/// a partial sell leaves asset in the ledger but still moves to `Flat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingState {
    #[default]
    Flat,
    Holding,
}

/// Mutable bookkeeping carried from one coarse step to the next.
#[derive(Debug, Clone, Default)]
pub struct LoopContext {
    pub state: TradingState,
    /// Last valid coarse close (for revaluation carry-forward).
    pub last_valid_close: Option<f64>,
    /// BUY signals fired, filled or not.
    pub signal_count: usize,
    /// Days on which an exit was due but no sell price resolved.
    pub unresolved_sell_days: usize,
    pub data_quality_warnings: Vec<String>,
}

impl LoopContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn data_quality(&mut self, message: String) {
        warn!("{message}");
        self.data_quality_warnings.push(message);
    }
}

/// Output of a complete run, handed to reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub symbol: String,
    pub trades: Vec<TradeRecord>,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_asset_quantity: f64,
    pub open_position: Option<Position>,
    pub final_state: TradingState,
    /// Coarse bars processed (after date filtering).
    pub bar_count: usize,
    pub signal_count: usize,
    pub unresolved_sell_days: usize,
    pub data_quality_warnings: Vec<String>,
}

impl RunResult {
    /// Total value of the last snapshot, or the initial cash if none was taken.
    pub fn final_value(&self) -> f64 {
        self.snapshots
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.initial_cash)
    }
}

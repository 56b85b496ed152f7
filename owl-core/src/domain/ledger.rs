//! Ledger: exclusively owned cash/asset state for one run.

use super::position::Position;
use super::snapshot::PortfolioSnapshot;
use super::trade::TradeRecord;
use chrono::{DateTime, Utc};

/// Cash, asset quantity, the open position and the two append-only logs.
///
/// Created once per run with the initial cash, mutated only by the order
/// simulator (fills) and the main loop (snapshots). Invariants:
/// - `cash >= 0` and `asset_quantity >= 0`
/// - at most one open position; `position.is_some()` iff `asset_quantity > 0`
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) initial_cash: f64,
    pub(crate) cash: f64,
    pub(crate) asset_quantity: f64,
    pub(crate) position: Option<Position>,
    pub(crate) trades: Vec<TradeRecord>,
    pub(crate) snapshots: Vec<PortfolioSnapshot>,
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            asset_quantity: 0.0,
            position: None,
            trades: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn asset_quantity(&self) -> f64 {
        self.asset_quantity
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    /// Revalue at `price` and append the snapshot to the history.
    pub fn record_snapshot(&mut self, timestamp: DateTime<Utc>, price: f64) -> &PortfolioSnapshot {
        let snapshot =
            PortfolioSnapshot::revalue(timestamp, self.cash, self.asset_quantity, price);
        self.snapshots.push(snapshot);
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Consume the ledger, handing back the trade log and snapshot history.
    pub fn into_history(self) -> (Vec<TradeRecord>, Vec<PortfolioSnapshot>) {
        (self.trades, self.snapshots)
    }
}

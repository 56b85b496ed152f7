use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger valuation at the end of one coarse step.
///
/// `total_value == cash + asset_quantity * price` holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub asset_quantity: f64,
    /// Price used for revaluation.
    pub price: f64,
    pub asset_value: f64,
    pub total_value: f64,
}

impl PortfolioSnapshot {
    pub fn revalue(timestamp: DateTime<Utc>, cash: f64, asset_quantity: f64, price: f64) -> Self {
        let asset_value = asset_quantity * price;
        Self {
            timestamp,
            cash,
            asset_quantity,
            price,
            asset_value,
            total_value: cash + asset_value,
        }
    }
}

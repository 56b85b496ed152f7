use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single open long position, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        quantity: f64,
        entry_price: f64,
        entry_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            entry_price,
            entry_timestamp,
        }
    }

    /// Add a fill at a quantity-weighted entry price. The entry timestamp
    /// moves to the latest fill.
    pub fn add_fill(&mut self, quantity: f64, price: f64, timestamp: DateTime<Utc>) {
        let total = self.quantity + quantity;
        self.entry_price = (self.quantity * self.entry_price + quantity * price) / total;
        self.quantity = total;
        self.entry_timestamp = timestamp;
    }
}

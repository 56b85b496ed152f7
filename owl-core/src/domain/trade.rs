//! TradeRecord: one executed fill in the append-only trade log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side. The strategy is long-only: buys open, sells reduce or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("BUY"),
            OrderSide::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order side '{0}' (expected BUY or SELL)")]
pub struct UnknownOrderSide(pub String);

impl FromStr for OrderSide {
    type Err = UnknownOrderSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(UnknownOrderSide(s.to_string())),
        }
    }
}

/// A single executed order.
///
/// `value` is `price * quantity` before commission: the cost of a buy or
/// the gross proceeds of a sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade(side: OrderSide) -> TradeRecord {
        TradeRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap(),
            symbol: "BTC/USDT".into(),
            side,
            price: 100.0,
            quantity: 5.0,
            commission: 0.5,
            value: 500.0,
        }
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("buy".parse::<OrderSide>(), Ok(OrderSide::Buy));
        assert_eq!(" SELL ".parse::<OrderSide>(), Ok(OrderSide::Sell));
        assert!("SHORT".parse::<OrderSide>().is_err());
    }

    #[test]
    fn side_serializes_uppercase() {
        let json = serde_json::to_string(&sample_trade(OrderSide::Sell)).unwrap();
        assert!(json.contains("\"side\":\"SELL\""));
    }
}

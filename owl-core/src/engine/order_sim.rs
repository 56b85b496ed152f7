//! Order simulation: applies a priced order to the ledger.
//!
//! Business-rule violations (bad price or quantity, not enough cash or
//! asset) are reported as `OrderOutcome::Rejected` and leave the ledger
//! untouched. Nothing here returns `Err`; the caller decides whether to log,
//! skip or retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::domain::{Ledger, OrderSide, Position, TradeRecord};

/// A concrete order at a resolved price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn buy(price: f64, quantity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            side: OrderSide::Buy,
            price,
            quantity,
            timestamp,
        }
    }

    pub fn sell(price: f64, quantity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            side: OrderSide::Sell,
            price,
            quantity,
            timestamp,
        }
    }
}

/// Why an order was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    NonPositivePrice { price: f64 },
    NonPositiveQuantity { quantity: f64 },
    InsufficientCash { required: f64, available: f64 },
    InsufficientAsset { requested: f64, available: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NonPositivePrice { price } => {
                write!(f, "price must be positive, got {price}")
            }
            RejectReason::NonPositiveQuantity { quantity } => {
                write!(f, "quantity must be positive, got {quantity}")
            }
            RejectReason::InsufficientCash {
                required,
                available,
            } => write!(
                f,
                "not enough cash: required {required:.2}, available {available:.2}"
            ),
            RejectReason::InsufficientAsset {
                requested,
                available,
            } => write!(
                f,
                "not enough asset: requested {requested}, available {available}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Filled(TradeRecord),
    Rejected(RejectReason),
}

impl OrderOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, OrderOutcome::Filled(_))
    }
}

/// Applies orders for one symbol with a proportional commission.
#[derive(Debug, Clone)]
pub struct OrderSimulator {
    symbol: String,
    commission_rate: f64,
}

impl OrderSimulator {
    pub fn new(symbol: impl Into<String>, commission_rate: f64) -> Self {
        Self {
            symbol: symbol.into(),
            commission_rate,
        }
    }

    /// Apply `order` to `ledger`, or reject it without mutation.
    pub fn execute(&self, ledger: &mut Ledger, order: &Order) -> OrderOutcome {
        let outcome = match check_order(order) {
            Err(reason) => OrderOutcome::Rejected(reason),
            Ok(()) => match order.side {
                OrderSide::Buy => self.apply_buy(ledger, order),
                OrderSide::Sell => self.apply_sell(ledger, order),
            },
        };

        match &outcome {
            OrderOutcome::Filled(trade) => info!(
                side = %trade.side,
                price = trade.price,
                quantity = trade.quantity,
                commission = trade.commission,
                cash = ledger.cash,
                "order filled"
            ),
            OrderOutcome::Rejected(reason) => warn!(
                side = %order.side,
                price = order.price,
                quantity = order.quantity,
                %reason,
                "order rejected"
            ),
        }
        outcome
    }

    fn apply_buy(&self, ledger: &mut Ledger, order: &Order) -> OrderOutcome {
        let value = order.price * order.quantity;
        let commission = value * self.commission_rate;
        let total_cost = value + commission;
        if ledger.cash < total_cost {
            return OrderOutcome::Rejected(RejectReason::InsufficientCash {
                required: total_cost,
                available: ledger.cash,
            });
        }

        ledger.cash -= total_cost;
        ledger.asset_quantity += order.quantity;
        match ledger.position.as_mut() {
            // Leftover from a partial exit joins the new entry.
            Some(pos) => pos.add_fill(order.quantity, order.price, order.timestamp),
            None => {
                ledger.position = Some(Position::new(
                    self.symbol.clone(),
                    order.quantity,
                    order.price,
                    order.timestamp,
                ))
            }
        }
        self.record(ledger, order, value, commission)
    }

    fn apply_sell(&self, ledger: &mut Ledger, order: &Order) -> OrderOutcome {
        if ledger.asset_quantity < order.quantity {
            return OrderOutcome::Rejected(RejectReason::InsufficientAsset {
                requested: order.quantity,
                available: ledger.asset_quantity,
            });
        }

        let value = order.price * order.quantity;
        let commission = value * self.commission_rate;

        ledger.cash += value - commission;
        if order.quantity == ledger.asset_quantity {
            ledger.asset_quantity = 0.0;
            ledger.position = None;
        } else {
            ledger.asset_quantity -= order.quantity;
            if let Some(pos) = ledger.position.as_mut() {
                pos.quantity = ledger.asset_quantity;
            }
        }
        self.record(ledger, order, value, commission)
    }

    fn record(&self, ledger: &mut Ledger, order: &Order, value: f64, commission: f64) -> OrderOutcome {
        let trade = TradeRecord {
            timestamp: order.timestamp,
            symbol: self.symbol.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            commission,
            value,
        };
        ledger.trades.push(trade.clone());
        OrderOutcome::Filled(trade)
    }
}

fn check_order(order: &Order) -> Result<(), RejectReason> {
    if !(order.price.is_finite() && order.price > 0.0) {
        return Err(RejectReason::NonPositivePrice { price: order.price });
    }
    if !(order.quantity.is_finite() && order.quantity > 0.0) {
        return Err(RejectReason::NonPositiveQuantity {
            quantity: order.quantity,
        });
    }
    Ok(())
}

//! Domain types for the breakout backtester

pub mod bar;
pub mod ledger;
pub mod position;
pub mod snapshot;
pub mod trade;

pub use bar::{filter_by_date, is_chronological, Bar};
pub use ledger::Ledger;
pub use position::Position;
pub use snapshot::PortfolioSnapshot;
pub use trade::{OrderSide, TradeRecord, UnknownOrderSide};

//! Backtesting engine: the day-by-day breakout simulation.
//!
//! One pass over the coarse (daily) series. Each step:
//!
//! 1. Flat: check day D-1 for a breakout, resolve a buy price on the fine
//!    series and submit the order
//! 2. Holding: resolve the exit instant for day D and submit the sell, or
//!    defer to the next day when no price resolves
//! 3. End of day: revalue at D's close and append a snapshot

pub mod loop_runner;
pub mod order_sim;
pub mod price_resolver;
pub mod state;

pub use loop_runner::{run_backtest, Engine};
pub use order_sim::{Order, OrderOutcome, OrderSimulator, RejectReason};
pub use price_resolver::{
    resolve_chain, FineStep, PriceResolver, PriceSource, Resolution, ResolutionWindow,
    ResolvedPrice, BUY_STEPS, SELL_STEPS,
};
pub use state::{LoopContext, RunResult, TradingState};

//! Day-by-day main loop.
//!
//! Three phases per coarse bar D (index `i`):
//! 1. Entry (Flat, `i >= N + 1`): breakout check on D-1, buy-price resolution
//!    on the fine series, buy order
//! 2. Exit (Holding): sell-price resolution anchored at the start of D, sell
//!    order, or deferral when nothing resolves. Any filled sell returns the
//!    loop to Flat, even when part of the asset is left over
//! 3. End-of-day: revalue at D's close and append a snapshot
//!
//! The ledger is owned by the caller for the duration of a run and nothing
//! else touches it, so the loop is strictly sequential and re-entrant.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, StrategyConfig, StrategyParams};
use crate::domain::{filter_by_date, is_chronological, Bar, Ledger};
use crate::signal::{Signal, SignalGenerator};

use super::order_sim::{Order, OrderSimulator};
use super::price_resolver::PriceResolver;
use super::state::{LoopContext, RunResult, TradingState};

/// A configured breakout backtest. Holds no per-run state.
#[derive(Debug, Clone)]
pub struct Engine {
    params: StrategyParams,
    signal: SignalGenerator,
    simulator: OrderSimulator,
}

impl Engine {
    /// Validate `config` and build the engine. Fails before any simulation.
    pub fn new(config: &StrategyConfig) -> Result<Self, ConfigError> {
        Self::from_params(config.validate()?)
    }

    pub fn from_params(params: StrategyParams) -> Result<Self, ConfigError> {
        let signal = SignalGenerator::new(params.lookback_period)
            .map_err(|_| ConfigError::LookbackPeriod(params.lookback_period as i64))?;
        let simulator = OrderSimulator::new(params.symbol.clone(), params.commission_rate);
        Ok(Self {
            params,
            signal,
            simulator,
        })
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run over the configured date range with a fresh ledger.
    pub fn run(&self, coarse: &[Bar], fine: &[Bar]) -> RunResult {
        self.run_with_ledger(Ledger::new(self.params.initial_capital), coarse, fine)
    }

    /// Run over the configured date range, starting from `ledger`.
    pub fn run_with_ledger(&self, mut ledger: Ledger, coarse: &[Bar], fine: &[Bar]) -> RunResult {
        let mut ctx = LoopContext::new();
        if !ledger.is_flat() {
            ctx.state = TradingState::Holding;
        }

        let coarse = self.prepare_series("coarse", coarse, &mut ctx);
        let fine = self.prepare_series("fine", fine, &mut ctx);
        let resolver = PriceResolver::new(
            &fine,
            self.params.local_offset,
            self.params.buy_window_end,
            self.params.holding_period,
        );

        info!(
            symbol = %self.params.symbol,
            coarse_bars = coarse.len(),
            fine_bars = fine.len(),
            lookback = self.params.lookback_period,
            "backtest started"
        );

        for i in 0..coarse.len() {
            self.step(&mut ctx, &mut ledger, &coarse, i, &resolver);
        }

        info!(
            trades = ledger.trades().len(),
            snapshots = ledger.snapshots().len(),
            signals = ctx.signal_count,
            "backtest finished"
        );

        let final_cash = ledger.cash();
        let final_asset_quantity = ledger.asset_quantity();
        let open_position = ledger.position().cloned();
        let initial_cash = ledger.initial_cash();
        let (trades, snapshots) = ledger.into_history();

        RunResult {
            symbol: self.params.symbol.clone(),
            trades,
            snapshots,
            initial_cash,
            final_cash,
            final_asset_quantity,
            open_position,
            final_state: ctx.state,
            bar_count: coarse.len(),
            signal_count: ctx.signal_count,
            unresolved_sell_days: ctx.unresolved_sell_days,
            data_quality_warnings: ctx.data_quality_warnings,
        }
    }

    /// Process coarse bar `i`: entry check, exit check, end-of-day snapshot.
    ///
    /// `coarse` must be chronological. Entry runs before exit, so a position
    /// bought at D-1's window end is already eligible for exit on D.
    ///
    /// # Panics
    ///
    /// Panics if `i >= coarse.len()`. The entry check reads `coarse[i - 1]`
    /// only once `i` is past the lookback, so `i = 0` is always safe.
    pub fn step(
        &self,
        ctx: &mut LoopContext,
        ledger: &mut Ledger,
        coarse: &[Bar],
        i: usize,
        resolver: &PriceResolver<'_>,
    ) {
        let day = &coarse[i];
        let next_day_start = coarse
            .get(i + 1)
            .map(|b| b.timestamp)
            .unwrap_or(day.timestamp + Duration::days(1));

        if ctx.state == TradingState::Flat && i > self.params.lookback_period {
            self.try_enter(ctx, ledger, coarse, i, resolver);
        }

        if ctx.state == TradingState::Holding {
            self.try_exit(ctx, ledger, day.timestamp, next_day_start, resolver);
        }

        self.end_of_day(ctx, ledger, day);
    }

    fn try_enter(
        &self,
        ctx: &mut LoopContext,
        ledger: &mut Ledger,
        coarse: &[Bar],
        i: usize,
        resolver: &PriceResolver<'_>,
    ) {
        let day_start = coarse[i].timestamp;
        let signal_bar = &coarse[i - 1];
        let Some(candidate_high) = signal_bar.valid_high() else {
            ctx.data_quality(format!(
                "{}: missing high, breakout check skipped",
                signal_bar.timestamp
            ));
            return;
        };

        if self.signal.evaluate(&coarse[..i - 1], candidate_high) != Signal::Buy {
            return;
        }
        ctx.signal_count += 1;

        let fill = resolver.resolve_buy(signal_bar, day_start);
        debug!(
            price = fill.price,
            at = %fill.timestamp,
            source = ?fill.source,
            "buy price resolved"
        );
        if !(fill.price.is_finite() && fill.price > 0.0) {
            ctx.data_quality(format!(
                "{}: BUY signal but no usable price ({})",
                signal_bar.timestamp, fill.price
            ));
            return;
        }

        let quantity = ledger.cash() * self.params.buy_cash_percentage / fill.price;
        if quantity.is_nan() || quantity <= 0.0 {
            debug!(cash = ledger.cash(), "BUY signal but quantity is zero");
            return;
        }

        let order = Order::buy(fill.price, quantity, fill.timestamp);
        if self.simulator.execute(ledger, &order).is_filled() {
            ctx.state = TradingState::Holding;
        }
    }

    fn try_exit(
        &self,
        ctx: &mut LoopContext,
        ledger: &mut Ledger,
        day_start: DateTime<Utc>,
        next_day_start: DateTime<Utc>,
        resolver: &PriceResolver<'_>,
    ) {
        let Some(fill) = resolver.resolve_sell(day_start, next_day_start) else {
            ctx.unresolved_sell_days += 1;
            debug!(
                target = %resolver.sell_target(day_start),
                "no fine bar for exit instant, deferring sell"
            );
            return;
        };

        let quantity = ledger.asset_quantity() * self.params.sell_asset_percentage;
        let order = Order::sell(fill.price, quantity, fill.timestamp);
        if self.simulator.execute(ledger, &order).is_filled() {
            ctx.state = TradingState::Flat;
        }
    }

    fn end_of_day(&self, ctx: &mut LoopContext, ledger: &mut Ledger, day: &Bar) {
        let price = match day.valid_close() {
            Some(close) => {
                ctx.last_valid_close = Some(close);
                Some(close)
            }
            None => {
                ctx.data_quality(format!(
                    "{}: missing close, revaluing at last valid close",
                    day.timestamp
                ));
                ctx.last_valid_close
            }
        };

        match price {
            Some(price) => {
                let snapshot = ledger.record_snapshot(day.timestamp, price);
                debug_assert!(snapshot.cash >= 0.0 && snapshot.asset_quantity >= 0.0);
            }
            None => warn!(day = %day.timestamp, "no close available yet, snapshot skipped"),
        }
    }

    /// Restrict to the configured date range and make sure timestamps ascend.
    fn prepare_series(&self, label: &str, bars: &[Bar], ctx: &mut LoopContext) -> Vec<Bar> {
        let mut bars = filter_by_date(bars, self.params.start_date, self.params.end_date);
        if !is_chronological(&bars) {
            ctx.data_quality(format!(
                "{label} series not strictly ascending, sorted and de-duplicated"
            ));
            bars.sort_by_key(|b| b.timestamp);
            bars.dedup_by_key(|b| b.timestamp);
        }
        bars
    }
}

/// Validate `config` and run one backtest over the given series.
pub fn run_backtest(
    config: &StrategyConfig,
    coarse: &[Bar],
    fine: &[Bar],
) -> Result<RunResult, ConfigError> {
    Ok(Engine::new(config)?.run(coarse, fine))
}

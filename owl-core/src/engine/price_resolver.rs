//! Price resolution: turns a decision instant into a tradable (price, time).
//!
//! Coarse bars are too imprecise for fills, so the desired instant is looked
//! up in the fine (hourly) series. Each side has a ranked list of steps tried
//! in order; a step either resolves or passes to the next one.
//!
//! - Buy: exact fine bar, else first fine bar at/after the target before the
//!   next coarse period, else the coarse close of the signal day. The last
//!   step cannot fail, so buy resolution always yields a price.
//! - Sell: exact fine bar, else first fine bar strictly after the target
//!   before the next coarse period. No terminal step: an unresolved sell is
//!   deferred by the caller.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Open of the fine bar stamped exactly at the target.
    ExactFine,
    /// Open of the first later fine bar inside the window.
    ForwardFine,
    /// Close of the signal day's coarse bar.
    CoarseClose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPrice {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub source: PriceSource,
}

/// Target instant plus the exclusive end of the search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionWindow {
    pub target: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One fine-series lookup in a resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FineStep {
    /// Bar whose timestamp equals the target.
    ExactMatch,
    /// Earliest bar with `target <= ts < end`.
    FirstAtOrAfter,
    /// Earliest bar with `target < ts < end`.
    FirstAfter,
}

/// Result of trying one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedPrice),
    Next,
}

pub const BUY_STEPS: &[FineStep] = &[FineStep::ExactMatch, FineStep::FirstAtOrAfter];
pub const SELL_STEPS: &[FineStep] = &[FineStep::ExactMatch, FineStep::FirstAfter];

impl FineStep {
    /// Look the window up in `fine`, which must be sorted by timestamp.
    pub fn attempt(self, fine: &[Bar], window: &ResolutionWindow) -> Resolution {
        match self {
            FineStep::ExactMatch => {
                let idx = fine.partition_point(|b| b.timestamp < window.target);
                match fine.get(idx) {
                    Some(bar) if bar.timestamp == window.target => {
                        resolved(bar, PriceSource::ExactFine)
                    }
                    _ => Resolution::Next,
                }
            }
            FineStep::FirstAtOrAfter => {
                let start = fine.partition_point(|b| b.timestamp < window.target);
                first_tradable(&fine[start..], window.end)
            }
            FineStep::FirstAfter => {
                let start = fine.partition_point(|b| b.timestamp <= window.target);
                first_tradable(&fine[start..], window.end)
            }
        }
    }
}

fn resolved(bar: &Bar, source: PriceSource) -> Resolution {
    match bar.tradable_open() {
        Some(price) => Resolution::Resolved(ResolvedPrice {
            price,
            timestamp: bar.timestamp,
            source,
        }),
        None => Resolution::Next,
    }
}

fn first_tradable(candidates: &[Bar], end: DateTime<Utc>) -> Resolution {
    candidates
        .iter()
        .take_while(|b| b.timestamp < end)
        .find_map(|b| match resolved(b, PriceSource::ForwardFine) {
            Resolution::Resolved(p) => Some(Resolution::Resolved(p)),
            Resolution::Next => None,
        })
        .unwrap_or(Resolution::Next)
}

/// Try `steps` in order and return the first resolved price.
pub fn resolve_chain(
    steps: &[FineStep],
    fine: &[Bar],
    window: &ResolutionWindow,
) -> Option<ResolvedPrice> {
    steps.iter().find_map(|step| match step.attempt(fine, window) {
        Resolution::Resolved(p) => Some(p),
        Resolution::Next => None,
    })
}

/// Resolves buy and sell instants against one fine series.
#[derive(Debug, Clone)]
pub struct PriceResolver<'a> {
    fine: &'a [Bar],
    local_offset: FixedOffset,
    buy_window_end: NaiveTime,
    holding_period: Duration,
}

impl<'a> PriceResolver<'a> {
    pub fn new(
        fine: &'a [Bar],
        local_offset: FixedOffset,
        buy_window_end: NaiveTime,
        holding_period: Duration,
    ) -> Self {
        Self {
            fine,
            local_offset,
            buy_window_end,
            holding_period,
        }
    }

    /// Signal day's own (UTC) date at the buy clock time in the exchange
    /// offset.
    pub fn buy_target(&self, signal_day: DateTime<Utc>) -> DateTime<Utc> {
        let local = signal_day.date_naive().and_time(self.buy_window_end);
        let offset = Duration::seconds(i64::from(self.local_offset.local_minus_utc()));
        Utc.from_utc_datetime(&(local - offset))
    }

    /// Start of the current coarse day plus the holding period.
    pub fn sell_target(&self, day_start: DateTime<Utc>) -> DateTime<Utc> {
        day_start + self.holding_period
    }

    /// Buy price for the signal day `signal_bar`, searching fine bars up to
    /// `next_day_start`. Falls back to the signal day's coarse close.
    pub fn resolve_buy(&self, signal_bar: &Bar, next_day_start: DateTime<Utc>) -> ResolvedPrice {
        let window = ResolutionWindow {
            target: self.buy_target(signal_bar.timestamp),
            end: next_day_start,
        };
        resolve_chain(BUY_STEPS, self.fine, &window).unwrap_or(ResolvedPrice {
            price: signal_bar.close,
            timestamp: signal_bar.timestamp,
            source: PriceSource::CoarseClose,
        })
    }

    /// Sell price for the coarse day starting at `day_start`, or `None` when
    /// no fine bar is available before `next_day_start`.
    pub fn resolve_sell(
        &self,
        day_start: DateTime<Utc>,
        next_day_start: DateTime<Utc>,
    ) -> Option<ResolvedPrice> {
        let window = ResolutionWindow {
            target: self.sell_target(day_start),
            end: next_day_start,
        };
        resolve_chain(SELL_STEPS, self.fine, &window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn fine_bar(t: DateTime<Utc>, open: f64) -> Bar {
        Bar::new(t, open, open + 1.0, open - 1.0, open + 0.5, 10.0)
    }

    fn coarse_bar(t: DateTime<Utc>, close: f64) -> Bar {
        Bar::new(t, close - 1.0, close + 2.0, close - 2.0, close, 1_000.0)
    }

    fn resolver(fine: &[Bar], hold_hours: i64) -> PriceResolver<'_> {
        PriceResolver::new(
            fine,
            FixedOffset::east_opt(8 * 3600).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            Duration::hours(hold_hours),
        )
    }

    #[test]
    fn buy_target_is_local_clock_on_signal_date() {
        let fine: [Bar; 0] = [];
        let r = resolver(&fine, 24);
        // 16:00 at UTC+8 on Jan 2 is 08:00 UTC on Jan 2
        assert_eq!(r.buy_target(ts(2, 0)), ts(2, 8));
    }

    #[test]
    fn buy_target_keeps_signal_date_with_negative_offset() {
        let fine: [Bar; 0] = [];
        let r = PriceResolver::new(
            &fine,
            FixedOffset::west_opt(5 * 3600).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            Duration::hours(24),
        );
        // 16:00 at UTC-5 on Jan 4 is 21:00 UTC on Jan 4, not Jan 3
        let target = r.buy_target(ts(4, 0));
        assert_eq!(target, ts(4, 21));
        assert!(target >= ts(4, 0));
    }

    #[test]
    fn negative_offset_buy_never_fills_on_the_previous_day() {
        let fine = vec![fine_bar(ts(3, 22), 90.0), fine_bar(ts(4, 21), 104.0)];
        let r = PriceResolver::new(
            &fine,
            FixedOffset::west_opt(5 * 3600).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            Duration::hours(24),
        );
        let p = r.resolve_buy(&coarse_bar(ts(4, 0), 95.0), ts(5, 0));
        assert_eq!(p.price, 104.0);
        assert_eq!(p.timestamp, ts(4, 21));
        assert_eq!(p.source, PriceSource::ExactFine);
    }

    #[test]
    fn buy_exact_match_uses_open() {
        let fine = vec![fine_bar(ts(2, 7), 99.0), fine_bar(ts(2, 8), 101.0)];
        let r = resolver(&fine, 24);
        let p = r.resolve_buy(&coarse_bar(ts(2, 0), 95.0), ts(3, 0));
        assert_eq!(p.price, 101.0);
        assert_eq!(p.timestamp, ts(2, 8));
        assert_eq!(p.source, PriceSource::ExactFine);
    }

    #[test]
    fn buy_forward_search_takes_first_bar_after_gap() {
        let fine = vec![fine_bar(ts(2, 7), 99.0), fine_bar(ts(2, 10), 103.0), fine_bar(ts(2, 11), 104.0)];
        let r = resolver(&fine, 24);
        let p = r.resolve_buy(&coarse_bar(ts(2, 0), 95.0), ts(3, 0));
        assert_eq!(p.price, 103.0);
        assert_eq!(p.source, PriceSource::ForwardFine);
    }

    #[test]
    fn buy_falls_back_to_coarse_close() {
        // Only bar after the target lies in the next coarse period.
        let fine = vec![fine_bar(ts(2, 7), 99.0), fine_bar(ts(3, 0), 110.0)];
        let r = resolver(&fine, 24);
        let p = r.resolve_buy(&coarse_bar(ts(2, 0), 95.0), ts(3, 0));
        assert_eq!(p.price, 95.0);
        assert_eq!(p.timestamp, ts(2, 0));
        assert_eq!(p.source, PriceSource::CoarseClose);
    }

    #[test]
    fn buy_with_empty_fine_series_always_resolves() {
        let fine: [Bar; 0] = [];
        let r = resolver(&fine, 24);
        let p = r.resolve_buy(&coarse_bar(ts(2, 0), 95.0), ts(3, 0));
        assert_eq!(p.source, PriceSource::CoarseClose);
    }

    #[test]
    fn untradable_fine_bars_are_skipped() {
        let fine = vec![fine_bar(ts(2, 8), f64::NAN), fine_bar(ts(2, 9), 102.0)];
        let r = resolver(&fine, 24);
        let p = r.resolve_buy(&coarse_bar(ts(2, 0), 95.0), ts(3, 0));
        assert_eq!(p.price, 102.0);
        assert_eq!(p.source, PriceSource::ForwardFine);
    }

    #[test]
    fn sell_exact_match_at_holding_offset() {
        let fine = vec![fine_bar(ts(5, 12), 120.0)];
        let r = resolver(&fine, 12);
        let p = r.resolve_sell(ts(5, 0), ts(6, 0)).unwrap();
        assert_eq!(p.price, 120.0);
        assert_eq!(p.source, PriceSource::ExactFine);
    }

    #[test]
    fn sell_forward_search_is_strictly_after_target() {
        let fine = vec![fine_bar(ts(5, 14), 121.0)];
        let r = resolver(&fine, 12);
        let p = r.resolve_sell(ts(5, 0), ts(6, 0)).unwrap();
        assert_eq!(p.timestamp, ts(5, 14));
        assert_eq!(p.source, PriceSource::ForwardFine);
    }

    #[test]
    fn sell_has_no_terminal_fallback() {
        // Holding 24h from the start of Jan 5 lands on Jan 6 00:00, which is
        // not inside (target, next_day_start); only an exact bar would do.
        let fine = vec![fine_bar(ts(5, 3), 120.0)];
        let r = resolver(&fine, 24);
        assert_eq!(r.resolve_sell(ts(5, 0), ts(6, 0)), None);
    }

    #[test]
    fn sell_exact_match_may_sit_on_next_day_boundary() {
        let fine = vec![fine_bar(ts(6, 0), 130.0)];
        let r = resolver(&fine, 24);
        let p = r.resolve_sell(ts(5, 0), ts(6, 0)).unwrap();
        assert_eq!(p.price, 130.0);
        assert_eq!(p.source, PriceSource::ExactFine);
    }

    #[test]
    fn chain_reports_next_when_every_step_misses() {
        let fine = vec![fine_bar(ts(1, 0), 1.0)];
        let window = ResolutionWindow {
            target: ts(2, 8),
            end: ts(3, 0),
        };
        for step in [FineStep::ExactMatch, FineStep::FirstAtOrAfter, FineStep::FirstAfter] {
            assert_eq!(step.attempt(&fine, &window), Resolution::Next);
        }
        assert_eq!(resolve_chain(SELL_STEPS, &fine, &window), None);
    }
}

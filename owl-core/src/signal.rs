//! N-period high breakout signal.
//!
//! Fires `Buy` when a candidate day's high strictly exceeds the highest high
//! of the N coarse bars preceding it. The generator holds no state besides N,
//! so identical inputs always give the same answer.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("lookback period must be >= 1, got {0}")]
    InvalidLookback(usize),
}

/// Outcome of one breakout evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    None,
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    lookback: usize,
}

impl SignalGenerator {
    pub fn new(lookback: usize) -> Result<Self, SignalError> {
        if lookback == 0 {
            return Err(SignalError::InvalidLookback(lookback));
        }
        Ok(Self { lookback })
    }

    /// Highest high over the last N bars of `history`, or `None` while fewer
    /// than N bars are available.
    ///
    /// `history` must be chronological. Missing (NaN) highs are ignored; if
    /// every high in the window is missing the result is NaN, which never
    /// compares greater.
    pub fn lookback_high(&self, history: &[Bar]) -> Option<f64> {
        if history.len() < self.lookback {
            return None;
        }
        let window = &history[history.len() - self.lookback..];
        Some(window.iter().map(|b| b.high).fold(f64::NAN, f64::max))
    }

    /// Evaluate the breakout for a candidate high against the bars strictly
    /// before the candidate day.
    pub fn evaluate(&self, history_before_target: &[Bar], candidate_high: f64) -> Signal {
        let Some(lookback_high) = self.lookback_high(history_before_target) else {
            debug!(
                have = history_before_target.len(),
                need = self.lookback,
                "warm-up: not enough history for breakout check"
            );
            return Signal::None;
        };

        if candidate_high > lookback_high {
            debug!(candidate_high, lookback_high, "breakout");
            Signal::Buy
        } else {
            Signal::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars_with_highs(highs: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Bar::new(base + Duration::days(i as i64), h - 1.0, h, h - 2.0, h - 0.5, 100.0))
            .collect()
    }

    #[test]
    fn rejects_zero_lookback() {
        assert_eq!(
            SignalGenerator::new(0).unwrap_err(),
            SignalError::InvalidLookback(0)
        );
    }

    #[test]
    fn no_breakout_below_lookback_high() {
        // daily highs [10, 11, 9, 8, 12]: lookback of the first three is 11
        let bars = bars_with_highs(&[10.0, 11.0, 9.0, 8.0, 12.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.lookback_high(&bars[..3]), Some(11.0));
        assert_eq!(sig.evaluate(&bars[..3], 8.0), Signal::None);
    }

    #[test]
    fn breakout_above_lookback_high() {
        let bars = bars_with_highs(&[10.0, 11.0, 9.0, 8.0, 12.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.evaluate(&bars[..3], 15.0), Signal::Buy);
    }

    #[test]
    fn tie_is_not_a_breakout() {
        let bars = bars_with_highs(&[10.0, 11.0, 9.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.evaluate(&bars, 11.0), Signal::None);
    }

    #[test]
    fn uses_only_the_most_recent_n_bars() {
        // 50 is outside a 2-bar window
        let bars = bars_with_highs(&[50.0, 10.0, 12.0]);
        let sig = SignalGenerator::new(2).unwrap();
        assert_eq!(sig.lookback_high(&bars), Some(12.0));
        assert_eq!(sig.evaluate(&bars, 13.0), Signal::Buy);
    }

    #[test]
    fn warmup_yields_none() {
        let bars = bars_with_highs(&[10.0, 11.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.lookback_high(&bars), None);
        assert_eq!(sig.evaluate(&bars, 1_000.0), Signal::None);
        assert_eq!(sig.evaluate(&[], 1_000.0), Signal::None);
    }

    #[test]
    fn missing_highs_are_skipped() {
        let bars = bars_with_highs(&[10.0, f64::NAN, 9.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.lookback_high(&bars), Some(10.0));
        assert_eq!(sig.evaluate(&bars, 10.5), Signal::Buy);
    }

    #[test]
    fn nan_candidate_never_fires() {
        let bars = bars_with_highs(&[10.0, 11.0, 9.0]);
        let sig = SignalGenerator::new(3).unwrap();
        assert_eq!(sig.evaluate(&bars, f64::NAN), Signal::None);
    }

    #[test]
    fn evaluation_is_pure() {
        let bars = bars_with_highs(&[10.0, 11.0, 9.0]);
        let sig = SignalGenerator::new(3).unwrap();
        let first = sig.evaluate(&bars, 12.0);
        for _ in 0..5 {
            assert_eq!(sig.evaluate(&bars, 12.0), first);
        }
    }
}

//! Bar: the fundamental market data unit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol over one period.
///
/// The same type is used at both resolutions the engine consumes: coarse
/// (one bar per trading day) and fine (one bar per hour). `timestamp` marks
/// the start of the period and is always normalized to UTC. A missing value
/// is carried as NaN rather than dropping the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open price, if it is usable as an execution price.
    pub fn tradable_open(&self) -> Option<f64> {
        positive(self.open)
    }

    /// Close price, if it is usable for revaluation.
    pub fn valid_close(&self) -> Option<f64> {
        positive(self.close)
    }

    /// High price, if present.
    pub fn valid_high(&self) -> Option<f64> {
        self.high.is_finite().then_some(self.high)
    }
}

/// Bars whose UTC calendar date lies in `[start, end]`, both inclusive.
pub fn filter_by_date(bars: &[Bar], start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.iter()
        .filter(|b| {
            let date = b.timestamp.date_naive();
            date >= start && date <= end
        })
        .cloned()
        .collect()
}

/// True if timestamps are strictly increasing.
pub fn is_chronological(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000.0,
        )
    }

    #[test]
    fn complete_bar_has_usable_prices() {
        let bar = sample_bar();
        assert_eq!(bar.tradable_open(), Some(100.0));
        assert_eq!(bar.valid_close(), Some(103.0));
        assert_eq!(bar.valid_high(), Some(105.0));
    }

    #[test]
    fn nan_fields_are_reported_missing() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        bar.high = f64::NAN;
        assert_eq!(bar.valid_close(), None);
        assert_eq!(bar.valid_high(), None);
        assert_eq!(bar.tradable_open(), Some(100.0));
    }

    #[test]
    fn non_positive_prices_are_not_tradable() {
        let mut bar = sample_bar();
        bar.open = 0.0;
        bar.close = -1.0;
        assert_eq!(bar.tradable_open(), None);
        assert_eq!(bar.valid_close(), None);
    }

    #[test]
    fn date_filter_is_inclusive_on_both_ends() {
        let bars: Vec<Bar> = (1..=5)
            .map(|d| {
                let mut b = sample_bar();
                b.timestamp = Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap();
                b
            })
            .collect();
        let kept = filter_by_date(
            &bars,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        );
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].timestamp.date_naive().to_string(), "2024-01-02");
        assert_eq!(kept[2].timestamp.date_naive().to_string(), "2024-01-04");
    }

    #[test]
    fn chronological_check_rejects_duplicates() {
        let a = sample_bar();
        let mut b = sample_bar();
        assert!(!is_chronological(&[a.clone(), b.clone()]));
        b.timestamp = a.timestamp + chrono::Duration::hours(1);
        assert!(is_chronological(&[a.clone(), b.clone()]));
        assert!(!is_chronological(&[b, a]));
        assert!(is_chronological(&[]));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}

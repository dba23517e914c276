//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Bar with all prices equal to `close`.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        OhlcvBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    /// close / prev_close - 1, or 0.0 when the previous close is not positive.
    pub fn return_since(&self, prev_close: f64) -> f64 {
        if prev_close > 0.0 && prev_close.is_finite() {
            self.close / prev_close - 1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn return_since_previous_close() {
        let bar = sample_bar();
        assert!((bar.return_since(100.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn return_since_non_positive_close_is_zero() {
        let bar = sample_bar();
        assert_eq!(bar.return_since(0.0), 0.0);
        assert_eq!(bar.return_since(-3.0), 0.0);
        assert_eq!(bar.return_since(f64::NAN), 0.0);
    }

    #[test]
    fn flat_bar_uses_close_everywhere() {
        let bar = OhlcvBar::flat(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 42.0);
        assert_eq!(bar.open, 42.0);
        assert_eq!(bar.high, 42.0);
        assert_eq!(bar.low, 42.0);
        assert_eq!(bar.close, 42.0);
    }
}

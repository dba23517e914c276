//! Technical indicators over closing prices.
//!
//! Every series is index-aligned with the bars it was computed from. Bars
//! inside an indicator's lookback are marked invalid rather than filled, so
//! signal code can treat them as "no signal yet".

pub mod kama;
pub mod sma;
pub mod volatility;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Kama {
        period: usize,
        fast: usize,
        slow: usize,
    },
    Volatility(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, or `None` during warmup / out of range.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Kama { period, fast, slow } => {
                write!(f, "KAMA({},{},{})", period, fast, slow)
            }
            IndicatorType::Volatility(period) => write!(f, "VOL({})", period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(
            IndicatorType::Kama {
                period: 10,
                fast: 2,
                slow: 30
            }
            .to_string(),
            "KAMA(10,2,30)"
        );
        assert_eq!(IndicatorType::Volatility(21).to_string(), "VOL(21)");
    }

    #[test]
    fn value_at_skips_invalid_points() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(2),
            values: vec![
                IndicatorPoint {
                    date,
                    valid: false,
                    value: 0.0,
                },
                IndicatorPoint {
                    date,
                    valid: true,
                    value: 3.5,
                },
            ],
        };

        assert_eq!(series.value_at(0), None);
        assert_eq!(series.value_at(1), Some(3.5));
        assert_eq!(series.value_at(2), None);
    }
}

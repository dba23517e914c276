//! Simple Moving Average of closing prices.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n.
//! Warmup: first (n-1) bars are invalid. A zero period yields an all-invalid series.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if period > 0 && i >= period {
            sum -= bars[i - period].close;
        }

        let valid = period > 0 && i + 1 >= period;
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: if valid { sum / period as f64 } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

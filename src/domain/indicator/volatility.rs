//! Rolling volatility of daily close-to-close returns.
//!
//! R[i]      = C[i] / C[i-1] - 1
//! VOL(n)[i] = sample standard deviation of R[i-n+1..=i]
//! Warmup: the first n bars are invalid (bar 0 has no return). Periods below 2
//! yield an all-invalid series.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_volatility(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let returns: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| if i == 0 { 0.0 } else { bar.return_since(bars[i - 1].close) })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let valid = period >= 2 && i >= period;
        let value = if valid {
            let window = &returns[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
                / (period - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };
        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Volatility(period),
        values,
    }
}

//! Kaufman Adaptive Moving Average.
//!
//! ER[i]   = |C[i] - C[i-n]| / sum(|C[j] - C[j-1]| for j in i-n+1..=i), 0 when undefined
//! SC[i]   = (ER[i] * (2/(fast+1) - 2/(slow+1)) + 2/(slow+1))^2
//! KAMA[n-1] = C[n-1]; KAMA[i] = KAMA[i-1] + SC[i] * (C[i] - KAMA[i-1])
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_kama(
    bars: &[OhlcvBar],
    period: usize,
    fast: usize,
    slow: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Kama { period, fast, slow };
    let len = bars.len();

    let mut kama = vec![0.0_f64; len];
    let mut valid = vec![false; len];

    if period > 0 && len >= period {
        let fast_sc = 2.0 / (fast as f64 + 1.0);
        let slow_sc = 2.0 / (slow as f64 + 1.0);

        let seed = period - 1;
        kama[seed] = bars[seed].close;
        valid[seed] = true;

        for i in period..len {
            let change = (bars[i].close - bars[i - period].close).abs();
            let mut volatility = 0.0;
            for j in (i + 1 - period)..=i {
                volatility += (bars[j].close - bars[j - 1].close).abs();
            }
            let er = if volatility > 0.0 { change / volatility } else { 0.0 };
            let sc = (er * (fast_sc - slow_sc) + slow_sc).powi(2);

            kama[i] = kama[i - 1] + sc * (bars[i].close - kama[i - 1]);
            valid[i] = true;
        }
    }

    let values = bars
        .iter()
        .zip(kama.iter().zip(valid.iter()))
        .map(|(bar, (&value, &valid))| IndicatorPoint {
            date: bar.date,
            valid,
            value,
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar::flat(start + Duration::days(i as i64), close))
            .collect()
    }

    #[test]
    fn kama_constant_price_equals_price() {
        let bars = make_bars(&[50.0; 40]);
        let series = calculate_kama(&bars, 10, 2, 30);

        for i in 0..9 {
            assert!(!series.values[i].valid);
        }
        for i in 9..40 {
            assert!((series.value_at(i).unwrap() - 50.0).abs() < 1e-12);
        }
    }

    #[test]
    fn kama_seed_is_close() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_kama(&bars, 3, 2, 30);
        assert!((series.value_at(2).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn kama_trending_series_uses_fast_constant() {
        // Perfectly efficient move: ER = 1 so SC = (2/3)^2.
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let series = calculate_kama(&bars, 2, 2, 30);
        let sc = (2.0_f64 / 3.0).powi(2);
        let expected = 2.0 + sc * (3.0 - 2.0);
        assert!((series.value_at(2).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn kama_lags_rising_price() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = calculate_kama(&make_bars(&prices), 10, 2, 30);
        let last = series.value_at(29).unwrap();
        assert!(last < 129.0);
        assert!(last > 110.0);
    }

    #[test]
    fn kama_short_history_all_invalid() {
        let series = calculate_kama(&make_bars(&[1.0, 2.0]), 10, 2, 30);
        assert_eq!(series.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use forwardtest::domain::error::ForwardtestError;
pub use forwardtest::domain::ohlcv::OhlcvBar;
use forwardtest::domain::params::{ParamValue, ParameterSet};
use forwardtest::domain::price_series::PriceSeries;
use forwardtest::ports::data_port::DataPort;
use std::collections::HashMap;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, ForwardtestError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(ForwardtestError::data_unavailable(ticker, reason.clone()));
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        start_date.is_none_or(|s| b.date >= s)
                            && end_date.is_none_or(|e| b.date <= e)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ForwardtestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars from `start`, one per calendar day.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1_000.0,
        })
        .collect()
}

pub fn series_from_closes(ticker: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(ticker, bars_from_closes(date(2020, 1, 1), closes))
}

/// Closes compounding at `rate` per bar from 100.
pub fn rising_closes(count: usize, rate: f64) -> Vec<f64> {
    (0..count).map(|i| 100.0 * (1.0 + rate).powi(i as i32)).collect()
}

/// Slow uptrend with a sine swing, so moving averages cross repeatedly.
pub fn oscillating_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 * (1.0 + 0.0003 * t) + 6.0 * (t / 20.0).sin()
        })
        .collect()
}

pub fn params(pairs: &[(&str, i64)]) -> ParameterSet {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), ParamValue::Int(*value)))
        .collect()
}

pub fn write_price_csv(dir: &Path, ticker: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", ticker)), content).unwrap();
}

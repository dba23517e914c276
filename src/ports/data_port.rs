//! Price data access port.

use crate::domain::error::ForwardtestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub trait DataPort {
    /// Bars for `ticker` with dates in `[start_date, end_date]`; open bounds when `None`.
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, ForwardtestError>;

    fn list_symbols(&self) -> Result<Vec<String>, ForwardtestError>;

    /// Fetches a non-empty series; an empty result is `DataUnavailable`.
    fn fetch_series(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, ForwardtestError> {
        let bars = self.fetch_ohlcv(ticker, start_date, end_date)?;
        if bars.is_empty() {
            return Err(ForwardtestError::data_unavailable(ticker, "no bars in requested period"));
        }
        Ok(PriceSeries::new(ticker, bars))
    }

    /// Fetches every ticker or fails on the first one that is missing.
    fn fetch_many(
        &self,
        tickers: &[String],
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, PriceSeries>, ForwardtestError> {
        tickers
            .iter()
            .map(|ticker| {
                self.fetch_series(ticker, start_date, end_date)
                    .map(|series| (ticker.clone(), series))
            })
            .collect()
    }
}

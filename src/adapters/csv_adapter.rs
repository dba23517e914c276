//! CSV file data adapter.
//!
//! One file per ticker, `{base_path}/{ticker}.csv`, with a header row naming
//! at least `date` and `close`. Index tickers such as `^GSPC` are looked up
//! without the caret when the literal file name does not exist.

use crate::domain::error::ForwardtestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(ticker: &str, headers: &csv::StringRecord) -> Result<Self, ForwardtestError> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let missing = |column: &str| {
            ForwardtestError::data_unavailable(ticker, format!("missing {} column", column))
        };
        let date = find("date").ok_or_else(|| missing("date"))?;
        let close = find("close").ok_or_else(|| missing("close"))?;
        Ok(Columns {
            date,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close,
            volume: find("volume"),
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        let literal = self.base_path.join(format!("{}.csv", ticker));
        if literal.exists() {
            return literal;
        }
        self.base_path.join(format!("{}.csv", ticker.trim_start_matches('^')))
    }
}

fn parse_price(
    ticker: &str,
    record: &csv::StringRecord,
    column: usize,
    name: &str,
) -> Result<f64, ForwardtestError> {
    let raw = record.get(column).ok_or_else(|| {
        ForwardtestError::data_unavailable(ticker, format!("missing {} value", name))
    })?;
    raw.trim().parse().map_err(|e| {
        let reason = format!("invalid {} value '{}': {}", name, raw, e);
        ForwardtestError::data_unavailable(ticker, reason)
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, ForwardtestError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| {
            let reason = format!("failed to read {}: {}", path.display(), e);
            ForwardtestError::data_unavailable(ticker, reason)
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let columns = Columns::from_headers(ticker, rdr.headers()?)?;
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result?;

            let date_str = record.get(columns.date).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                let reason = format!("invalid date '{}': {}", date_str, e);
                ForwardtestError::data_unavailable(ticker, reason)
            })?;

            let before = start_date.is_some_and(|start| date < start);
            let after = end_date.is_some_and(|end| date > end);
            if before || after {
                continue;
            }

            let close = parse_price(ticker, &record, columns.close, "close")?;
            let optional = |column: Option<usize>, name: &str| -> Result<f64, ForwardtestError> {
                match column {
                    Some(c) => parse_price(ticker, &record, c, name),
                    None => Ok(close),
                }
            };
            let open = optional(columns.open, "open")?;
            let high = optional(columns.high, "high")?;
            let low = optional(columns.low, "low")?;
            let volume = match columns.volume {
                Some(c) => parse_price(ticker, &record, c, "volume")?,
                None => 0.0,
            };

            bars.push(OhlcvBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ForwardtestError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(ticker) = name.strip_suffix(".csv") {
                symbols.push(ticker.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

//! Price series keyed by calendar date, and date alignment across series.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

/// Date-sorted, date-unique bar sequence for one ticker.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: String,
    bars: Vec<OhlcvBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Sorts bars by date; when a date repeats, the last bar supplied wins.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut unique: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }
        let date_index = unique
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            ticker: ticker.into(),
            bars: unique,
            date_index,
        }
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn get_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Positions of the bars dated within `[start, end)`.
    pub fn index_range(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date < end).max(lo);
        lo..hi
    }

    /// Copy of the bars dated within `[start, end)`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let range = self.index_range(start, end);
        PriceSeries::new(self.ticker.clone(), self.bars[range].to_vec())
    }
}

/// Dates present in every series, ascending.
pub fn common_dates(series: &[&PriceSeries]) -> Vec<NaiveDate> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };
    let mut shared: BTreeSet<NaiveDate> = first.bars.iter().map(|b| b.date).collect();
    for s in rest {
        shared.retain(|d| s.date_index.contains_key(d));
    }
    shared.into_iter().collect()
}

//! Market context of a training window, as shown to proposal sources.

use chrono::NaiveDate;
use std::ops::Range;

use crate::domain::metrics::TRADING_DAYS_PER_YEAR;
use crate::domain::params::{ParamValue, ParameterSet, RegimeDescriptor};
use crate::domain::price_series::PriceSeries;

/// Parameter value replaced by the window's regime descriptor.
pub const REGIME_PLACEHOLDER: &str = "$regime";

const LOW_VOL: f64 = 0.15;
const MID_VOL: f64 = 0.25;
const CRISIS_VOL: f64 = 0.40;
const CRISIS_RETURN: f64 = -0.10;
const TREND_RETURN: f64 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bars: usize,
    pub trailing_return: f64,
    pub annualized_volatility: f64,
    pub regime: RegimeDescriptor,
}

impl MarketContext {
    /// Summarizes the bars in `range`; `None` when the range holds no bars.
    pub fn summarize(series: &PriceSeries, range: Range<usize>) -> Option<Self> {
        let bars = series.bars().get(range)?;
        let (first, last) = (bars.first()?, bars.last()?);

        let trailing_return = if first.close > 0.0 {
            last.close / first.close - 1.0
        } else {
            0.0
        };
        let returns: Vec<f64> = bars.windows(2).map(|w| w[1].return_since(w[0].close)).collect();
        let annualized_volatility = sample_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();

        Some(MarketContext {
            ticker: series.ticker.clone(),
            start: first.date,
            end: last.date,
            bars: bars.len(),
            trailing_return,
            annualized_volatility,
            regime: RegimeDescriptor::Label(regime_label(annualized_volatility, trailing_return)),
        })
    }

    /// Replaces every `$regime` placeholder value with this context's regime.
    pub fn bind(&self, params: &mut ParameterSet) {
        for value in params.values_mut() {
            if value.as_text() == Some(REGIME_PLACEHOLDER) {
                *value = self.regime.clone().into_param();
            }
        }
    }
}

/// `HighVol-Crisis`, or a volatility bucket joined with a direction, e.g. `LowVol-Bull`.
pub fn regime_label(annualized_volatility: f64, trailing_return: f64) -> String {
    if annualized_volatility > CRISIS_VOL && trailing_return < CRISIS_RETURN {
        return "HighVol-Crisis".to_string();
    }
    let vol = if annualized_volatility < LOW_VOL {
        "LowVol"
    } else if annualized_volatility < MID_VOL {
        "MidVol"
    } else {
        "HighVol"
    };
    let direction = if trailing_return > TREND_RETURN {
        "Bull"
    } else if trailing_return < -TREND_RETURN {
        "Bear"
    } else {
        "Uncertain"
    };
    format!("{}-{}", vol, direction)
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

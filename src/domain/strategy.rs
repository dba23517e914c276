//! Strategy signal generation.
//!
//! A strategy is a pure function from a price series and a normalized
//! parameter set to a [`Signal`]. Parameter sets reaching `generate` have
//! already passed through [`crate::domain::normalizer::normalize`] with the
//! strategy's schema, so every key the schema declares with a default is present.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::params::{ParamValue, ParameterSet, RegimeDescriptor};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;

pub trait SignalGenerator: Send + Sync {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError>;
}

pub fn param_usize(
    strategy: &str,
    params: &ParameterSet,
    key: &str,
) -> Result<usize, ForwardtestError> {
    params.get(key).and_then(ParamValue::as_usize).ok_or_else(|| {
        ForwardtestError::configuration(strategy, format!("missing integer parameter {}", key))
    })
}

pub fn param_f64(
    strategy: &str,
    params: &ParameterSet,
    key: &str,
) -> Result<f64, ForwardtestError> {
    params.get(key).and_then(ParamValue::as_f64).ok_or_else(|| {
        ForwardtestError::configuration(strategy, format!("missing numeric parameter {}", key))
    })
}

pub fn param_regime(params: &ParameterSet, key: &str) -> Option<RegimeDescriptor> {
    params.get(key).and_then(RegimeDescriptor::from_param)
}

/// Entry when `fast` moves above `slow`, exit when it moves below.
///
/// A bar where either series is still warming up counts as neither above nor
/// below, so the first fully formed bar can already fire an event.
pub fn crossover(fast: &IndicatorSeries, slow: &IndicatorSeries) -> Signal {
    let len = fast.len().min(slow.len());
    let mut entries = vec![false; len];
    let mut exits = vec![false; len];
    let mut prev = (false, false);

    for i in 0..len {
        let relation = match (fast.value_at(i), slow.value_at(i)) {
            (Some(f), Some(s)) => (f > s, f < s),
            _ => (false, false),
        };
        entries[i] = relation.0 && !prev.0;
        exits[i] = relation.1 && !prev.1;
        prev = relation;
    }

    Signal::Crossover { entries, exits }
}

/// Level signal `fast - slow`, NaN while either series is warming up.
pub fn spread(fast: &IndicatorSeries, slow: &IndicatorSeries) -> Vec<f64> {
    let len = fast.len().min(slow.len());
    (0..len)
        .map(|i| match (fast.value_at(i), slow.value_at(i)) {
            (Some(f), Some(s)) => f - s,
            _ => f64::NAN,
        })
        .collect()
}

//! Adaptive trend: long while the close is above its Kaufman adaptive moving average.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::kama::calculate_kama;
use crate::domain::normalizer::{Alias, DefaultValue, ParamKind, ParamSchema, ParamSpec};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{param_usize, SignalGenerator};

pub const NAME: &str = "kama_trend";

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "n",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(10)),
            required: true,
        },
        ParamSpec {
            key: "fast_period",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(2)),
            required: true,
        },
        ParamSpec {
            key: "slow_period",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(30)),
            required: true,
        },
    ],
    aliases: &[Alias::Rename { from: "window", to: "n" }],
    ordered: &["fast_period", "slow_period"],
    spacing: None,
};

pub struct KamaTrend;

impl SignalGenerator for KamaTrend {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let n = param_usize(NAME, params, "n")?;
        let fast = param_usize(NAME, params, "fast_period")?;
        let slow = param_usize(NAME, params, "slow_period")?;
        let kama = calculate_kama(series.bars(), n, fast, slow);

        let levels = series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| match kama.value_at(i) {
                Some(k) => bar.close - k,
                None => f64::NAN,
            })
            .collect();
        Ok(Signal::Level(levels))
    }
}

//! Trend filter: long while the fast SMA sits above the slow SMA.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::normalizer::{Alias, ParamKind, ParamSchema, ParamSpec};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{param_usize, spread, SignalGenerator};

pub const NAME: &str = "sma_trend";

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "fast_window",
            kind: ParamKind::Integer { min: 1 },
            default: None,
            required: true,
        },
        ParamSpec {
            key: "slow_window",
            kind: ParamKind::Integer { min: 1 },
            default: None,
            required: true,
        },
    ],
    aliases: &[
        Alias::Rename { from: "fast", to: "fast_window" },
        Alias::Rename { from: "slow", to: "slow_window" },
    ],
    ordered: &["fast_window", "slow_window"],
    spacing: None,
};

pub struct SmaTrend;

impl SignalGenerator for SmaTrend {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let fast = param_usize(NAME, params, "fast_window")?;
        let slow = param_usize(NAME, params, "slow_window")?;
        let fast_ma = calculate_sma(series.bars(), fast);
        let slow_ma = calculate_sma(series.bars(), slow);
        Ok(Signal::Level(spread(&fast_ma, &slow_ma)))
    }
}

//! Moving-average crossover: enter when the fast SMA crosses above the slow
//! SMA, exit when it crosses below.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::normalizer::{Alias, DefaultValue, ParamKind, ParamSchema, ParamSpec};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{crossover, param_usize, SignalGenerator};

pub const NAME: &str = "momentum";

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "fast_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(21)),
            required: true,
        },
        ParamSpec {
            key: "slow_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(63)),
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

pub struct MomentumCrossover;

impl SignalGenerator for MomentumCrossover {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let fast = param_usize(NAME, params, "fast_window")?;
        let slow = param_usize(NAME, params, "slow_window")?;
        let fast_ma = calculate_sma(series.bars(), fast);
        let slow_ma = calculate_sma(series.bars(), slow);
        Ok(crossover(&fast_ma, &slow_ma))
    }
}

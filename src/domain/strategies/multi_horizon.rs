//! Multi-horizon momentum vote.
//!
//! Each horizon h votes sign(C[t] / C[t-h] - 1); the strategy is long while
//! the sum of votes is positive. Bars before the longest horizon carry no signal.

use crate::domain::error::ForwardtestError;
use crate::domain::normalizer::{Alias, DefaultValue, ParamKind, ParamSchema, ParamSpec, Spacing};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{param_usize, SignalGenerator};

pub const NAME: &str = "multi_horizon";

const HORIZON_KEYS: [&str; 3] = ["short_window", "medium_window", "long_window"];

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "short_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(21)),
            required: true,
        },
        ParamSpec {
            key: "medium_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(63)),
            required: true,
        },
        ParamSpec {
            key: "long_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(126)),
            required: true,
        },
    ],
    aliases: &[Alias::Horizons {
        from: "window",
        keys: HORIZON_KEYS,
    }],
    ordered: &HORIZON_KEYS,
    spacing: Some(Spacing {
        keys: HORIZON_KEYS,
        min_gap: 5,
    }),
};

pub struct MultiHorizon;

impl SignalGenerator for MultiHorizon {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let horizons = HORIZON_KEYS
            .iter()
            .map(|key| param_usize(NAME, params, key))
            .collect::<Result<Vec<_>, _>>()?;

        let bars = series.bars();
        let levels = (0..bars.len())
            .map(|i| {
                let mut votes = 0.0;
                for &h in &horizons {
                    if h > i {
                        return f64::NAN;
                    }
                    let base = bars[i - h].close;
                    if base.is_nan() || base <= 0.0 {
                        return f64::NAN;
                    }
                    let change = bars[i].close / base - 1.0;
                    if change > 0.0 {
                        votes += 1.0;
                    } else if change < 0.0 {
                        votes -= 1.0;
                    }
                }
                votes
            })
            .collect();
        Ok(Signal::Level(levels))
    }
}

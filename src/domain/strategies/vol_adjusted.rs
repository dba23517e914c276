//! Volatility-scaled moving-average trend.
//!
//! The ratio of long-run average volatility to current volatility picks one
//! of three SMA pairs: a calm market (ratio above 1.2) uses windows 1.5x the
//! base pair, a turbulent one (ratio below 0.8) uses windows half the base
//! pair, anything in between uses the base pair. The ratio is clipped to
//! [0.5, 2.0] and taken as 1.0 when undefined.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::volatility::calculate_volatility;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::normalizer::{Alias, DefaultValue, ParamKind, ParamSchema, ParamSpec};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{param_usize, spread, SignalGenerator};

pub const NAME: &str = "vol_adjusted";

const SHORT_SCALE: f64 = 0.5;
const LONG_SCALE: f64 = 1.5;
const FACTOR_MIN: f64 = 0.5;
const FACTOR_MAX: f64 = 2.0;
const SHORTEN_BELOW: f64 = 0.8;
const LENGTHEN_ABOVE: f64 = 1.2;

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "base_fast",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(50)),
            required: true,
        },
        ParamSpec {
            key: "base_slow",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(200)),
            required: true,
        },
        ParamSpec {
            key: "vol_window",
            kind: ParamKind::Integer { min: 2 },
            default: Some(DefaultValue::Int(21)),
            required: true,
        },
        ParamSpec {
            key: "target_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(126)),
            required: true,
        },
    ],
    aliases: &[
        Alias::Rename { from: "fast", to: "base_fast" },
        Alias::Rename { from: "slow", to: "base_slow" },
        Alias::Rename { from: "fast_window", to: "base_fast" },
        Alias::Rename { from: "slow_window", to: "base_slow" },
    ],
    ordered: &["base_fast", "base_slow"],
    spacing: None,
};

pub struct VolAdjusted;

impl SignalGenerator for VolAdjusted {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let base_fast = param_usize(NAME, params, "base_fast")?;
        let base_slow = param_usize(NAME, params, "base_slow")?;
        let vol_window = param_usize(NAME, params, "vol_window")?;
        let target_window = param_usize(NAME, params, "target_window")?;

        let bars = series.bars();
        let pair = |scale: f64| {
            let fast = calculate_sma(bars, scaled(base_fast, scale));
            let slow = calculate_sma(bars, scaled(base_slow, scale));
            spread(&fast, &slow)
        };
        let short = pair(SHORT_SCALE);
        let base = pair(1.0);
        let long = pair(LONG_SCALE);

        let vol = calculate_volatility(bars, vol_window);
        let target = rolling_mean_valid(&vol, target_window, vol_window.min(target_window));

        let levels = (0..bars.len())
            .map(|i| {
                let f = window_factor(target[i], vol.value_at(i));
                if f < SHORTEN_BELOW {
                    short[i]
                } else if f > LENGTHEN_ABOVE {
                    long[i]
                } else {
                    base[i]
                }
            })
            .collect();
        Ok(Signal::Level(levels))
    }
}

fn scaled(window: usize, scale: f64) -> usize {
    ((window as f64 * scale) as usize).max(1)
}

/// Mean of the valid values among the last `window` points, once at least
/// `min_periods` of them are valid.
fn rolling_mean_valid(
    series: &IndicatorSeries,
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let valid: Vec<f64> = (start..=i).filter_map(|j| series.value_at(j)).collect();
            if !valid.is_empty() && valid.len() >= min_periods {
                Some(valid.iter().sum::<f64>() / valid.len() as f64)
            } else {
                None
            }
        })
        .collect()
}

/// Target volatility over current volatility, clipped; 1.0 when undefined.
fn window_factor(target: Option<f64>, current: Option<f64>) -> f64 {
    match (target, current) {
        (Some(t), Some(c)) => {
            let ratio = t / c;
            if ratio.is_nan() {
                1.0
            } else {
                ratio.clamp(FACTOR_MIN, FACTOR_MAX)
            }
        }
        _ => 1.0,
    }
}

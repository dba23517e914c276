//! Regime-gated trend following.
//!
//! Long while the fast SMA is above the slow SMA, except when annualized
//! realized volatility exceeds `vol_threshold`. A crisis regime keeps the
//! strategy flat for the whole series.

use crate::domain::error::ForwardtestError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::volatility::calculate_volatility;
use crate::domain::normalizer::{Alias, DefaultValue, ParamKind, ParamSchema, ParamSpec};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategy::{param_f64, param_regime, param_usize, spread, SignalGenerator};
use tracing::debug;

pub const NAME: &str = "regime_switch";

const TRADING_DAYS: f64 = 252.0;

pub static SCHEMA: ParamSchema = ParamSchema {
    params: &[
        ParamSpec {
            key: "fast_window",
            kind: ParamKind::Integer { min: 1 },
            default: Some(DefaultValue::Int(50)),
            required: true,
        },
        ParamSpec {
            key: "slow_window",
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
            key: "vol_threshold",
            kind: ParamKind::Float { min: 0.0, max: 10.0 },
            default: Some(DefaultValue::Float(0.30)),
            required: true,
        },
        ParamSpec {
            key: "regime",
            kind: ParamKind::Regime,
            default: None,
            required: false,
        },
    ],
    aliases: &[
        Alias::Rename { from: "fast", to: "fast_window" },
        Alias::Rename { from: "slow", to: "slow_window" },
    ],
    ordered: &["fast_window", "slow_window"],
    spacing: None,
};

pub struct RegimeSwitch;

impl SignalGenerator for RegimeSwitch {
    fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let fast = param_usize(NAME, params, "fast_window")?;
        let slow = param_usize(NAME, params, "slow_window")?;
        let vol_window = param_usize(NAME, params, "vol_window")?;
        let threshold = param_f64(NAME, params, "vol_threshold")?;

        if let Some(regime) = param_regime(params, "regime") {
            if regime.is_crisis() {
                debug!(regime = %regime.name(), "crisis regime, staying flat");
                return Ok(Signal::flat(series.len()));
            }
        }

        let bars = series.bars();
        let trend = spread(&calculate_sma(bars, fast), &calculate_sma(bars, slow));
        let vol = calculate_volatility(bars, vol_window);

        let levels = trend
            .into_iter()
            .enumerate()
            .map(|(i, level)| match vol.value_at(i) {
                Some(v) if v * TRADING_DAYS.sqrt() > threshold => 0.0,
                _ => level,
            })
            .collect();
        Ok(Signal::Level(levels))
    }
}

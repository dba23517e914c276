//! Name to strategy lookup.
//!
//! The registry is the only place strategy names are resolved. Every entry
//! carries its parameter schema, so callers normalize and generate through
//! the same handle.

use std::collections::BTreeMap;

use crate::domain::error::ForwardtestError;
use crate::domain::normalizer::{normalize, ParamSchema};
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use crate::domain::strategies::{
    kama_trend, momentum, multi_horizon, regime_switch, sma_trend, vol_adjusted,
};
use crate::domain::strategy::SignalGenerator;

pub struct RegisteredStrategy {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: &'static ParamSchema,
    generator: Box<dyn SignalGenerator>,
}

impl RegisteredStrategy {
    pub fn normalize(&self, params: &ParameterSet) -> Result<ParameterSet, ForwardtestError> {
        normalize(self.name, self.schema, params)
    }

    /// Generates a signal from an already normalized parameter set and checks
    /// that it lines up with the series.
    pub fn generate(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<Signal, ForwardtestError> {
        let signal = self.generator.generate(series, params)?;
        if signal.len() != series.len() {
            return Err(ForwardtestError::SignalLength {
                expected: series.len(),
                actual: signal.len(),
            });
        }
        Ok(signal)
    }
}

impl std::fmt::Debug for RegisteredStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredStrategy")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, RegisteredStrategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in strategy.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            momentum::NAME,
            "fast/slow SMA crossover",
            &momentum::SCHEMA,
            momentum::MomentumCrossover,
        );
        registry.register(
            sma_trend::NAME,
            "long while fast SMA is above slow SMA",
            &sma_trend::SCHEMA,
            sma_trend::SmaTrend,
        );
        registry.register(
            kama_trend::NAME,
            "long while close is above KAMA",
            &kama_trend::SCHEMA,
            kama_trend::KamaTrend,
        );
        registry.register(
            vol_adjusted::NAME,
            "SMA trend with volatility-scaled windows",
            &vol_adjusted::SCHEMA,
            vol_adjusted::VolAdjusted,
        );
        registry.register(
            multi_horizon::NAME,
            "majority vote of short/medium/long momentum",
            &multi_horizon::SCHEMA,
            multi_horizon::MultiHorizon,
        );
        registry.register(
            regime_switch::NAME,
            "SMA trend gated by realized volatility and regime",
            &regime_switch::SCHEMA,
            regime_switch::RegimeSwitch,
        );
        registry
    }

    /// Adds or replaces a strategy.
    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        schema: &'static ParamSchema,
        generator: impl SignalGenerator + 'static,
    ) {
        self.strategies.insert(
            name,
            RegisteredStrategy {
                name,
                description,
                schema,
                generator: Box::new(generator),
            },
        );
    }

    pub fn lookup(&self, name: &str) -> Result<&RegisteredStrategy, ForwardtestError> {
        self.strategies
            .get(name.trim())
            .ok_or_else(|| ForwardtestError::UnknownStrategy {
                name: name.to_string(),
                known: self.names().iter().map(|n| n.to_string()).collect(),
            })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredStrategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

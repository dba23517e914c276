//! Strategy evaluation: registry lookup, parameter normalization, signal
//! generation, simulation and metrics in one call.
//!
//! Windowed evaluation simulates from the warmup start so indicators are
//! formed by the time the scored period begins, then scores only the bars in
//! `[start, end)`.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::domain::error::ForwardtestError;
use crate::domain::metrics::Metrics;
use crate::domain::optimizer::Candidate;
use crate::domain::params::ParameterSet;
use crate::domain::price_series::PriceSeries;
use crate::domain::registry::{RegisteredStrategy, StrategyRegistry};
use crate::domain::simulator::{simulate, simulate_portfolio, Simulation, SimulationConfig};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub strategy: String,
    /// Parameters after normalization.
    pub params: ParameterSet,
    pub assets: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// Net daily returns over the scored period.
    pub returns: Vec<f64>,
    pub equity: Vec<f64>,
    pub metrics: Metrics,
}

impl EvaluationResult {
    fn from_simulation(
        strategy: &str,
        params: ParameterSet,
        assets: Vec<String>,
        simulation: &Simulation,
    ) -> Self {
        EvaluationResult {
            strategy: strategy.to_string(),
            params,
            assets,
            dates: simulation.dates.clone(),
            returns: simulation.returns.clone(),
            equity: simulation.equity.clone(),
            metrics: Metrics::compute(simulation),
        }
    }
}

/// Simulate from `warmup_start`, score `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindow {
    pub warmup_start: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub struct Evaluator<'a> {
    registry: &'a StrategyRegistry,
    config: SimulationConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a StrategyRegistry, config: SimulationConfig) -> Self {
        Evaluator { registry, config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &'a StrategyRegistry {
        self.registry
    }

    /// Resolves the strategy and normalizes `params` against its schema.
    pub fn prepare(
        &self,
        strategy: &str,
        params: &ParameterSet,
    ) -> Result<(&'a RegisteredStrategy, ParameterSet), ForwardtestError> {
        let registered = self.registry.lookup(strategy)?;
        let normalized = registered.normalize(params)?;
        Ok((registered, normalized))
    }

    /// Evaluates over the whole series.
    pub fn evaluate(
        &self,
        series: &PriceSeries,
        strategy: &str,
        params: &ParameterSet,
    ) -> Result<EvaluationResult, ForwardtestError> {
        if series.is_empty() {
            return Err(ForwardtestError::data_unavailable(&series.ticker, "empty price series"));
        }
        let (registered, normalized) = self.prepare(strategy, params)?;
        let signal = registered.generate(series, &normalized)?;
        let simulation = simulate(series, &signal, &self.config)?;
        Ok(EvaluationResult::from_simulation(
            registered.name,
            normalized,
            vec![series.ticker.clone()],
            &simulation,
        ))
    }

    pub fn evaluate_window(
        &self,
        series: &PriceSeries,
        strategy: &str,
        params: &ParameterSet,
        window: &EvaluationWindow,
    ) -> Result<EvaluationResult, ForwardtestError> {
        let (registered, normalized) = self.prepare(strategy, params)?;
        let slice = series.slice(window.warmup_start, window.end);
        let scored = slice.index_range(window.start, window.end);
        if scored.is_empty() {
            return Err(no_bars(&series.ticker, window));
        }

        let signal = registered.generate(&slice, &normalized)?;
        let simulation = simulate(&slice, &signal, &self.config)?.window(scored);
        Ok(EvaluationResult::from_simulation(
            registered.name,
            normalized,
            vec![series.ticker.clone()],
            &simulation,
        ))
    }

    /// Runs one strategy on several assets with capital split by `weights`
    /// (equal when `None`), scoring the combined equity curve.
    pub fn evaluate_portfolio(
        &self,
        assets: &[&PriceSeries],
        weights: Option<&[f64]>,
        strategy: &str,
        params: &ParameterSet,
        window: Option<&EvaluationWindow>,
    ) -> Result<EvaluationResult, ForwardtestError> {
        let (registered, normalized) = self.prepare(strategy, params)?;

        let slices: Vec<PriceSeries> = assets
            .iter()
            .map(|series| match window {
                Some(w) => series.slice(w.warmup_start, w.end),
                None => (*series).clone(),
            })
            .collect();
        if let Some(empty) = slices.iter().find(|s| s.is_empty()) {
            return Err(ForwardtestError::data_unavailable(
                &empty.ticker,
                "no bars in evaluation period",
            ));
        }

        let signals = slices
            .iter()
            .map(|slice| registered.generate(slice, &normalized))
            .collect::<Result<Vec<_>, _>>()?;
        let legs: Vec<_> = slices.iter().zip(&signals).collect();
        let portfolio = simulate_portfolio(&legs, weights, &self.config)?;

        let combined = match window {
            Some(w) => {
                let scored = date_range(&portfolio.combined.dates, w.start, w.end);
                if scored.is_empty() {
                    return Err(no_bars("portfolio", w));
                }
                portfolio.combined.window(scored)
            }
            None => portfolio.combined,
        };

        Ok(EvaluationResult::from_simulation(
            registered.name,
            normalized,
            slices.iter().map(|s| s.ticker.clone()).collect(),
            &combined,
        ))
    }

    /// Evaluates a proposed candidate over `window`, on the reference series
    /// or on the candidate's own assets.
    pub fn evaluate_candidate(
        &self,
        book: &mut AssetBook<'_>,
        reference: &PriceSeries,
        candidate: &Candidate,
        window: &EvaluationWindow,
    ) -> Result<EvaluationResult, ForwardtestError> {
        let single = candidate.assets.is_empty()
            || (candidate.assets.len() == 1 && candidate.assets[0] == reference.ticker);
        if single {
            return self.evaluate_window(reference, &candidate.strategy, &candidate.params, window);
        }

        let assets = book.load(&candidate.assets)?;
        self.evaluate_portfolio(&assets, None, &candidate.strategy, &candidate.params, Some(window))
    }
}

fn no_bars(ticker: &str, window: &EvaluationWindow) -> ForwardtestError {
    ForwardtestError::data_unavailable(
        ticker,
        format!("no bars between {} and {}", window.start, window.end),
    )
}

fn date_range(dates: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> Range<usize> {
    let lo = dates.partition_point(|d| *d < start);
    let hi = dates.partition_point(|d| *d < end).max(lo);
    lo..hi
}

/// Price series by ticker, fetched from the data port on first use.
pub struct AssetBook<'a> {
    data: Option<&'a dyn DataPort>,
    series: BTreeMap<String, PriceSeries>,
}

impl<'a> AssetBook<'a> {
    pub fn new(data: Option<&'a dyn DataPort>) -> Self {
        AssetBook {
            data,
            series: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker.clone(), series);
    }

    /// Series for every ticker, in order; fails on the first one that is
    /// missing or empty.
    pub fn load(&mut self, tickers: &[String]) -> Result<Vec<&PriceSeries>, ForwardtestError> {
        for ticker in tickers {
            if self.series.contains_key(ticker) {
                continue;
            }
            let data = self.data.ok_or_else(|| {
                ForwardtestError::data_unavailable(ticker, "no data source configured")
            })?;
            let series = data.fetch_series(ticker, None, None)?;
            self.series.insert(ticker.clone(), series);
        }

        tickers
            .iter()
            .map(|ticker| {
                self.series
                    .get(ticker)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ForwardtestError::data_unavailable(ticker, "empty price series"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::params::ParamValue;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    }

    fn rising(ticker: &str, len: usize) -> PriceSeries {
        let bars = (0..len)
            .map(|i| OhlcvBar::flat(d(i as i64), 100.0 * 1.001_f64.powi(i as i32)))
            .collect();
        PriceSeries::new(ticker, bars)
    }

    fn crossover_params(fast: i64, slow: i64) -> ParameterSet {
        let mut params = ParameterSet::new();
        params.insert("fast_window".into(), ParamValue::Int(fast));
        params.insert("slow_window".into(), ParamValue::Int(slow));
        params
    }

    fn no_cost() -> SimulationConfig {
        SimulationConfig {
            initial_capital: 100_000.0,
            cost_bps: 0.0,
        }
    }

    #[test]
    fn evaluate_full_series() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let result = evaluator
            .evaluate(&rising("SPY", 400), "momentum", &crossover_params(50, 200))
            .unwrap();

        assert_eq!(result.strategy, "momentum");
        assert_eq!(result.returns.len(), 400);
        assert_eq!(result.metrics.num_trades, 1);
        assert!(result.metrics.total_return > 0.0);
        assert_eq!(result.metrics.max_drawdown, 0.0);
    }

    #[test]
    fn evaluate_reports_normalized_params() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let mut raw = ParameterSet::new();
        raw.insert("fast".into(), ParamValue::Int(5));
        raw.insert("unused".into(), ParamValue::Int(1));
        let result = evaluator.evaluate(&rising("SPY", 100), "momentum", &raw).unwrap();

        assert_eq!(result.params.get("fast_window"), Some(&ParamValue::Int(5)));
        assert_eq!(result.params.get("slow_window"), Some(&ParamValue::Int(63)));
        assert!(!result.params.contains_key("unused"));
    }

    #[test]
    fn window_uses_warmup_for_indicators() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let series = rising("SPY", 400);
        let window = EvaluationWindow {
            warmup_start: d(0),
            start: d(250),
            end: d(350),
        };
        let result = evaluator
            .evaluate_window(&series, "momentum", &crossover_params(50, 200), &window)
            .unwrap();

        assert_eq!(result.dates.len(), 100);
        assert_eq!(result.dates[0], d(250));
        // Position was established during warmup, so the whole window is invested.
        assert_relative_eq!(result.metrics.total_return, 1.001_f64.powi(100) - 1.0, epsilon = 1e-9);
        assert_eq!(result.metrics.num_trades, 0);
    }

    #[test]
    fn window_without_warmup_stays_flat() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let series = rising("SPY", 400);
        let window = EvaluationWindow {
            warmup_start: d(250),
            start: d(250),
            end: d(350),
        };
        let result = evaluator
            .evaluate_window(&series, "momentum", &crossover_params(50, 200), &window)
            .unwrap();
        assert_eq!(result.metrics.total_return, 0.0);
    }

    #[test]
    fn empty_window_is_unavailable() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let window = EvaluationWindow {
            warmup_start: d(500),
            start: d(500),
            end: d(600),
        };
        let err = evaluator
            .evaluate_window(&rising("SPY", 100), "momentum", &ParameterSet::new(), &window)
            .unwrap_err();
        assert!(matches!(err, ForwardtestError::DataUnavailable { .. }));
    }

    #[test]
    fn unknown_strategy_propagates() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let err = evaluator
            .evaluate(&rising("SPY", 10), "astrology", &ParameterSet::new())
            .unwrap_err();
        assert!(matches!(err, ForwardtestError::UnknownStrategy { .. }));
    }

    #[test]
    fn portfolio_combines_assets() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let a = rising("SPY", 300);
        let b = rising("QQQ", 300);
        let result = evaluator
            .evaluate_portfolio(&[&a, &b], None, "momentum", &crossover_params(10, 50), None)
            .unwrap();

        assert_eq!(result.assets, vec!["SPY".to_string(), "QQQ".to_string()]);
        assert_eq!(result.metrics.num_trades, 2);
        let single = evaluator.evaluate(&a, "momentum", &crossover_params(10, 50)).unwrap();
        assert_relative_eq!(
            result.metrics.total_return,
            single.metrics.total_return,
            epsilon = 1e-9
        );
    }

    #[test]
    fn book_without_source_reports_missing_ticker() {
        let mut book = AssetBook::new(None);
        book.insert(rising("SPY", 10));
        assert_eq!(book.load(&["SPY".to_string()]).unwrap().len(), 1);
        let err = book.load(&["SPY".to_string(), "QQQ".to_string()]).unwrap_err();
        match err {
            ForwardtestError::DataUnavailable { ticker, .. } => assert_eq!(ticker, "QQQ"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn candidate_on_reference_asset() {
        let registry = StrategyRegistry::builtin();
        let evaluator = Evaluator::new(&registry, no_cost());
        let series = rising("SPY", 300);
        let mut book = AssetBook::new(None);
        let window = EvaluationWindow {
            warmup_start: d(0),
            start: d(100),
            end: d(200),
        };
        let candidate =
            Candidate::new("momentum", crossover_params(10, 50)).with_assets(vec!["SPY".into()]);
        let result = evaluator.evaluate_candidate(&mut book, &series, &candidate, &window).unwrap();
        assert_eq!(result.assets, vec!["SPY".to_string()]);
        assert_eq!(result.returns.len(), 100);
    }
}

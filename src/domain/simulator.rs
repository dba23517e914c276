//! Position and P&L simulation.
//!
//! A signal becomes a position lagged by one bar, the position earns the
//! close-to-close return of the bar it is held over, and every change in
//! position pays a linear cost in basis points of the change. Equity
//! compounds net returns from the initial capital.

use chrono::NaiveDate;
use std::ops::Range;

use crate::domain::error::ForwardtestError;
use crate::domain::price_series::{common_dates, PriceSeries};
use crate::domain::signal::{lagged_positions, Signal};

const BASIS_POINTS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub cost_bps: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 100_000.0,
            cost_bps: 10.0,
        }
    }
}

/// Bar-by-bar simulation output, index-aligned with the simulated dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub dates: Vec<NaiveDate>,
    /// Exposure held during each bar, in [0, 1].
    pub positions: Vec<f64>,
    pub gross_returns: Vec<f64>,
    pub costs: Vec<f64>,
    /// Net returns: gross return minus cost.
    pub returns: Vec<f64>,
    pub equity: Vec<f64>,
    /// Positions established on each bar (flat to non-flat transitions).
    pub entries: Vec<usize>,
    pub initial_capital: f64,
}

impl Simulation {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(self.initial_capital)
    }

    /// Sub-range of the simulation with equity restarted at the initial capital.
    ///
    /// Positions carried into the range from earlier bars are kept, so a
    /// window that follows a warmup period starts with whatever exposure the
    /// warmup established.
    pub fn window(&self, range: Range<usize>) -> Simulation {
        let range = range.start.min(self.len())..range.end.min(self.len());
        let returns = self.returns[range.clone()].to_vec();
        Simulation {
            dates: self.dates[range.clone()].to_vec(),
            positions: self.positions[range.clone()].to_vec(),
            gross_returns: self.gross_returns[range.clone()].to_vec(),
            costs: self.costs[range.clone()].to_vec(),
            equity: compound(self.initial_capital, &returns),
            returns,
            entries: self.entries[range].to_vec(),
            initial_capital: self.initial_capital,
        }
    }
}

/// Equity curve from an initial capital and a net return series.
pub fn compound(initial_capital: f64, returns: &[f64]) -> Vec<f64> {
    let mut equity = Vec::with_capacity(returns.len());
    let mut growth = 1.0;
    for r in returns {
        growth *= 1.0 + r;
        equity.push(initial_capital * growth);
    }
    equity
}

/// Cost of moving from `previous` to `current` exposure, as a fraction of equity.
pub fn transaction_cost(previous: f64, current: f64, cost_bps: f64) -> f64 {
    (current - previous).abs() * cost_bps / BASIS_POINTS
}

pub fn simulate(
    series: &PriceSeries,
    signal: &Signal,
    config: &SimulationConfig,
) -> Result<Simulation, ForwardtestError> {
    if signal.len() != series.len() {
        return Err(ForwardtestError::SignalLength {
            expected: series.len(),
            actual: signal.len(),
        });
    }

    let bars = series.bars();
    let positions = lagged_positions(&signal.exposure());
    let len = bars.len();

    let mut gross_returns = vec![0.0; len];
    let mut costs = vec![0.0; len];
    let mut returns = vec![0.0; len];
    let mut entries = vec![0; len];

    let mut previous = 0.0;
    for t in 0..len {
        let position = positions[t];
        if t > 0 {
            gross_returns[t] = bars[t].return_since(bars[t - 1].close) * position;
        }
        costs[t] = transaction_cost(previous, position, config.cost_bps);
        returns[t] = gross_returns[t] - costs[t];
        if previous == 0.0 && position != 0.0 {
            entries[t] = 1;
        }
        previous = position;
    }

    Ok(Simulation {
        dates: series.dates(),
        positions,
        gross_returns,
        costs,
        equity: compound(config.initial_capital, &returns),
        returns,
        entries,
        initial_capital: config.initial_capital,
    })
}

/// Scales weights to sum to one; `None` means equal weight across `count` assets.
pub fn normalize_weights(
    weights: Option<&[f64]>,
    count: usize,
) -> Result<Vec<f64>, ForwardtestError> {
    let invalid = |reason: String| ForwardtestError::configuration("portfolio", reason);
    if count == 0 {
        return Err(invalid("no assets to weight".to_string()));
    }
    let Some(weights) = weights else {
        return Ok(vec![1.0 / count as f64; count]);
    };
    if weights.len() != count {
        return Err(invalid(format!("{} weights given for {} assets", weights.len(), count)));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid("weights must be finite and non-negative".to_string()));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(invalid("weights sum to zero".to_string()));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegSimulation {
    pub ticker: String,
    pub weight: f64,
    pub simulation: Simulation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSimulation {
    pub legs: Vec<LegSimulation>,
    /// Sum of the leg equity curves over the dates every leg has.
    pub combined: Simulation,
}

/// Simulates each asset on its share of capital and sums the equity curves
/// over the common dates.
///
/// Any missing or empty asset aborts the whole run.
pub fn simulate_portfolio(
    legs: &[(&PriceSeries, &Signal)],
    weights: Option<&[f64]>,
    config: &SimulationConfig,
) -> Result<PortfolioSimulation, ForwardtestError> {
    if legs.is_empty() {
        return Err(ForwardtestError::data_unavailable("portfolio", "no assets requested"));
    }
    if let Some((series, _)) = legs.iter().find(|(series, _)| series.is_empty()) {
        return Err(ForwardtestError::data_unavailable(&series.ticker, "empty price series"));
    }
    let weights = normalize_weights(weights, legs.len())?;

    let mut simulated = Vec::with_capacity(legs.len());
    for ((series, signal), &weight) in legs.iter().zip(&weights) {
        let leg_config = SimulationConfig {
            initial_capital: config.initial_capital * weight,
            cost_bps: config.cost_bps,
        };
        simulated.push(LegSimulation {
            ticker: series.ticker.clone(),
            weight,
            simulation: simulate(series, signal, &leg_config)?,
        });
    }

    let all_series: Vec<&PriceSeries> = legs.iter().map(|(series, _)| *series).collect();
    let dates = common_dates(&all_series);
    if dates.is_empty() {
        return Err(ForwardtestError::data_unavailable(
            "portfolio",
            "assets share no trading dates",
        ));
    }

    let aligned: Vec<Vec<usize>> = all_series
        .iter()
        .map(|series| dates.iter().filter_map(|d| series.get_index(*d)).collect())
        .collect();

    let combined = combine(&simulated, &aligned, dates, config.initial_capital);
    Ok(PortfolioSimulation {
        legs: simulated,
        combined,
    })
}

fn combine(
    legs: &[LegSimulation],
    aligned: &[Vec<usize>],
    dates: Vec<NaiveDate>,
    initial_capital: f64,
) -> Simulation {
    let len = dates.len();
    let mut equity = vec![0.0; len];
    let mut positions = vec![0.0; len];
    let mut costs = vec![0.0; len];
    let mut entries = vec![0; len];

    for k in 0..len {
        let previous_total: f64 = if k == 0 {
            initial_capital
        } else {
            equity[k - 1]
        };
        for (leg, indices) in legs.iter().zip(aligned) {
            let i = indices[k];
            let sim = &leg.simulation;
            let previous_leg = if k == 0 {
                sim.initial_capital
            } else {
                sim.equity[indices[k - 1]]
            };
            let share = if previous_total > 0.0 {
                previous_leg / previous_total
            } else {
                0.0
            };
            equity[k] += sim.equity[i];
            positions[k] += share * sim.positions[i];
            costs[k] += share * sim.costs[i];
            let previous_position = if k == 0 { 0.0 } else { sim.positions[indices[k - 1]] };
            if previous_position == 0.0 && sim.positions[i] != 0.0 {
                entries[k] += 1;
            }
        }
    }

    let mut returns = Vec::with_capacity(len);
    let mut previous = initial_capital;
    for &e in &equity {
        returns.push(if previous > 0.0 { e / previous - 1.0 } else { 0.0 });
        previous = e;
    }
    let gross_returns = returns.iter().zip(&costs).map(|(r, c)| r + c).collect();

    Simulation {
        dates,
        positions,
        gross_returns,
        costs,
        returns,
        equity,
        entries,
        initial_capital,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn series(ticker: &str, closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar::flat(d(i as i64), c))
            .collect();
        PriceSeries::new(ticker, bars)
    }

    fn no_cost() -> SimulationConfig {
        SimulationConfig {
            initial_capital: 1000.0,
            cost_bps: 0.0,
        }
    }

    #[test]
    fn position_lags_signal() {
        let s = series("A", &[100.0, 110.0, 121.0, 133.1]);
        let signal = Signal::Level(vec![1.0, 1.0, 0.0, 0.0]);
        let sim = simulate(&s, &signal, &no_cost()).unwrap();

        assert_eq!(sim.positions, vec![0.0, 1.0, 1.0, 0.0]);
        assert_relative_eq!(sim.returns[0], 0.0);
        assert_relative_eq!(sim.returns[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(sim.returns[2], 0.1, epsilon = 1e-12);
        assert_relative_eq!(sim.returns[3], 0.0);
        assert_relative_eq!(sim.final_equity(), 1210.0, epsilon = 1e-9);
        assert_eq!(sim.entries, vec![0, 1, 0, 0]);
    }

    #[test]
    fn costs_charged_on_position_changes() {
        let s = series("A", &[100.0, 100.0, 100.0, 100.0, 100.0]);
        let signal = Signal::Level(vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        let config = SimulationConfig {
            initial_capital: 1000.0,
            cost_bps: 10.0,
        };
        let sim = simulate(&s, &signal, &config).unwrap();

        assert_eq!(sim.costs.len(), 5);
        assert_relative_eq!(sim.costs[0], 0.0);
        assert_relative_eq!(sim.costs[1], 0.001, epsilon = 1e-15);
        assert_relative_eq!(sim.costs[2], 0.0);
        assert_relative_eq!(sim.costs[3], 0.001, epsilon = 1e-15);
        assert_relative_eq!(sim.costs[4], 0.0);
        assert_relative_eq!(sim.final_equity(), 1000.0 * 0.999 * 0.999, epsilon = 1e-9);
    }

    #[test]
    fn crossover_signal_simulates() {
        let s = series("A", &[100.0, 101.0, 102.0, 103.0]);
        let signal = Signal::Crossover {
            entries: vec![true, false, false, false],
            exits: vec![false, false, true, false],
        };
        let sim = simulate(&s, &signal, &no_cost()).unwrap();
        assert_eq!(sim.positions, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn length_mismatch_rejected() {
        let s = series("A", &[100.0, 101.0]);
        let err = simulate(&s, &Signal::flat(3), &no_cost()).unwrap_err();
        assert!(matches!(err, ForwardtestError::SignalLength { expected: 2, actual: 3 }));
    }

    #[test]
    fn window_rebases_equity() {
        let s = series("A", &[100.0, 110.0, 121.0, 133.1]);
        let sim = simulate(&s, &Signal::Level(vec![1.0; 4]), &no_cost()).unwrap();
        let window = sim.window(2..4);

        assert_eq!(window.len(), 2);
        assert_eq!(window.dates, vec![d(2), d(3)]);
        assert_relative_eq!(window.equity[0], 1100.0, epsilon = 1e-9);
        assert_relative_eq!(window.equity[1], 1210.0, epsilon = 1e-9);
        assert_eq!(window.positions, vec![1.0, 1.0]);
        assert_eq!(window.entries, vec![0, 0]);
    }

    #[test]
    fn window_clamps_out_of_range() {
        let s = series("A", &[100.0, 110.0]);
        let sim = simulate(&s, &Signal::flat(2), &no_cost()).unwrap();
        assert!(sim.window(5..9).is_empty());
    }

    #[test]
    fn weights_normalized() {
        assert_eq!(normalize_weights(None, 4).unwrap(), vec![0.25; 4]);
        let w = normalize_weights(Some(&[3.0, 1.0]), 2).unwrap();
        assert_relative_eq!(w[0], 0.75);
        assert_relative_eq!(w[1], 0.25);
        assert!(normalize_weights(Some(&[1.0]), 2).is_err());
        assert!(normalize_weights(Some(&[0.0, 0.0]), 2).is_err());
        assert!(normalize_weights(Some(&[-1.0, 2.0]), 2).is_err());
    }

    #[test]
    fn portfolio_sums_leg_equity() {
        let a = series("A", &[100.0, 110.0, 121.0]);
        let b = series("B", &[100.0, 100.0, 100.0]);
        let long = Signal::Level(vec![1.0; 3]);
        let portfolio = simulate_portfolio(&[(&a, &long), (&b, &long)], None, &no_cost()).unwrap();

        assert_eq!(portfolio.legs.len(), 2);
        assert_relative_eq!(portfolio.legs[0].simulation.initial_capital, 500.0);
        let combined = &portfolio.combined;
        assert_relative_eq!(combined.equity[0], 1000.0, epsilon = 1e-9);
        assert_relative_eq!(combined.equity[1], 1050.0, epsilon = 1e-9);
        assert_relative_eq!(combined.equity[2], 1105.0, epsilon = 1e-9);
        assert_relative_eq!(combined.returns[1], 0.05, epsilon = 1e-12);
        assert_eq!(combined.entries, vec![0, 2, 0]);
    }

    #[test]
    fn portfolio_uses_common_dates() {
        let a = series("A", &[100.0, 101.0, 102.0, 103.0]);
        let b_bars = vec![OhlcvBar::flat(d(1), 50.0), OhlcvBar::flat(d(3), 51.0)];
        let b = PriceSeries::new("B", b_bars);
        let sa = Signal::flat(4);
        let sb = Signal::flat(2);
        let portfolio = simulate_portfolio(&[(&a, &sa), (&b, &sb)], None, &no_cost()).unwrap();

        assert_eq!(portfolio.combined.dates, vec![d(1), d(3)]);
        assert!(portfolio.combined.equity.iter().all(|e| (e - 1000.0).abs() < 1e-9));
    }

    #[test]
    fn portfolio_aborts_on_empty_asset() {
        let a = series("A", &[100.0, 101.0]);
        let empty = PriceSeries::new("QQQ", vec![]);
        let sa = Signal::flat(2);
        let se = Signal::flat(0);
        let err = simulate_portfolio(&[(&a, &sa), (&empty, &se)], None, &no_cost()).unwrap_err();
        match err {
            ForwardtestError::DataUnavailable { ticker, .. } => assert_eq!(ticker, "QQQ"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn portfolio_without_common_dates() {
        let a = series("A", &[100.0]);
        let b = PriceSeries::new("B", vec![OhlcvBar::flat(d(10), 1.0)]);
        let s = Signal::flat(1);
        assert!(matches!(
            simulate_portfolio(&[(&a, &s), (&b, &s)], None, &no_cost()),
            Err(ForwardtestError::DataUnavailable { .. })
        ));
    }
}

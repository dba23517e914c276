//! Performance metrics.
//!
//! Metrics are always derived from a simulation's return and equity series,
//! never stored on their own.

use crate::domain::simulator::Simulation;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

const MIN_STD: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline, in (-1, 0].
    pub max_drawdown: f64,
    pub num_trades: usize,
}

impl Metrics {
    pub fn compute(simulation: &Simulation) -> Self {
        Metrics {
            total_return: total_return(simulation.initial_capital, &simulation.equity),
            sharpe_ratio: sharpe_ratio(&simulation.returns),
            max_drawdown: max_drawdown(simulation.initial_capital, &simulation.equity),
            num_trades: simulation.entries.iter().sum(),
        }
    }
}

pub fn total_return(initial_capital: f64, equity: &[f64]) -> f64 {
    match equity.last() {
        Some(&last) if initial_capital > 0.0 => last / initial_capital - 1.0,
        _ => 0.0,
    }
}

/// Annualized Sharpe ratio of daily returns using the sample standard deviation.
///
/// 0.0 for fewer than two observations or (near) zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let n = returns.len();
    if n < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / n as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if !std.is_finite() || std <= MIN_STD {
        return 0.0;
    }

    let sharpe = mean / std * TRADING_DAYS_PER_YEAR.sqrt();
    if sharpe.is_finite() { sharpe } else { 0.0 }
}

/// Minimum of equity / running peak - 1, with the initial capital as the first peak.
pub fn max_drawdown(initial_capital: f64, equity: &[f64]) -> f64 {
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;

    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            let dd = e / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn simulation(returns: Vec<f64>, entries: Vec<usize>) -> Simulation {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let len = returns.len();
        Simulation {
            dates: (0..len).map(|i| start + Duration::days(i as i64)).collect(),
            positions: vec![1.0; len],
            gross_returns: returns.clone(),
            costs: vec![0.0; len],
            equity: crate::domain::simulator::compound(100.0, &returns),
            returns,
            entries,
            initial_capital: 100.0,
        }
    }

    #[test]
    fn sharpe_degenerate_cases() {
        assert_eq!(sharpe_ratio(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[0.01]), 0.0);
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01]), 0.0);
        assert_eq!(sharpe_ratio(&[0.0; 10]), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let mean = 0.005;
        let var = ((0.005_f64).powi(2)
            + (0.015_f64).powi(2)
            + (0.015_f64).powi(2)
            + (0.005_f64).powi(2))
            / 3.0;
        let expected = mean / var.sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(sharpe_ratio(&returns), expected, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_non_finite_is_zero() {
        assert_eq!(sharpe_ratio(&[f64::NAN, 0.01, 0.02]), 0.0);
    }

    #[test]
    fn drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(100.0, &[100.0, 101.0, 101.0, 105.0]), 0.0);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = max_drawdown(100.0, &[110.0, 88.0, 120.0, 90.0]);
        assert_relative_eq!(dd, -0.25, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_counts_initial_capital_as_peak() {
        let dd = max_drawdown(100.0, &[80.0, 90.0]);
        assert_relative_eq!(dd, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn total_return_from_equity() {
        assert_relative_eq!(total_return(100.0, &[105.0, 120.0]), 0.2, epsilon = 1e-12);
        assert_eq!(total_return(100.0, &[]), 0.0);
    }

    #[test]
    fn compute_from_simulation() {
        let sim = simulation(vec![0.0, 0.1, -0.1, 0.05], vec![0, 1, 0, 1]);
        let metrics = Metrics::compute(&sim);

        assert_relative_eq!(metrics.total_return, 1.1 * 0.9 * 1.05 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.max_drawdown, -0.1, epsilon = 1e-12);
        assert_eq!(metrics.num_trades, 2);
        assert!(metrics.sharpe_ratio.is_finite());
    }

    #[test]
    fn flat_simulation_metrics() {
        let sim = simulation(vec![0.0; 5], vec![0; 5]);
        let metrics = Metrics::compute(&sim);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.num_trades, 0);
    }
}

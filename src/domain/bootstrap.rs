//! Bootstrap lower-bound Sharpe scoring.
//!
//! A candidate's net returns are resampled with replacement, the Sharpe ratio
//! of each resample is computed, and a low percentile of that distribution
//! becomes the score. Edges concentrated in a few bars produce wide
//! distributions and therefore low scores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::metrics::sharpe_ratio;

/// Score reported for return series too short to resample meaningfully.
/// It is a display value only: such candidates rank below every scored one.
pub const INSUFFICIENT_DATA_SCORE: f64 = -999.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapConfig {
    pub samples: usize,
    /// Percentile of the resampled Sharpe distribution, in (0, 100).
    pub percentile: f64,
    pub min_observations: usize,
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            samples: 100,
            percentile: 5.0,
            min_observations: 20,
            seed: None,
        }
    }
}

pub struct BootstrapScorer {
    config: BootstrapConfig,
    rng: StdRng,
}

impl BootstrapScorer {
    pub fn new(config: BootstrapConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        BootstrapScorer { config, rng }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Resampled Sharpe ratios, one per bootstrap sample.
    pub fn distribution(&mut self, returns: &[f64]) -> Vec<f64> {
        let n = returns.len();
        if n == 0 {
            return Vec::new();
        }
        let mut sample = vec![0.0; n];
        let mut sharpes = Vec::with_capacity(self.config.samples);
        for _ in 0..self.config.samples {
            for slot in sample.iter_mut() {
                *slot = returns[self.rng.gen_range(0..n)];
            }
            sharpes.push(sharpe_ratio(&sample));
        }
        sharpes
    }

    /// Lower-percentile Sharpe of the resampled returns, or `None` when there
    /// are fewer than `min_observations` returns.
    pub fn score(&mut self, returns: &[f64]) -> Option<f64> {
        if returns.len() < self.config.min_observations {
            return None;
        }
        let mut sharpes = self.distribution(returns);
        percentile(&mut sharpes, self.config.percentile)
    }
}

/// Linearly interpolated percentile, `pct` in [0, 100]. Sorts `values` in place.
pub fn percentile(values: &mut [f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seeded(seed: u64) -> BootstrapScorer {
        BootstrapScorer::new(BootstrapConfig {
            seed: Some(seed),
            ..BootstrapConfig::default()
        })
    }

    fn noisy_returns(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 0.001 + if i % 3 == 0 { 0.01 } else { -0.004 })
            .collect()
    }

    #[test]
    fn percentile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(percentile(&mut values, 50.0).unwrap(), 3.0);
        assert_relative_eq!(percentile(&mut values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&mut values, 100.0).unwrap(), 5.0);
        assert_relative_eq!(
            percentile(&mut values, 5.0).unwrap(),
            1.2,
            epsilon = 1e-12
        );
        assert!(percentile(&mut [], 5.0).is_none());
    }

    #[test]
    fn short_series_is_unscored() {
        let mut scorer = seeded(1);
        assert_eq!(scorer.score(&noisy_returns(19)), None);
        assert!(scorer.score(&noisy_returns(20)).is_some());
    }

    #[test]
    fn seeded_scores_are_reproducible() {
        let returns = noisy_returns(120);
        assert_eq!(seeded(42).score(&returns), seeded(42).score(&returns));
    }

    #[test]
    fn score_is_below_point_estimate() {
        let returns = noisy_returns(250);
        let point = sharpe_ratio(&returns);
        let score = seeded(7).score(&returns).unwrap();
        assert!(score < point, "score {score} should be below point estimate {point}");
    }

    #[test]
    fn distribution_has_one_value_per_sample() {
        let mut scorer = seeded(3);
        assert_eq!(scorer.distribution(&noisy_returns(30)).len(), 100);
        assert!(scorer.distribution(&[]).is_empty());
    }

    #[test]
    fn constant_returns_score_zero() {
        let mut scorer = seeded(5);
        assert_eq!(scorer.score(&[0.001; 40]), Some(0.0));
    }

    #[test]
    fn larger_sample_count_keeps_center() {
        let returns = noisy_returns(200);
        let small = BootstrapScorer::new(BootstrapConfig {
            samples: 200,
            percentile: 50.0,
            seed: Some(11),
            ..BootstrapConfig::default()
        })
        .score(&returns)
        .unwrap();
        let large = BootstrapScorer::new(BootstrapConfig {
            samples: 2000,
            percentile: 50.0,
            seed: Some(11),
            ..BootstrapConfig::default()
        })
        .score(&returns)
        .unwrap();
        assert!((small - large).abs() < 0.5, "median moved from {small} to {large}");
    }
}

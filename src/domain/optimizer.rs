//! Grid search over candidate parameter sets.
//!
//! Candidates are evaluated in order and the highest score wins; on a tie
//! the earlier candidate is kept. Candidates with too few returns to
//! bootstrap rank below every scored candidate. A candidate whose evaluation fails is
//! recorded as rejected and the search goes on, except for an unknown
//! strategy name, which aborts the search.

use std::fmt;

use tracing::warn;

use crate::domain::bootstrap::{BootstrapConfig, BootstrapScorer, INSUFFICIENT_DATA_SCORE};
use crate::domain::error::ForwardtestError;
use crate::domain::evaluation::EvaluationResult;
use crate::domain::metrics::Metrics;
use crate::domain::params::{format_params, ParameterSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub strategy: String,
    pub params: ParameterSet,
    /// Tickers to trade; empty means the study's reference asset.
    pub assets: Vec<String>,
}

impl Candidate {
    pub fn new(strategy: impl Into<String>, params: ParameterSet) -> Self {
        Candidate {
            strategy: strategy.into(),
            params,
            assets: Vec::new(),
        }
    }

    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.strategy, format_params(&self.params))?;
        if !self.assets.is_empty() {
            write!(f, " on {}", self.assets.join("+"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoringMode {
    Sharpe,
    Bootstrap(BootstrapConfig),
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Sharpe => write!(f, "sharpe"),
            ScoringMode::Bootstrap(cfg) => {
                write!(f, "bootstrap(p{}, n={})", cfg.percentile, cfg.samples)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Position in the candidate list.
    pub index: usize,
    /// The candidate with its parameters as normalized for evaluation.
    pub candidate: Candidate,
    /// `INSUFFICIENT_DATA_SCORE` when `insufficient_data` is set.
    pub score: f64,
    pub insufficient_data: bool,
    pub metrics: Metrics,
}

impl ScoredCandidate {
    /// Ordering key: scored candidates first, then score with NaN lowest.
    fn rank(&self) -> (bool, f64) {
        let score = if self.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.score
        };
        (!self.insufficient_data, score)
    }

    fn outranks(&self, other: &ScoredCandidate) -> bool {
        let (tier, score) = self.rank();
        let (other_tier, other_score) = other.rank();
        tier > other_tier || (tier == other_tier && score > other_score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub index: usize,
    pub candidate: Candidate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Optimization {
    pub scored: Vec<ScoredCandidate>,
    pub rejected: Vec<RejectedCandidate>,
    best: Option<usize>,
}

impl Optimization {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.best.and_then(|i| self.scored.get(i))
    }
}

pub struct GridSearch {
    scoring: ScoringMode,
    scorer: Option<BootstrapScorer>,
}

impl GridSearch {
    pub fn new(scoring: ScoringMode) -> Self {
        let scorer = match scoring {
            ScoringMode::Sharpe => None,
            ScoringMode::Bootstrap(config) => Some(BootstrapScorer::new(config)),
        };
        GridSearch { scoring, scorer }
    }

    pub fn scoring(&self) -> &ScoringMode {
        &self.scoring
    }

    /// Score of an evaluation, `None` when bootstrap scoring lacks data.
    pub fn score(&mut self, result: &EvaluationResult) -> Option<f64> {
        match self.scorer.as_mut() {
            Some(scorer) => scorer.score(&result.returns),
            None => Some(result.metrics.sharpe_ratio),
        }
    }

    pub fn run<F>(
        &mut self,
        candidates: &[Candidate],
        mut evaluate: F,
    ) -> Result<Optimization, ForwardtestError>
    where
        F: FnMut(&Candidate) -> Result<EvaluationResult, ForwardtestError>,
    {
        let mut optimization = Optimization::default();

        for (index, candidate) in candidates.iter().enumerate() {
            let result = match evaluate(candidate) {
                Ok(result) => result,
                Err(err @ ForwardtestError::UnknownStrategy { .. }) => return Err(err),
                Err(err) => {
                    warn!(candidate = %candidate, error = %err, "candidate rejected");
                    optimization.rejected.push(RejectedCandidate {
                        index,
                        candidate: candidate.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let score = self.score(&result);
            let scored = ScoredCandidate {
                index,
                candidate: Candidate {
                    strategy: result.strategy.clone(),
                    params: result.params.clone(),
                    assets: candidate.assets.clone(),
                },
                score: score.unwrap_or(INSUFFICIENT_DATA_SCORE),
                insufficient_data: score.is_none(),
                metrics: result.metrics,
            };
            if optimization.best().is_none_or(|best| scored.outranks(best)) {
                optimization.best = Some(optimization.scored.len());
            }
            optimization.scored.push(scored);
        }

        Ok(optimization)
    }
}

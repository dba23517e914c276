//! Strategy proposal port.
//!
//! A proposal source sees the market context of a training window and
//! answers with candidate (strategy, parameters, assets) triples. How it
//! produces them is its own business; the walk-forward loop only scores them.

use crate::domain::context::MarketContext;
use crate::domain::error::ForwardtestError;
use crate::domain::optimizer::Candidate;

pub trait ProposalSource {
    fn propose(&mut self, context: &MarketContext) -> Result<Vec<Candidate>, ForwardtestError>;
}

/// Proposes the same candidates for every window.
#[derive(Debug, Clone, Default)]
pub struct FixedProposals {
    candidates: Vec<Candidate>,
}

impl FixedProposals {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl ProposalSource for FixedProposals {
    fn propose(&mut self, _context: &MarketContext) -> Result<Vec<Candidate>, ForwardtestError> {
        Ok(self.candidates.clone())
    }
}

//! Proposal source read from the study configuration.
//!
//! `[proposal.NAME]` sections name one candidate each; `[grid.NAME]` sections
//! expand comma-separated parameter axes into their cartesian product. Both
//! take `strategy` and an optional comma-separated `assets` list. Sections are
//! read in name order and grid axes vary in key order, the last key fastest,
//! so the candidate order is the same on every run.

use crate::domain::context::MarketContext;
use crate::domain::error::ForwardtestError;
use crate::domain::optimizer::Candidate;
use crate::domain::params::{ParamValue, ParameterSet};
use crate::ports::config_port::ConfigPort;
use crate::ports::proposal_port::ProposalSource;

const PROPOSAL_PREFIX: &str = "proposal.";
const GRID_PREFIX: &str = "grid.";
const RESERVED_KEYS: [&str; 2] = ["strategy", "assets"];

#[derive(Debug, Clone, Default)]
pub struct ConfigProposalAdapter {
    candidates: Vec<Candidate>,
}

impl ConfigProposalAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ForwardtestError> {
        let mut candidates = Vec::new();
        for section in config.sections() {
            if section.starts_with(PROPOSAL_PREFIX) {
                candidates.push(read_proposal(config, &section)?);
            } else if section.starts_with(GRID_PREFIX) {
                candidates.extend(read_grid(config, &section)?);
            }
        }
        Ok(Self { candidates })
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl ProposalSource for ConfigProposalAdapter {
    fn propose(&mut self, _context: &MarketContext) -> Result<Vec<Candidate>, ForwardtestError> {
        Ok(self.candidates.clone())
    }
}

fn parse_error(section: &str, reason: impl Into<String>) -> ForwardtestError {
    ForwardtestError::ProposalParse {
        section: section.to_string(),
        reason: reason.into(),
    }
}

fn strategy(config: &dyn ConfigPort, section: &str) -> Result<String, ForwardtestError> {
    config
        .get_string(section, "strategy")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| parse_error(section, "missing strategy"))
}

fn assets(config: &dyn ConfigPort, section: &str) -> Vec<String> {
    config
        .get_string(section, "assets")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parameter_keys(config: &dyn ConfigPort, section: &str) -> Vec<String> {
    config
        .keys(section)
        .into_iter()
        .filter(|k| !RESERVED_KEYS.contains(&k.as_str()))
        .collect()
}

fn read_proposal(config: &dyn ConfigPort, section: &str) -> Result<Candidate, ForwardtestError> {
    let strategy = strategy(config, section)?;
    let mut params = ParameterSet::new();
    for key in parameter_keys(config, section) {
        let raw = config.get_string(section, &key).unwrap_or_default();
        params.insert(key, ParamValue::parse(&raw));
    }
    Ok(Candidate::new(strategy, params).with_assets(assets(config, section)))
}

fn read_grid(config: &dyn ConfigPort, section: &str) -> Result<Vec<Candidate>, ForwardtestError> {
    let strategy = strategy(config, section)?;
    let assets = assets(config, section);

    let mut axes: Vec<(String, Vec<ParamValue>)> = Vec::new();
    for key in parameter_keys(config, section) {
        let raw = config.get_string(section, &key).unwrap_or_default();
        let values: Vec<ParamValue> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ParamValue::parse_scalar)
            .collect();
        if values.is_empty() {
            return Err(parse_error(section, format!("grid axis {} has no values", key)));
        }
        axes.push((key, values));
    }

    Ok(cartesian_product(&axes)
        .into_iter()
        .map(|params| Candidate::new(strategy.clone(), params).with_assets(assets.clone()))
        .collect())
}

/// Every combination of one value per axis; a grid without axes yields a
/// single empty parameter set.
pub fn cartesian_product(axes: &[(String, Vec<ParamValue>)]) -> Vec<ParameterSet> {
    let mut combos = vec![ParameterSet::new()];
    for (key, values) in axes {
        combos = combos
            .iter()
            .flat_map(|base| {
                values.iter().map(move |value| {
                    let mut params = base.clone();
                    params.insert(key.clone(), value.clone());
                    params
                })
            })
            .collect();
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn adapter(content: &str) -> Result<ConfigProposalAdapter, ForwardtestError> {
        ConfigProposalAdapter::from_config(&FileConfigAdapter::from_string(content).unwrap())
    }

    #[test]
    fn single_proposal() {
        let proposals = adapter(
            "[data]\npath = p\n[proposal.base]\nstrategy = momentum\n\
             fast_window = 10\nslow_window = 50\n",
        )
        .unwrap();

        assert_eq!(proposals.candidates().len(), 1);
        let c = &proposals.candidates()[0];
        assert_eq!(c.strategy, "momentum");
        assert_eq!(c.params.get("fast_window"), Some(&ParamValue::Int(10)));
        assert_eq!(c.params.get("slow_window"), Some(&ParamValue::Int(50)));
        assert!(c.assets.is_empty());
    }

    #[test]
    fn proposal_with_assets_and_regime_placeholder() {
        let proposals = adapter(
            "[proposal.rotation]\nstrategy = regime_switch\nassets = SPY, QQQ\nregime = $regime\n",
        )
        .unwrap();

        let c = &proposals.candidates()[0];
        assert_eq!(c.assets, vec!["SPY", "QQQ"]);
        assert_eq!(c.params.get("regime"), Some(&ParamValue::from("$regime")));
        assert!(!c.params.contains_key("assets"));
    }

    #[test]
    fn grid_expands_in_key_order() {
        let proposals = adapter(
            "[grid.mom]\nstrategy = momentum\nfast_window = 10, 20\nslow_window = 50, 100, 200\n",
        )
        .unwrap();
        let pairs: Vec<(i64, i64)> = proposals
            .candidates()
            .iter()
            .map(|c| {
                (
                    c.params["fast_window"].as_i64().unwrap(),
                    c.params["slow_window"].as_i64().unwrap(),
                )
            })
            .collect();

        assert_eq!(
            pairs,
            vec![(10, 50), (10, 100), (10, 200), (20, 50), (20, 100), (20, 200)]
        );
    }

    #[test]
    fn sections_read_in_name_order() {
        let proposals = adapter(
            "[proposal.zeta]\nstrategy = sma_trend\nfast_window = 5\nslow_window = 20\n\
             [proposal.alpha]\nstrategy = kama_trend\n\
             [grid.mid]\nstrategy = momentum\nfast_window = 10\n",
        )
        .unwrap();
        let names: Vec<&str> = proposals.candidates().iter().map(|c| c.strategy.as_str()).collect();
        assert_eq!(names, vec!["momentum", "kama_trend", "sma_trend"]);
    }

    #[test]
    fn missing_strategy_is_parse_error() {
        match adapter("[proposal.broken]\nfast_window = 10\n") {
            Err(ForwardtestError::ProposalParse { section, reason }) => {
                assert_eq!(section, "proposal.broken");
                assert_eq!(reason, "missing strategy");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_grid_axis_is_parse_error() {
        assert!(matches!(
            adapter("[grid.g]\nstrategy = momentum\nfast_window = ,\n"),
            Err(ForwardtestError::ProposalParse { .. })
        ));
    }

    #[test]
    fn no_proposal_sections() {
        let proposals = adapter("[data]\npath = p\n").unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn cartesian_product_without_axes() {
        assert_eq!(cartesian_product(&[]), vec![ParameterSet::new()]);
    }
}

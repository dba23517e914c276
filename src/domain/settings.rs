//! Typed study settings read from the configuration port.

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::domain::bootstrap::BootstrapConfig;
use crate::domain::config_validation::{
    read_bounded, read_date, read_f64, read_seed, require_string, validate_study_config,
    MAX_BOOTSTRAP_SAMPLES, MAX_WARMUP_DAYS, MAX_WINDOW_MONTHS,
};
use crate::domain::error::ForwardtestError;
use crate::domain::optimizer::ScoringMode;
use crate::domain::simulator::SimulationConfig;
use crate::domain::walk_forward::WalkForwardConfig;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: PathBuf,
    pub reference_asset: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    pub data: DataSettings,
    pub simulation: SimulationConfig,
    pub bootstrap: BootstrapConfig,
    pub walk_forward: WalkForwardConfig,
}

impl StudyConfig {
    /// Validates, then reads every setting, applying defaults for absent keys.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ForwardtestError> {
        validate_study_config(config)?;

        let data = DataSettings {
            path: PathBuf::from(require_string(config, "data", "path")?),
            reference_asset: require_string(config, "data", "reference_asset")?,
            start_date: read_date(config, "data", "start_date")?,
            end_date: read_date(config, "data", "end_date")?,
        };

        let simulation = SimulationConfig {
            initial_capital: read_f64(config, "backtest", "initial_capital", 100_000.0)?,
            cost_bps: read_f64(config, "backtest", "cost_bps", 10.0)?,
        };

        let bootstrap = BootstrapConfig {
            samples: read_bounded(
                config,
                "bootstrap",
                "samples",
                100,
                1,
                Some(MAX_BOOTSTRAP_SAMPLES),
            )?,
            percentile: read_f64(config, "bootstrap", "percentile", 5.0)?,
            min_observations: read_bounded(config, "bootstrap", "min_observations", 20, 2, None)?,
            seed: read_seed(config)?,
        };

        let scoring = match config.get_string("walk_forward", "scoring") {
            Some(s) if s.trim().eq_ignore_ascii_case("sharpe") => ScoringMode::Sharpe,
            _ => ScoringMode::Bootstrap(bootstrap),
        };

        let walk_forward = WalkForwardConfig {
            window_months: read_bounded(
                config,
                "walk_forward",
                "window_months",
                6,
                1,
                Some(MAX_WINDOW_MONTHS),
            )?,
            warmup_days: read_bounded(
                config,
                "walk_forward",
                "warmup_days",
                252,
                0,
                Some(MAX_WARMUP_DAYS),
            )?,
            min_window_bars: read_bounded(config, "walk_forward", "min_window_bars", 50, 1, None)?,
            scoring,
        };

        Ok(StudyConfig {
            data,
            simulation,
            bootstrap,
            walk_forward,
        })
    }
}

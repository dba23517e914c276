//! Configuration validation.
//!
//! Validates every study setting before a run starts. Values that are present
//! but malformed are errors rather than silently replaced by defaults.

use crate::domain::error::ForwardtestError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const SCORING_MODES: [&str; 2] = ["bootstrap", "sharpe"];

pub const MAX_WINDOW_MONTHS: i64 = 1_200;
pub const MAX_WARMUP_DAYS: i64 = 36_500;
pub const MAX_BOOTSTRAP_SAMPLES: i64 = 1_000_000;

pub fn validate_study_config(config: &dyn ConfigPort) -> Result<(), ForwardtestError> {
    validate_data(config)?;
    validate_backtest(config)?;
    validate_bootstrap(config)?;
    validate_walk_forward(config)?;
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), ForwardtestError> {
    require_string(config, "data", "path")?;
    require_string(config, "data", "reference_asset")?;

    let start = read_date(config, "data", "start_date")?;
    let end = read_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), ForwardtestError> {
    if read_f64(config, "backtest", "initial_capital", 100_000.0)? <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if read_f64(config, "backtest", "cost_bps", 10.0)? < 0.0 {
        return Err(invalid("backtest", "cost_bps", "cost_bps must be non-negative"));
    }
    Ok(())
}

fn validate_bootstrap(config: &dyn ConfigPort) -> Result<(), ForwardtestError> {
    read_bounded::<usize>(config, "bootstrap", "samples", 100, 1, Some(MAX_BOOTSTRAP_SAMPLES))?;
    let percentile = read_f64(config, "bootstrap", "percentile", 5.0)?;
    if percentile <= 0.0 || percentile >= 100.0 {
        return Err(invalid(
            "bootstrap",
            "percentile",
            "percentile must be between 0 and 100",
        ));
    }
    read_bounded::<usize>(config, "bootstrap", "min_observations", 20, 2, None)?;
    read_seed(config)?;
    Ok(())
}

fn validate_walk_forward(config: &dyn ConfigPort) -> Result<(), ForwardtestError> {
    read_bounded::<u32>(
        config,
        "walk_forward",
        "window_months",
        6,
        1,
        Some(MAX_WINDOW_MONTHS),
    )?;
    read_bounded::<i64>(
        config,
        "walk_forward",
        "warmup_days",
        252,
        0,
        Some(MAX_WARMUP_DAYS),
    )?;
    read_bounded::<usize>(config, "walk_forward", "min_window_bars", 50, 1, None)?;
    if let Some(scoring) = config.get_string("walk_forward", "scoring") {
        let scoring = scoring.trim().to_lowercase();
        if !SCORING_MODES.contains(&scoring.as_str()) {
            return Err(invalid(
                "walk_forward",
                "scoring",
                &format!("scoring must be one of {}", SCORING_MODES.join(", ")),
            ));
        }
    }
    Ok(())
}

pub(crate) fn invalid(section: &str, key: &str, reason: &str) -> ForwardtestError {
    ForwardtestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, ForwardtestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ForwardtestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

pub(crate) fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ForwardtestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                invalid(section, key, &format!("{} must be a number, got '{}'", key, s))
            }),
    }
}

pub(crate) fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ForwardtestError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse::<i64>().map_err(|_| {
            invalid(section, key, &format!("{} must be an integer, got '{}'", key, s))
        }),
    }
}

/// Integer setting within `[min, max]` (no upper bound when `max` is `None`),
/// converted to the width the study uses.
pub(crate) fn read_bounded<T: TryFrom<i64>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
    max: Option<i64>,
) -> Result<T, ForwardtestError> {
    let value = read_i64(config, section, key, default)?;
    let in_range = value >= min && max.is_none_or(|max| value <= max);
    let converted = if in_range { T::try_from(value).ok() } else { None };
    converted.ok_or_else(|| {
        let reason = match max {
            Some(max) => format!("{} must be between {} and {}", key, min, max),
            None => format!("{} must be at least {}", key, min),
        };
        invalid(section, key, &reason)
    })
}

pub(crate) fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, ForwardtestError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                let reason = format!("invalid {} format, expected YYYY-MM-DD", key);
                invalid(section, key, &reason)
            }),
    }
}

pub(crate) fn read_seed(config: &dyn ConfigPort) -> Result<Option<u64>, ForwardtestError> {
    match config.get_string("bootstrap", "seed") {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid("bootstrap", "seed", "seed must be a non-negative integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = "[data]\npath = ./data\nreference_asset = SPY\n";

    fn config(extra: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(&format!("{}{}", VALID, extra)).unwrap()
    }

    fn assert_invalid(extra: &str, expected_key: &str) {
        match validate_study_config(&config(extra)) {
            Err(ForwardtestError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected invalid {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn minimal_config_is_valid() {
        assert!(validate_study_config(&config("")).is_ok());
    }

    #[test]
    fn missing_data_path() {
        let adapter = FileConfigAdapter::from_string("[data]\nreference_asset = SPY\n").unwrap();
        match validate_study_config(&adapter) {
            Err(ForwardtestError::ConfigMissing { section, key }) => {
                assert_eq!(section, "data");
                assert_eq!(key, "path");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_reference_asset() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = ./data\n").unwrap();
        assert!(matches!(
            validate_study_config(&adapter),
            Err(ForwardtestError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn rejects_bad_backtest_values() {
        assert_invalid("[backtest]\ninitial_capital = 0\n", "initial_capital");
        assert_invalid("[backtest]\ninitial_capital = lots\n", "initial_capital");
        assert_invalid("[backtest]\ncost_bps = -1\n", "cost_bps");
    }

    #[test]
    fn rejects_bad_bootstrap_values() {
        assert_invalid("[bootstrap]\nsamples = 0\n", "samples");
        assert_invalid("[bootstrap]\npercentile = 100\n", "percentile");
        assert_invalid("[bootstrap]\npercentile = 0\n", "percentile");
        assert_invalid("[bootstrap]\nmin_observations = 1\n", "min_observations");
        assert_invalid("[bootstrap]\nseed = -4\n", "seed");
    }

    #[test]
    fn rejects_bad_walk_forward_values() {
        assert_invalid("[walk_forward]\nwindow_months = 0\n", "window_months");
        assert_invalid("[walk_forward]\nwarmup_days = -1\n", "warmup_days");
        assert_invalid("[walk_forward]\nmin_window_bars = 0\n", "min_window_bars");
        assert_invalid("[walk_forward]\nscoring = sortino\n", "scoring");
    }

    #[test]
    fn rejects_out_of_range_walk_forward_values() {
        assert_invalid("[walk_forward]\nwarmup_days = 1000000000\n", "warmup_days");
        assert_invalid("[walk_forward]\nwindow_months = 4294967297\n", "window_months");
        assert_invalid("[walk_forward]\nwindow_months = 1201\n", "window_months");
        assert_invalid("[bootstrap]\nsamples = 5000000\n", "samples");
        assert!(validate_study_config(&config("[walk_forward]\nwarmup_days = 36500\n")).is_ok());
    }

    #[test]
    fn rejects_inverted_dates() {
        assert_invalid("start_date = 2022-01-01\nend_date = 2021-01-01\n", "start_date");
        assert_invalid("start_date = 01/01/2021\n", "start_date");
    }

    #[test]
    fn accepts_full_config() {
        let extra = "start_date = 2015-01-01\nend_date = 2023-12-31\n\
            [backtest]\ninitial_capital = 50000\ncost_bps = 5\n\
            [bootstrap]\nsamples = 200\npercentile = 10\nseed = 42\n\
            [walk_forward]\nwindow_months = 3\nscoring = Sharpe\n";
        assert!(validate_study_config(&config(extra)).is_ok());
    }
}

//! Domain error types.
//!
//! Zero return variance is not an error: Sharpe is 0.0 in that case.

/// Top-level error type for forwardtest.
#[derive(Debug, thiserror::Error)]
pub enum ForwardtestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    /// Missing or empty price series for a requested ticker.
    #[error("data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("unknown strategy '{name}' (known: {})", .known.join(", "))]
    UnknownStrategy { name: String, known: Vec<String> },

    /// Parameter normalization could not resolve a usable parameter set.
    #[error("invalid parameters for {strategy}: {reason}")]
    Configuration { strategy: String, reason: String },

    #[error("signal has {actual} bars but price series has {expected}")]
    SignalLength { expected: usize, actual: usize },

    #[error("proposal error in [{section}]: {reason}")]
    ProposalParse { section: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForwardtestError {
    pub fn configuration(strategy: &str, reason: impl Into<String>) -> Self {
        ForwardtestError::Configuration {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        ForwardtestError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ForwardtestError> for std::process::ExitCode {
    fn from(err: &ForwardtestError) -> Self {
        let code: u8 = match err {
            ForwardtestError::Io(_)
            | ForwardtestError::Csv(_)
            | ForwardtestError::Report { .. } => 1,
            ForwardtestError::ConfigParse { .. }
            | ForwardtestError::ConfigMissing { .. }
            | ForwardtestError::ConfigInvalid { .. }
            | ForwardtestError::ProposalParse { .. } => 2,
            ForwardtestError::UnknownStrategy { .. }
            | ForwardtestError::Configuration { .. }
            | ForwardtestError::SignalLength { .. } => 4,
            ForwardtestError::DataUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_lists_known_names() {
        let err = ForwardtestError::UnknownStrategy {
            name: "mean_reversion".into(),
            known: vec!["kama_trend".into(), "momentum".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown strategy 'mean_reversion' (known: kama_trend, momentum)"
        );
    }

    #[test]
    fn data_unavailable_message() {
        let err = ForwardtestError::data_unavailable("QQQ", "no bars in range");
        assert_eq!(err.to_string(), "data unavailable for QQQ: no bars in range");
    }

    #[test]
    fn configuration_message() {
        let err =
            ForwardtestError::configuration("sma_trend", "missing required parameter fast_window");
        assert_eq!(
            err.to_string(),
            "invalid parameters for sma_trend: missing required parameter fast_window"
        );
    }
}

//! Domain error types.

/// Top-level error type for rsitrader.
///
/// Configuration, feed and warm-up problems are all detected before the
/// simulation loop starts, so a run either fails up front or completes.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid configuration [{section}] {key}: {reason}")]
    InvalidConfiguration {
        section: String,
        key: String,
        reason: String,
    },

    #[error("feed integrity error at bar {index}: {reason}")]
    FeedIntegrity { index: usize, reason: String },

    #[error("insufficient data: have {bars} bars, need at least {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("data source error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidConfiguration {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn feed(index: usize, reason: impl Into<String>) -> Self {
        BacktestError::FeedIntegrity {
            index,
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Data { .. } | BacktestError::Report { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::InvalidConfiguration { .. } => 2,
            BacktestError::FeedIntegrity { .. } => 3,
            BacktestError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

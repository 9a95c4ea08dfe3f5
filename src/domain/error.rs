//! Domain error types.

/// Top-level error type for voltrader.
#[derive(Debug, thiserror::Error)]
pub enum VoltraderError {
    #[error("source error: {reason}")]
    Source { reason: String },

    #[error("source query error: {reason}")]
    SourceQuery { reason: String },

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

    #[error("no data for {symbol} at frequency {frequency}")]
    NoData { symbol: String, frequency: String },

    #[error("data integrity violation for {symbol}: {reason}")]
    DataIntegrity { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VoltraderError {
    /// Shorthand for the eager parameter checks done at construction time.
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        VoltraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn integrity(symbol: &str, reason: impl Into<String>) -> Self {
        VoltraderError::DataIntegrity {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&VoltraderError> for std::process::ExitCode {
    fn from(err: &VoltraderError) -> Self {
        let code: u8 = match err {
            VoltraderError::Io(_) => 1,
            VoltraderError::ConfigParse { .. }
            | VoltraderError::ConfigMissing { .. }
            | VoltraderError::ConfigInvalid { .. } => 2,
            VoltraderError::Source { .. } | VoltraderError::SourceQuery { .. } => 3,
            VoltraderError::NoData { .. } | VoltraderError::DataIntegrity { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

use kabuscope_core::{AnalysisError, ConfigError, FetchError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider details are logged, never printed.
    #[error("could not retrieve data for '{ticker}'")]
    DataUnavailable { ticker: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for CliError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::DataUnavailable { ticker } => Self::DataUnavailable { ticker },
        }
    }
}

impl From<AnalysisError> for CliError {
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::Fetch(error) => error.into(),
            AnalysisError::Config(error) => Self::Config(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Input(_) => 2,
            Self::Config(_) => 3,
            Self::DataUnavailable { .. } => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

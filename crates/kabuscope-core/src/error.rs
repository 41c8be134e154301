use thiserror::Error;

use crate::domain::{Market, Metric};

/// Validation errors for tickers and metric values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid metric '{value}'")]
    InvalidMetric { value: String },
    #[error("invalid user mode '{value}', expected one of beginner, intermediate, advanced")]
    InvalidMode { value: String },

    #[error("metric '{metric}' must be finite")]
    NonFiniteValue { metric: Metric },
}

/// Missing or inconsistent scoring/fetching configuration.
///
/// Raised when the engine is built rather than silently defaulting at score time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no baseline for metric '{metric}' in market '{market}'")]
    MissingBaseline { metric: Metric, market: Market },
    #[error("baseline for metric '{metric}' in market '{market}' must be positive and finite, got {value}")]
    InvalidBaseline {
        metric: Metric,
        market: Market,
        value: f64,
    },
    #[error("no direction configured for metric '{metric}'")]
    MissingDirection { metric: Metric },
    #[error("mode '{mode}' is not configured")]
    UnknownMode { mode: String },
    #[error("mode '{mode}' has no metrics or a non-positive point budget")]
    EmptyMode { mode: String },
    #[error("{table} cutoffs must be strictly descending and end at or below 0")]
    InvalidCutoffs { table: &'static str },
    #[error("tier thresholds must satisfy very_good > good > normal > poor")]
    InvalidTierThresholds,
    #[error("invalid fetcher setting '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fetch-level failure surfaced to callers.
///
/// Which provider failed and why is logged, never returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("could not retrieve data for '{ticker}'")]
    DataUnavailable { ticker: String },
}

/// Errors from the combined fetch-and-score flow.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Runtime configuration.
//!
//! Everything has a default; a JSON file only needs the fields it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheWindows;
use crate::pacing::PacingPolicy;
use crate::scoring::ScoringConfig;
use crate::{ConfigError, Ticker};

pub const API_KEY_ENV_VARS: [&str; 2] = ["KABUSCOPE_FINNHUB_API_KEY", "FINNHUB_API_KEY"];

const DEFAULT_POPULAR_TICKERS: [&str; 7] =
    ["7203.T", "6758.T", "9984.T", "AAPL", "MSFT", "GOOGL", "TSLA"];

/// Fetcher tuning: cache windows, failover, pacing and concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub standard_ttl_secs: u64,
    pub priority_ttl_secs: u64,
    pub failover_cooldown_secs: u64,
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    pub popular_tickers: Vec<Ticker>,
    /// Primary HTTP statuses that switch the fetcher onto the failover provider.
    pub failover_statuses: Vec<u16>,
    pub max_concurrent_requests: usize,
    pub batch_workers: usize,
    pub request_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            standard_ttl_secs: 30 * 60,
            priority_ttl_secs: 60 * 60,
            failover_cooldown_secs: 60 * 60,
            pacing_min_ms: 1500,
            pacing_max_ms: 3000,
            popular_tickers: DEFAULT_POPULAR_TICKERS
                .into_iter()
                .filter_map(|raw| Ticker::parse(raw).ok())
                .collect(),
            failover_statuses: vec![502],
            max_concurrent_requests: 2,
            batch_workers: 4,
            request_timeout_ms: 10_000,
        }
    }
}

impl FetcherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("standard_ttl_secs", self.standard_ttl_secs),
            ("priority_ttl_secs", self.priority_ttl_secs),
            ("request_timeout_ms", self.request_timeout_ms),
            ("max_concurrent_requests", self.max_concurrent_requests as u64),
            ("batch_workers", self.batch_workers as u64),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidSetting {
                field,
                reason: String::from("must be greater than zero"),
            });
        }

        if self.pacing_min_ms > self.pacing_max_ms {
            return Err(ConfigError::InvalidSetting {
                field: "pacing_min_ms",
                reason: format!(
                    "{} exceeds pacing_max_ms {}",
                    self.pacing_min_ms, self.pacing_max_ms
                ),
            });
        }

        if let Some(status) = self
            .failover_statuses
            .iter()
            .find(|status| !(100..=599).contains(*status))
        {
            return Err(ConfigError::InvalidSetting {
                field: "failover_statuses",
                reason: format!("{status} is not an HTTP status"),
            });
        }

        Ok(())
    }

    pub fn cache_windows(&self) -> CacheWindows {
        CacheWindows {
            standard: Duration::from_secs(self.standard_ttl_secs),
            priority: Duration::from_secs(self.priority_ttl_secs),
        }
    }

    pub fn pacing(&self) -> PacingPolicy {
        PacingPolicy::new(
            Duration::from_millis(self.pacing_min_ms),
            Duration::from_millis(self.pacing_max_ms),
        )
    }

    pub fn failover_cooldown(&self) -> Duration {
        Duration::from_secs(self.failover_cooldown_secs)
    }

    pub fn is_popular(&self, ticker: &Ticker) -> bool {
        self.popular_tickers.contains(ticker)
    }
}

/// Top-level configuration for the fetcher, the scorer and provider credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub scoring: ScoringConfig,
    #[serde(skip_serializing)]
    pub finnhub_api_key: Option<String>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetcher.validate()?;
        self.scoring.validate()
    }

    /// Falls back to the environment when no key was configured.
    pub fn with_env_api_key(mut self) -> Self {
        if self.finnhub_api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
            self.finnhub_api_key = API_KEY_ENV_VARS
                .into_iter()
                .find_map(|name| std::env::var(name).ok())
                .filter(|key| !key.trim().is_empty());
        }
        self
    }
}

/// Loads configuration from `path` (defaults when `None`), then validates it.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<AppConfig>(&raw)?
        }
        None => AppConfig::default(),
    };

    let config = AppConfig {
        scoring: config.scoring.merge_defaults(),
        ..config
    }
    .with_env_api_key();

    config.validate()?;
    Ok(config)
}

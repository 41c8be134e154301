use kabuscope_core::{AppConfig, DataFetcher};
use serde_json::json;

use crate::error::CliError;

use super::CommandResult;

pub async fn run(config: &AppConfig) -> Result<CommandResult, CliError> {
    let fetcher = DataFetcher::from_config(config);
    let status = fetcher.status().await;
    let fetcher_config = &config.fetcher;

    let data = json!({
        "providers": status,
        "finnhub_api_key_configured": config.finnhub_api_key.is_some(),
        "cache": {
            "standard_ttl_secs": fetcher_config.standard_ttl_secs,
            "priority_ttl_secs": fetcher_config.priority_ttl_secs,
        },
        "failover": {
            "cooldown_secs": fetcher_config.failover_cooldown_secs,
            "statuses": fetcher_config.failover_statuses,
        },
        "pacing_ms": [fetcher_config.pacing_min_ms, fetcher_config.pacing_max_ms],
    });

    Ok(CommandResult::new(data)
        .with_row("primary", status.primary)
        .with_row("failover", status.failover)
        .with_row("active", status.active_provider)
        .with_row("finnhub_key", config.finnhub_api_key.is_some())
        .with_row("cache_entries", status.cache_entries)
        .with_row(
            "popular",
            status
                .popular_tickers
                .iter()
                .map(|ticker| ticker.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ))
}

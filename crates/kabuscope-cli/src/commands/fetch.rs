use kabuscope_core::{AppConfig, DataFetcher, Origin};
use serde_json::json;

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::{parse_ticker, CommandResult};

pub async fn run(args: &FetchArgs, config: &AppConfig) -> Result<CommandResult, CliError> {
    let ticker = parse_ticker(&args.ticker)?;
    let fetcher = DataFetcher::from_config(config);

    let fetched = fetcher.fetch_with_origin(&ticker).await?;
    let data = json!({
        "origin": fetched.origin,
        "bundle": fetched.bundle,
    });

    let source = match fetched.origin {
        Origin::Cache => String::from("cache"),
        Origin::Network(provider) => provider.to_string(),
    };
    let mut result = CommandResult::new(data)
        .with_row("ticker", &ticker)
        .with_row("source", source)
        .with_row("observed", fetched.bundle.observed());
    for (metric, value) in fetched.bundle.iter() {
        result = result.with_detail(format!("{:<16} {value:>16.4}", metric.as_str()));
    }
    Ok(result)
}

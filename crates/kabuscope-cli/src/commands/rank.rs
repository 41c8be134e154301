use kabuscope_core::{AppConfig, Analyzer, UserMode};

use crate::cli::RankArgs;
use crate::error::CliError;

use super::{parse_ticker, CommandResult};

pub async fn run(
    args: &RankArgs,
    config: &AppConfig,
    mode: UserMode,
) -> Result<CommandResult, CliError> {
    let tickers = args
        .tickers
        .iter()
        .map(|raw| parse_ticker(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let analyzer = Analyzer::from_config(config)?;

    let mut report = match args.min_score {
        Some(min_score) => analyzer.filter_by_score(&tickers, mode, min_score).await?,
        None => analyzer.analyze_many(&tickers, mode).await?,
    };
    if let Some(top) = args.top {
        report.ranked.truncate(top);
    }
    let data = serde_json::to_value(&report)?;

    let mut result = CommandResult::new(data)
        .with_row("mode", mode)
        .with_row("ranked", report.ranked.len())
        .with_row(
            "min_score",
            args.min_score
                .map_or_else(|| String::from("-"), |min| format!("{min:.1}")),
        )
        .with_row("failed", report.failures.len())
        .with_row("cache_hits", report.cache_hits)
        .with_row("network_fetches", report.network_fetches);

    for (position, analysis) in report.ranked.iter().enumerate() {
        result = result.with_detail(format!(
            "{:>2}. {:<12} {:>5.1}  {:?}  risk {:?}",
            position + 1,
            analysis.ticker.as_str(),
            analysis.score.composite,
            analysis.score.rank,
            analysis.risk.level
        ));
    }
    for failure in &report.failures {
        result = result.with_detail(format!("--  {:<12} {}", failure.ticker.as_str(), failure.reason));
    }
    Ok(result)
}

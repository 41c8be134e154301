mod analyze;
mod fetch;
mod rank;
mod score;
mod status;

use kabuscope_core::{load_config, AppConfig, MetricScore, ScoreResult, Ticker, UserMode};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Command output: the JSON document plus a human-readable rendering.
#[derive(Debug)]
pub struct CommandResult {
    pub data: Value,
    pub summary: Vec<(String, String)>,
    pub details: Vec<String>,
}

impl CommandResult {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            summary: Vec::new(),
            details: Vec::new(),
        }
    }

    pub fn with_row(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.summary.push((label.into(), value.to_string()));
        self
    }

    pub fn with_detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = resolve_config(cli)?;
    let mode = UserMode::from(cli.mode);

    match &cli.command {
        Command::Analyze(args) => analyze::run(args, &config, mode).await,
        Command::Rank(args) => rank::run(args, &config, mode).await,
        Command::Fetch(args) => fetch::run(args, &config).await,
        Command::Score(args) => score::run(args, &config, mode),
        Command::Status => status::run(&config).await,
    }
}

/// Applies command-line overrides on top of the loaded configuration.
fn resolve_config(cli: &Cli) -> Result<AppConfig, CliError> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.no_pacing {
        config.fetcher.pacing_min_ms = 0;
        config.fetcher.pacing_max_ms = 0;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.fetcher.request_timeout_ms = timeout_ms;
    }
    config.validate()?;
    debug!(
        pacing_ms = ?(config.fetcher.pacing_min_ms, config.fetcher.pacing_max_ms),
        timeout_ms = config.fetcher.request_timeout_ms,
        finnhub_key = config.finnhub_api_key.is_some(),
        "configuration resolved"
    );
    Ok(config)
}

pub(crate) fn parse_ticker(raw: &str) -> Result<Ticker, CliError> {
    Ok(Ticker::parse(raw)?)
}

/// One line per scored metric, e.g. `per            17.00  tier  8   8.0/10`.
pub(crate) fn score_lines(score: &ScoreResult) -> Vec<String> {
    score
        .per_metric
        .iter()
        .map(|(metric, detail)| {
            format!(
                "{:<16} {:>10}  tier {:>2}  {:>5.1}/{}",
                metric.as_str(),
                format_value(detail),
                detail.tier.value(),
                detail.points,
                detail.max_points
            )
        })
        .collect()
}

fn format_value(detail: &MetricScore) -> String {
    detail
        .value
        .map_or_else(|| String::from("n/a"), |value| format!("{value:.2}"))
}

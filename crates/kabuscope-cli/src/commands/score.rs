use std::io::Read;

use kabuscope_core::{AppConfig, MetricBundle, ScoringEngine, UserMode};

use crate::cli::ScoreArgs;
use crate::error::CliError;

use super::{score_lines, CommandResult};

/// Scores a bundle offline; no provider is contacted.
pub fn run(args: &ScoreArgs, config: &AppConfig, mode: UserMode) -> Result<CommandResult, CliError> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)?
    };

    let bundle: MetricBundle = serde_json::from_str(&raw)
        .map_err(|error| CliError::Input(format!("metric bundle: {error}")))?;
    let engine = ScoringEngine::new(config.scoring.clone())?;
    let score = engine.score(&bundle, mode)?;

    let mut result = CommandResult::new(serde_json::to_value(&score)?)
        .with_row("ticker", &bundle.ticker)
        .with_row("market", score.market)
        .with_row("composite", format!("{:.1}", score.composite))
        .with_row("rank", format!("{:?}", score.rank));
    for line in score_lines(&score) {
        result = result.with_detail(line);
    }
    Ok(result)
}

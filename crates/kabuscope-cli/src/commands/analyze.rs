use kabuscope_core::{AppConfig, Analyzer, UserMode};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::{parse_ticker, score_lines, CommandResult};

pub async fn run(
    args: &AnalyzeArgs,
    config: &AppConfig,
    mode: UserMode,
) -> Result<CommandResult, CliError> {
    let ticker = parse_ticker(&args.ticker)?;
    let analyzer = Analyzer::from_config(config)?;

    let analysis = analyzer.analyze(&ticker, mode).await?;
    let data = serde_json::to_value(&analysis)?;

    let name = analysis
        .bundle
        .company_name
        .clone()
        .unwrap_or_else(|| ticker.to_string());
    let mut result = CommandResult::new(data)
        .with_row("ticker", &ticker)
        .with_row("company", name)
        .with_row("market", analysis.market)
        .with_row("mode", mode)
        .with_row("composite", format!("{:.1}", analysis.score.composite))
        .with_row("rank", format!("{:?}", analysis.score.rank))
        .with_row(
            "recommendation",
            serde_json::to_value(analysis.score.recommendation)?
                .as_str()
                .unwrap_or_default(),
        )
        .with_row(
            "observed",
            format!(
                "{}/{}",
                analysis.score.observed_metrics,
                analysis.score.per_metric.len()
            ),
        )
        .with_row("risk", format!("{:?}", analysis.risk.level))
        .with_row("sector", analysis.bundle.sector.as_deref().unwrap_or("-"))
        .with_row(
            "earnings_yield",
            optional_percent(analysis.valuation.earnings_yield),
        );

    if let Some(technicals) = &analysis.technicals {
        result = result
            .with_row("volatility", format!("{:.2}%", technicals.volatility))
            .with_row("change_1m", optional_percent(technicals.change_1m))
            .with_row(
                "range_52w",
                format!("{:.2} - {:.2}", technicals.low_52w, technicals.high_52w),
            );
    }

    for line in score_lines(&analysis.score) {
        result = result.with_detail(line);
    }
    for factor in &analysis.risk.factors {
        result = result.with_detail(format!("risk factor: {factor:?}"));
    }
    Ok(result)
}

fn optional_percent(value: Option<f64>) -> String {
    value.map_or_else(|| String::from("-"), |value| format!("{value:.2}%"))
}

//! CLI argument definitions for kabuscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Fetch and score one ticker |
//! | `rank` | Fetch, score and rank several tickers |
//! | `fetch` | Fetch the raw metric bundle for a ticker |
//! | `score` | Score a metric bundle read from a JSON file |
//! | `status` | Show provider and cache configuration |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON configuration file |
//! | `--mode` | `intermediate` | Scoring mode |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | off | Log to stderr (`-v` info, `-vv` debug) |
//! | `--no-pacing` | `false` | Skip the random delay before provider calls |
//! | `--timeout-ms` | from config | Per-request HTTP timeout |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kabuscope_core::UserMode;

/// Stock fundamentals fetcher and scorer.
#[derive(Debug, Parser)]
#[command(
    name = "kabuscope",
    author,
    version,
    about = "Fetch stock fundamentals and score them against market baselines",
    long_about = "kabuscope fetches fundamentals from Yahoo Finance, falls back to Finnhub when \
Yahoo returns bad-gateway errors, caches results in memory, and scores each ticker on a \
0-100 scale for the selected user mode.\n\
\n\
Logs go to stderr; results are written to stdout."
)]
pub struct Cli {
    /// JSON configuration file; omitted fields keep their defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Scoring mode.
    #[arg(long, global = true, value_enum, default_value_t = ModeArg::Intermediate)]
    pub mode: ModeArg,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Skip the randomized pause before each provider call.
    #[arg(long, global = true, default_value_t = false)]
    pub no_pacing: bool,

    /// Per-request HTTP timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<ModeArg> for UserMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Beginner => Self::Beginner,
            ModeArg::Intermediate => Self::Intermediate,
            ModeArg::Advanced => Self::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document.
    Json,
    /// Human-readable summary.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and score one ticker.
    ///
    /// # Examples
    ///
    ///   kabuscope analyze 7203.T
    ///   kabuscope analyze AAPL --mode beginner --pretty
    Analyze(AnalyzeArgs),

    /// Fetch, score and rank several tickers, best first.
    ///
    /// # Examples
    ///
    ///   kabuscope rank 7203.T 6758.T 9984.T AAPL --top 3
    ///   kabuscope rank 7203.T 6758.T AAPL --min-score 60
    Rank(RankArgs),

    /// Fetch the metric bundle for a ticker without scoring it.
    Fetch(FetchArgs),

    /// Score a metric bundle from a JSON file ("-" reads stdin).
    Score(ScoreArgs),

    /// Show providers, failover state and cache configuration.
    Status,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Ticker symbol, e.g. 7203.T or AAPL.
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    /// Ticker symbols to rank.
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,

    /// Keep only the best N entries.
    #[arg(long)]
    pub top: Option<usize>,

    /// Drop entries whose composite score is below this value.
    #[arg(long, value_parser = parse_min_score)]
    pub min_score: Option<f64>,
}

fn parse_min_score(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(String::from("min score must be between 0 and 100"))
    }
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Ticker symbol.
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Path to a metric bundle JSON document.
    pub input: PathBuf,
}

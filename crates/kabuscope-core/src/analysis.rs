//! Fetch-and-score flow for single tickers and ranking batches.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::fetcher::{DataFetcher, Origin};
use crate::scoring::{ScoreResult, ScoringEngine, UserMode};
use crate::technical::{TechnicalIndicators, ValuationSummary};
use crate::{AnalysisError, ConfigError, Market, Metric, MetricBundle, Ticker, UtcDateTime};

const HIGH_PER: f64 = 30.0;
const HIGH_DEBT_TO_EQUITY: f64 = 70.0;
const LOW_CURRENT_RATIO: f64 = 1.0;
const HIGH_VOLATILITY: f64 = 40.0;
const MODERATE_VOLATILITY: f64 = 25.0;

/// Coarse risk level from the number of red flags raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    LowMedium,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    /// PER above 30.
    HighValuation,
    /// Debt-to-equity above 70%.
    HighLeverage,
    /// Current ratio below 1.0.
    WeakLiquidity,
    /// Annualized volatility above 40%.
    HighVolatility,
    /// Annualized volatility above 25%, up to 40%.
    ModerateVolatility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

/// Flags only metrics the provider reported; absent metrics raise nothing.
/// Without indicators there is no volatility flag.
pub fn assess_risk(
    bundle: &MetricBundle,
    technicals: Option<&TechnicalIndicators>,
) -> RiskAssessment {
    let checks: [(Metric, RiskFactor, fn(f64) -> bool); 3] = [
        (Metric::Per, RiskFactor::HighValuation, |per| per > HIGH_PER),
        (Metric::DebtToEquity, RiskFactor::HighLeverage, |ratio| {
            ratio > HIGH_DEBT_TO_EQUITY
        }),
        (Metric::CurrentRatio, RiskFactor::WeakLiquidity, |ratio| {
            ratio < LOW_CURRENT_RATIO
        }),
    ];

    let mut factors: Vec<RiskFactor> = checks
        .into_iter()
        .filter(|(metric, _, flagged)| bundle.get(*metric).is_some_and(flagged))
        .map(|(_, factor, _)| factor)
        .collect();

    match technicals.map(|indicators| indicators.volatility) {
        Some(volatility) if volatility > HIGH_VOLATILITY => factors.push(RiskFactor::HighVolatility),
        Some(volatility) if volatility > MODERATE_VOLATILITY => {
            factors.push(RiskFactor::ModerateVolatility);
        }
        _ => {}
    }

    let level = match factors.len() {
        0 => RiskLevel::Low,
        1 => RiskLevel::LowMedium,
        2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    RiskAssessment { level, factors }
}

/// Scored view of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub ticker: Ticker,
    pub market: Market,
    pub as_of: UtcDateTime,
    pub origin: Origin,
    pub bundle: MetricBundle,
    pub score: ScoreResult,
    pub risk: RiskAssessment,
    /// Absent when the provider returned too little price history.
    pub technicals: Option<TechnicalIndicators>,
    pub valuation: ValuationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub ticker: Ticker,
    pub reason: String,
}

/// Ranking over a batch: best composite first, unresolved tickers listed apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub mode: UserMode,
    pub ranked: Vec<Analysis>,
    pub failures: Vec<BatchFailure>,
    pub cache_hits: usize,
    pub network_fetches: usize,
}

impl BatchReport {
    /// Keeps ranked entries whose composite is at least `min_score`.
    pub fn filter_by_score(mut self, min_score: f64) -> Self {
        self.ranked.retain(|analysis| analysis.score.composite >= min_score);
        self
    }
}

/// Ties the fetcher to the scoring engine.
#[derive(Clone)]
pub struct Analyzer {
    fetcher: DataFetcher,
    engine: Arc<ScoringEngine>,
}

impl Analyzer {
    pub fn new(fetcher: DataFetcher, engine: ScoringEngine) -> Self {
        Self {
            fetcher,
            engine: Arc::new(engine),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let engine = ScoringEngine::new(config.scoring.clone())?;
        Ok(Self::new(DataFetcher::from_config(config), engine))
    }

    pub fn fetcher(&self) -> &DataFetcher {
        &self.fetcher
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn analyze(&self, ticker: &Ticker, mode: UserMode) -> Result<Analysis, AnalysisError> {
        // An unconfigured mode must not cost a network call.
        self.engine.config().profile(mode)?;

        let fetched = self.fetcher.fetch_with_origin(ticker).await?;
        Ok(self.build(ticker.clone(), fetched.bundle, fetched.origin, mode)?)
    }

    pub async fn analyze_many(
        &self,
        tickers: &[Ticker],
        mode: UserMode,
    ) -> Result<BatchReport, AnalysisError> {
        self.engine.config().profile(mode)?;

        let batch = self.fetcher.fetch_many(tickers).await;
        let cache_hits = batch.cache_hits();
        let network_fetches = batch.network_fetches();

        let mut ranked = Vec::new();
        let mut failures = Vec::new();
        for (ticker, result) in batch.results {
            match result {
                Ok(fetched) => ranked.push(self.build(ticker, fetched.bundle, fetched.origin, mode)?),
                Err(error) => failures.push(BatchFailure {
                    ticker,
                    reason: error.to_string(),
                }),
            }
        }

        ranked.sort_by(|left, right| {
            right
                .score
                .composite
                .partial_cmp(&left.score.composite)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.ticker.cmp(&right.ticker))
        });

        info!(
            mode = %mode,
            ranked = ranked.len(),
            failed = failures.len(),
            "batch analysis complete"
        );

        Ok(BatchReport {
            mode,
            ranked,
            failures,
            cache_hits,
            network_fetches,
        })
    }

    /// Ranks `tickers` and drops those scoring below `min_score`.
    pub async fn filter_by_score(
        &self,
        tickers: &[Ticker],
        mode: UserMode,
        min_score: f64,
    ) -> Result<BatchReport, AnalysisError> {
        let report = self.analyze_many(tickers, mode).await?;
        Ok(report.filter_by_score(min_score))
    }

    fn build(
        &self,
        ticker: Ticker,
        bundle: MetricBundle,
        origin: Origin,
        mode: UserMode,
    ) -> Result<Analysis, ConfigError> {
        let score = self.engine.score(&bundle, mode)?;
        let technicals = TechnicalIndicators::from_history(&bundle.history);
        let risk = assess_risk(&bundle, technicals.as_ref());
        let valuation = ValuationSummary::from_bundle(&bundle);
        Ok(Analysis {
            market: score.market,
            ticker,
            as_of: UtcDateTime::now(),
            origin,
            bundle,
            score,
            risk,
            technicals,
            valuation,
        })
    }
}

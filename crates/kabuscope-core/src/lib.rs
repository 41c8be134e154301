//! # Kabuscope Core
//!
//! Market-data acquisition and fundamental scoring for Japanese, US and
//! emerging-market equities.
//!
//! ## Overview
//!
//! - **Provider adapters** for Yahoo Finance (primary) and Finnhub (failover)
//! - **Cache store** with per-tier expiry for popular and ordinary tickers
//! - **Failover state** that parks the primary after bad-gateway failures
//! - **Data fetcher** combining cache, pacing, permits and failover
//! - **Scoring engine** turning a metric bundle into a 0-100 composite,
//!   a rank and a recommendation
//! - **Analyzer** running fetch and score for single tickers and batches,
//!   with technical indicators and risk flags alongside each score
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo and Finnhub provider adapters |
//! | [`analysis`] | Fetch-and-score flow, risk flags, batch ranking |
//! | [`cache`] | Tiered in-memory bundle cache |
//! | [`config`] | Fetcher and application configuration |
//! | [`domain`] | Tickers, metrics, bundles, markets |
//! | [`error`] | Core error types |
//! | [`failover`] | Primary/failover provider state |
//! | [`fetcher`] | Cache-first data fetcher |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pacing`] | Randomized delay before outbound calls |
//! | [`provider`] | Provider contract and error classification |
//! | [`provider_policy`] | Per-provider request quotas |
//! | [`scoring`] | Baselines, tiers, modes and the scoring engine |
//! | [`source`] | Provider identifiers and roles |
//! | [`technical`] | Price-history indicators and valuation summaries |
//! | [`throttling`] | Quota enforcement |
//!
//! ## Data flow
//!
//! ```text
//! ticker ──► DataFetcher ──► CacheStore ──hit──────────────────────┐
//!                 │ miss                                           │
//!                 ▼                                                ▼
//!           FailoverState ──► pacing ──► Yahoo ──502──► Finnhub ─► MetricBundle
//!                                                                  │
//!                                         ScoringEngine(mode) ◄────┘
//!                                                 │
//!                                                 ▼
//!                                  ScoreResult (composite, rank, recommendation)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kabuscope_core::{load_config, Analyzer, Ticker, UserMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config(None)?;
//!     let analyzer = Analyzer::from_config(&config)?;
//!
//!     let ticker = Ticker::parse("7203.T")?;
//!     let analysis = analyzer.analyze(&ticker, UserMode::Intermediate).await?;
//!     println!("{} scored {} ({:?})", ticker, analysis.score.composite, analysis.score.rank);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod failover;
pub mod fetcher;
pub mod http_client;
pub mod pacing;
pub mod provider;
pub mod provider_policy;
pub mod scoring;
pub mod source;
pub mod technical;
pub mod throttling;

pub use adapters::{FinnhubAdapter, YahooAdapter, YahooAuthManager};
pub use analysis::{
    assess_risk, Analysis, Analyzer, BatchFailure, BatchReport, RiskAssessment, RiskFactor,
    RiskLevel,
};
pub use cache::{CacheStore, CacheTier, CacheWindows};
pub use config::{load_config, AppConfig, FetcherConfig};
pub use domain::{
    DailyBar, Direction, Market, Metric, MetricBundle, PriceHistory, Ticker, UtcDateTime,
};
pub use error::{AnalysisError, ConfigError, FetchError, ValidationError};
pub use failover::{FailoverState, ProviderStateSnapshot, Route};
pub use fetcher::{BatchFetch, DataFetcher, Fetched, FetcherStatus, Origin};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use pacing::PacingPolicy;
pub use provider::{MarketDataProvider, ProviderError, ProviderErrorKind, ProviderFuture};
pub use provider_policy::ProviderPolicy;
pub use scoring::{
    Cutoff, MetricScore, ModeProfile, Rank, Recommendation, ScoreResult, ScoringConfig,
    ScoringEngine, Tier, TierThresholds, UserMode,
};
pub use source::{ProviderId, ProviderRole};
pub use technical::{MarketCapCategory, TechnicalIndicators, ValuationSummary};
pub use throttling::QuotaGate;

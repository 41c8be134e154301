//! Cache-first fetching with primary/failover provider selection.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::adapters::{FinnhubAdapter, YahooAdapter};
use crate::cache::{CacheStore, CacheTier};
use crate::config::{AppConfig, FetcherConfig};
use crate::failover::{FailoverState, Route};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::pacing::PacingPolicy;
use crate::provider::MarketDataProvider;
use crate::{FetchError, MetricBundle, ProviderId, ProviderRole, Ticker};

/// Where a fetched bundle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "provider")]
pub enum Origin {
    Cache,
    Network(ProviderId),
}

/// A bundle plus its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub bundle: MetricBundle,
    pub origin: Origin,
}

/// Outcome of [`DataFetcher::fetch_many`], in input order with duplicates removed.
#[derive(Debug, Clone)]
pub struct BatchFetch {
    pub results: Vec<(Ticker, Result<Fetched, FetchError>)>,
}

impl BatchFetch {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, result)| result.is_ok()).count()
    }

    pub fn cache_hits(&self) -> usize {
        self.count_origin(|origin| origin == Origin::Cache)
    }

    pub fn network_fetches(&self) -> usize {
        self.count_origin(|origin| matches!(origin, Origin::Network(_)))
    }

    fn count_origin(&self, predicate: impl Fn(Origin) -> bool) -> usize {
        self.results
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .filter(|fetched| predicate(fetched.origin))
            .count()
    }
}

/// Provider and cache status for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetcherStatus {
    pub primary: ProviderId,
    pub failover: ProviderId,
    pub active: ProviderRole,
    pub active_provider: ProviderId,
    pub failover_elapsed_secs: Option<u64>,
    pub primary_available: bool,
    pub cache_entries: usize,
    pub popular_tickers: Vec<Ticker>,
}

struct FetcherInner {
    primary: Arc<dyn MarketDataProvider>,
    failover: Arc<dyn MarketDataProvider>,
    cache: CacheStore,
    state: Arc<FailoverState>,
    pacing: PacingPolicy,
    outbound: Semaphore,
    popular: Vec<Ticker>,
    failover_statuses: Vec<u16>,
    batch_workers: usize,
}

/// Fetches metric bundles through the cache, the primary provider and the
/// failover provider.
///
/// Cheap to clone; clones share the cache, the failover state and the
/// outbound permit pool.
#[derive(Clone)]
pub struct DataFetcher {
    inner: Arc<FetcherInner>,
}

impl DataFetcher {
    pub fn new(
        primary: Arc<dyn MarketDataProvider>,
        failover: Arc<dyn MarketDataProvider>,
        config: &FetcherConfig,
    ) -> Self {
        Self::with_state(
            primary,
            failover,
            config,
            Arc::new(FailoverState::new(config.failover_cooldown())),
        )
    }

    /// Builds a fetcher around an existing failover state.
    pub fn with_state(
        primary: Arc<dyn MarketDataProvider>,
        failover: Arc<dyn MarketDataProvider>,
        config: &FetcherConfig,
        state: Arc<FailoverState>,
    ) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                primary,
                failover,
                cache: CacheStore::new(config.cache_windows()),
                state,
                pacing: config.pacing(),
                outbound: Semaphore::new(config.max_concurrent_requests.max(1)),
                popular: config.popular_tickers.clone(),
                failover_statuses: config.failover_statuses.clone(),
                batch_workers: config.batch_workers.max(1),
            }),
        }
    }

    /// Yahoo as primary and Finnhub as failover over a shared reqwest client.
    pub fn from_config(config: &AppConfig) -> Self {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let timeout_ms = config.fetcher.request_timeout_ms;

        let primary = YahooAdapter::new(Arc::clone(&http_client)).with_timeout_ms(timeout_ms);
        let failover = FinnhubAdapter::new(http_client, config.finnhub_api_key.clone())
            .with_timeout_ms(timeout_ms);
        if !failover.has_api_key() {
            warn!("no finnhub api key configured; failover provider will be unavailable");
        }

        Self::new(Arc::new(primary), Arc::new(failover), &config.fetcher)
    }

    pub fn state(&self) -> &Arc<FailoverState> {
        &self.inner.state
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    pub async fn fetch(&self, ticker: &Ticker) -> Result<MetricBundle, FetchError> {
        self.fetch_with_origin(ticker)
            .await
            .map(|fetched| fetched.bundle)
    }

    pub async fn fetch_with_origin(&self, ticker: &Ticker) -> Result<Fetched, FetchError> {
        let inner = &self.inner;

        if let Some(bundle) = inner.cache.get(ticker).await {
            debug!(ticker = %ticker, "cache hit");
            return Ok(Fetched {
                bundle,
                origin: Origin::Cache,
            });
        }

        let _permit = inner
            .outbound
            .acquire()
            .await
            .map_err(|_| unavailable(ticker))?;

        // Another task may have filled the entry while this one waited.
        if let Some(bundle) = inner.cache.get(ticker).await {
            debug!(ticker = %ticker, "cache hit after waiting for an outbound permit");
            return Ok(Fetched {
                bundle,
                origin: Origin::Cache,
            });
        }

        let (bundle, provider) = self
            .fetch_from_providers(ticker)
            .await
            .ok_or_else(|| unavailable(ticker))?;

        let tier = self.tier_for(ticker);
        inner.cache.put(ticker.clone(), bundle.clone(), tier).await;
        info!(ticker = %ticker, provider = %provider, observed = bundle.observed(), "fetched from network");

        Ok(Fetched {
            bundle,
            origin: Origin::Network(provider),
        })
    }

    async fn fetch_from_providers(&self, ticker: &Ticker) -> Option<(MetricBundle, ProviderId)> {
        let inner = &self.inner;
        let route = inner.state.select();

        match route {
            Route::Primary | Route::Probe => {
                if route == Route::Probe {
                    info!(ticker = %ticker, provider = %inner.primary.id(), "probing primary provider after cooldown");
                }
                inner.pacing.pause().await;

                match inner.primary.fetch_fundamentals(ticker).await {
                    Ok(bundle) => {
                        if route == Route::Probe {
                            info!(provider = %inner.primary.id(), "primary provider recovered");
                        }
                        inner.state.record_primary_success(route);
                        return Some((bundle, inner.primary.id()));
                    }
                    Err(error) => {
                        let triggers = error.triggers_failover(&inner.failover_statuses);
                        inner.state.record_primary_failure(route, triggers);
                        if triggers {
                            warn!(
                                ticker = %ticker,
                                provider = %inner.primary.id(),
                                error = %error,
                                "primary provider failed; switching to failover"
                            );
                        } else {
                            warn!(
                                ticker = %ticker,
                                provider = %inner.primary.id(),
                                error = %error,
                                "primary provider failed; trying failover for this request"
                            );
                        }
                    }
                }
            }
            Route::Failover => {
                debug!(ticker = %ticker, provider = %inner.failover.id(), "primary in cooldown; using failover");
                inner.pacing.pause().await;
            }
        }

        match inner.failover.fetch_fundamentals(ticker).await {
            Ok(bundle) => Some((bundle, inner.failover.id())),
            Err(error) => {
                error!(
                    ticker = %ticker,
                    provider = %inner.failover.id(),
                    error = %error,
                    "no provider could serve the request"
                );
                None
            }
        }
    }

    /// Fetches several tickers on a bounded worker pool.
    pub async fn fetch_many(&self, tickers: &[Ticker]) -> BatchFetch {
        let mut seen = HashSet::new();
        let unique: Vec<Ticker> = tickers
            .iter()
            .filter(|ticker| seen.insert((*ticker).clone()))
            .cloned()
            .collect();

        let workers = Arc::new(Semaphore::new(self.inner.batch_workers));
        let mut set = JoinSet::new();
        for (index, ticker) in unique.iter().cloned().enumerate() {
            let fetcher = self.clone();
            let workers = Arc::clone(&workers);
            set.spawn(async move {
                let result = match workers.acquire_owned().await {
                    Ok(_permit) => fetcher.fetch_with_origin(&ticker).await,
                    Err(_) => Err(unavailable(&ticker)),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Fetched, FetchError>>> = vec![None; unique.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(join_error) => error!(error = %join_error, "fetch task aborted"),
            }
        }

        let results = unique
            .into_iter()
            .zip(slots)
            .map(|(ticker, slot)| {
                let result = slot.unwrap_or_else(|| Err(unavailable(&ticker)));
                (ticker, result)
            })
            .collect();
        let batch = BatchFetch { results };

        info!(
            requested = batch.results.len(),
            succeeded = batch.succeeded(),
            cache_hits = batch.cache_hits(),
            network_fetches = batch.network_fetches(),
            "batch fetch complete"
        );
        batch
    }

    pub async fn status(&self) -> FetcherStatus {
        let inner = &self.inner;
        let snapshot = inner.state.snapshot();
        let active_provider = match snapshot.active {
            ProviderRole::Primary => inner.primary.id(),
            ProviderRole::Failover => inner.failover.id(),
        };

        FetcherStatus {
            primary: inner.primary.id(),
            failover: inner.failover.id(),
            active: snapshot.active,
            active_provider,
            failover_elapsed_secs: snapshot.failover_elapsed.map(|elapsed| elapsed.as_secs()),
            primary_available: snapshot.primary_available,
            cache_entries: inner.cache.len().await,
            popular_tickers: inner.popular.clone(),
        }
    }

    pub async fn clear_cache(&self) {
        self.inner.cache.clear().await;
        info!("cache cleared");
    }

    fn tier_for(&self, ticker: &Ticker) -> CacheTier {
        if self.inner.popular.contains(ticker) {
            CacheTier::Priority
        } else {
            CacheTier::Standard
        }
    }
}

fn unavailable(ticker: &Ticker) -> FetchError {
    FetchError::DataUnavailable {
        ticker: ticker.to_string(),
    }
}

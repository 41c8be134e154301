//! In-memory cache of fetched metric bundles.
//!
//! Entries expire per tier: popular tickers are kept longer than the rest.
//! Expired entries are never served. Reads leave them in place; every
//! [`CacheStore::put`] reclaims them, so the map stays bounded by the number
//! of tickers fetched within one priority window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::{MetricBundle, Ticker};

/// Expiry class of a cached bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Standard,
    Priority,
}

/// Expiry windows per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheWindows {
    pub standard: Duration,
    pub priority: Duration,
}

impl CacheWindows {
    pub const fn ttl(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Standard => self.standard,
            CacheTier::Priority => self.priority,
        }
    }
}

impl Default for CacheWindows {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(30 * 60),
            priority: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bundle: MetricBundle,
    fetched_at: Instant,
    tier: CacheTier,
}

impl CacheEntry {
    fn is_fresh(&self, windows: &CacheWindows, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < windows.ttl(self.tier)
    }
}

/// Thread-safe ticker-keyed bundle cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<HashMap<Ticker, CacheEntry>>>,
    windows: CacheWindows,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheWindows::default())
    }
}

impl CacheStore {
    pub fn new(windows: CacheWindows) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            windows,
        }
    }

    pub const fn windows(&self) -> CacheWindows {
        self.windows
    }

    /// Returns the cached bundle while it is inside its tier's window.
    pub async fn get(&self, ticker: &Ticker) -> Option<MetricBundle> {
        let now = Instant::now();
        let store = self.inner.read().await;
        store
            .get(ticker)
            .filter(|entry| entry.is_fresh(&self.windows, now))
            .map(|entry| entry.bundle.clone())
    }

    /// Stores a bundle, replacing any previous entry and its tier.
    ///
    /// Expired entries are dropped under the same write lock.
    pub async fn put(&self, ticker: Ticker, bundle: MetricBundle, tier: CacheTier) {
        let now = Instant::now();
        let entry = CacheEntry {
            bundle,
            fetched_at: now,
            tier,
        };
        let mut store = self.inner.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.is_fresh(&self.windows, now));
        let reclaimed = before - store.len();
        if reclaimed > 0 {
            debug!(reclaimed, "dropped expired cache entries");
        }
        store.insert(ticker, entry);
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.inner.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.is_fresh(&self.windows, now));
        before - store.len()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    fn bundle(raw: &str, per: f64) -> (Ticker, MetricBundle) {
        let ticker = Ticker::parse(raw).expect("valid ticker");
        let bundle = MetricBundle::new(ticker.clone())
            .with(Metric::Per, per)
            .expect("finite value");
        (ticker, bundle)
    }

    #[tokio::test(start_paused = true)]
    async fn standard_entry_expires_after_thirty_minutes() {
        let cache = CacheStore::default();
        let (ticker, stored) = bundle("AAPL", 28.0);
        cache.put(ticker.clone(), stored.clone(), CacheTier::Standard).await;

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        assert_eq!(cache.get(&ticker).await, Some(stored));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get(&ticker).await, None);
        assert_eq!(cache.len().await, 1, "get must not delete expired entries");
    }

    #[tokio::test(start_paused = true)]
    async fn priority_entry_outlives_standard_window() {
        let cache = CacheStore::default();
        let (ticker, stored) = bundle("7203.T", 10.0);
        cache.put(ticker.clone(), stored.clone(), CacheTier::Priority).await;

        tokio::time::advance(Duration::from_secs(45 * 60)).await;
        assert_eq!(cache.get(&ticker).await, Some(stored));

        tokio::time::advance(Duration::from_secs(15 * 60)).await;
        assert_eq!(cache.get(&ticker).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_tier_and_resets_age() {
        let cache = CacheStore::default();
        let (ticker, first) = bundle("MSFT", 30.0);
        cache.put(ticker.clone(), first, CacheTier::Priority).await;

        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        let (_, second) = bundle("MSFT", 31.0);
        cache.put(ticker.clone(), second.clone(), CacheTier::Standard).await;

        tokio::time::advance(Duration::from_secs(25 * 60)).await;
        assert_eq!(cache.get(&ticker).await, Some(second));

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(cache.get(&ticker).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_reclaims_only_expired_entries() {
        let cache = CacheStore::default();
        let (old, old_bundle) = bundle("IBM", 20.0);
        let (popular, popular_bundle) = bundle("7203.T", 10.0);
        cache.put(old.clone(), old_bundle, CacheTier::Standard).await;
        cache.put(popular.clone(), popular_bundle, CacheTier::Priority).await;

        tokio::time::advance(Duration::from_secs(31 * 60)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&popular).await.is_some());

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn put_reclaims_expired_entries_of_other_tickers() {
        let cache = CacheStore::default();
        for (raw, tier) in [
            ("IBM", CacheTier::Standard),
            ("ORCL", CacheTier::Standard),
            ("7203.T", CacheTier::Priority),
        ] {
            let (ticker, stored) = bundle(raw, 20.0);
            cache.put(ticker, stored, tier).await;
        }
        assert_eq!(cache.len().await, 3);

        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        let (fresh, fresh_bundle) = bundle("AAPL", 25.0);
        cache.put(fresh.clone(), fresh_bundle, CacheTier::Standard).await;

        assert_eq!(cache.len().await, 2, "only the priority entry and the new one remain");
        assert!(cache.get(&fresh).await.is_some());
        assert_eq!(cache.purge_expired().await, 0);
    }
}

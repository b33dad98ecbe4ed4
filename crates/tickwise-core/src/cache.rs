//! In-memory, time-bounded cache placed in front of quote providers.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::{ProviderId, Symbol};

/// How a single lookup interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a live entry when present, otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch, then overwrite the entry.
    Refresh,
    /// Neither read nor write.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Entries are scoped to one provider and one exact symbol spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub symbol: Symbol,
}

impl CacheKey {
    pub fn new(provider: ProviderId, symbol: &Symbol) -> Self {
        Self {
            provider,
            symbol: symbol.clone(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.symbol)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<CacheKey, CacheEntry<V>>,
    default_ttl: Duration,
}

/// Shared TTL cache. Clones share the same storage; concurrent writers for one
/// key race and the last write wins.
#[derive(Debug, Clone)]
pub struct CacheStore<V> {
    inner: Arc<RwLock<CacheInner<V>>>,
}

impl<V: Clone + Send + Sync> CacheStore<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                map: HashMap::new(),
                default_ttl,
            })),
        }
    }

    /// Five-minute TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    /// A store that never keeps anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let store = self.inner.read().await;
        store
            .map
            .get(key)
            .filter(|entry| Instant::now() <= entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`; `ttl_override` replaces the default TTL for this entry.
    /// Expired entries are swept on every write so the map stays bounded by live keys.
    pub async fn put(&self, key: CacheKey, value: V, ttl_override: Option<Duration>) {
        let mut store = self.inner.write().await;
        if store.default_ttl == Duration::ZERO {
            return;
        }

        let now = Instant::now();
        store.map.retain(|_, entry| entry.expires_at > now);

        let ttl = ttl_override.unwrap_or(store.default_ttl);
        store.map.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    pub async fn clear_expired(&self) {
        let now = Instant::now();
        self.inner
            .write()
            .await
            .map
            .retain(|_, entry| entry.expires_at > now);
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Entry count, including expired entries not yet swept by a write.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.default_ttl == Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(provider: ProviderId, symbol: &str) -> CacheKey {
        CacheKey::new(provider, &Symbol::parse(symbol).expect("valid"))
    }

    #[tokio::test]
    async fn entries_are_scoped_by_provider_and_symbol() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache.put(key(ProviderId::YahooChart, "SBIN.NS"), 1_u32, None).await;

        assert_eq!(cache.get(&key(ProviderId::YahooChart, "SBIN.NS")).await, Some(1));
        assert_eq!(cache.get(&key(ProviderId::YahooQuote, "SBIN.NS")).await, None);
        assert_eq!(cache.get(&key(ProviderId::YahooChart, "SBIN.BO")).await, None);
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache.put(key(ProviderId::YahooChart, "TCS.NS"), 1_u32, None).await;
        cache.put(key(ProviderId::YahooChart, "TCS.NS"), 2_u32, None).await;

        assert_eq!(cache.get(&key(ProviderId::YahooChart, "TCS.NS")).await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn ttl_override_expires_entry() {
        let cache = CacheStore::new(Duration::from_secs(60));
        cache
            .put(
                key(ProviderId::YahooQuote, "INFY.NS"),
                1_u32,
                Some(Duration::from_millis(50)),
            )
            .await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&key(ProviderId::YahooQuote, "INFY.NS")).await.is_none());

        cache.clear_expired().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let cache = CacheStore::new(Duration::from_secs(60));
        for symbol in ["TCS.NS", "INFY.NS", "WIPRO.NS"] {
            cache
                .put(
                    key(ProviderId::YahooChart, symbol),
                    1_u32,
                    Some(Duration::from_millis(50)),
                )
                .await;
        }
        assert_eq!(cache.len().await, 3);

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.put(key(ProviderId::YahooChart, "SBIN.NS"), 2, None).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&key(ProviderId::YahooChart, "SBIN.NS")).await, Some(2));
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let cache = CacheStore::<u32>::disabled();
        assert!(cache.is_disabled().await);

        cache.put(key(ProviderId::Alphavantage, "IBM"), 1, None).await;
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn key_renders_provider_and_symbol() {
        assert_eq!(
            key(ProviderId::YahooChart, "sbin.ns").to_string(),
            "yahoo_chart:SBIN.NS"
        );
    }

    #[test]
    fn refresh_mode_writes_without_reading() {
        assert!(!CacheMode::Refresh.reads());
        assert!(CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.writes());
        assert_eq!(CacheMode::default(), CacheMode::Use);
    }
}

//! Response cache with a time-to-live per entry.
//!
//! Entries remember when they were captured and how long they stay valid.
//! Expiry is checked lazily on read: a stale entry is evicted and reported as
//! absent. `moka` holds the entries and drops them physically once their TTL
//! has passed.

use std::time::Duration;

use moka::Expiry;
use moka::future::Cache;
use tokio::time::Instant;

/// How long entries stay valid unless inserted with an explicit TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on cached responses.
const MAX_ENTRIES: u64 = 1000;

/// A cached value with its capture time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub captured_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Fresh while `now - captured_at <= ttl`.
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.captured_at) <= self.ttl
    }
}

/// Lets `moka` expire each entry after its own TTL.
struct EntryExpiry;

impl<V> Expiry<String, CacheEntry<V>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// String-keyed cache with per-entry TTL and substring invalidation.
#[derive(Clone)]
pub struct TtlCache<V> {
    entries: Cache<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create an empty cache with the five minute default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    /// Create an empty cache whose plain inserts live for `ttl`.
    #[must_use]
    pub fn with_default_ttl(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(EntryExpiry)
            .build();
        Self {
            entries,
            default_ttl: ttl,
        }
    }

    /// The cached value, or `None` if absent or expired. Expired entries are
    /// removed.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key).await?;
        if entry.is_fresh(Instant::now()) {
            Some(entry.data)
        } else {
            self.entries.invalidate(key).await;
            None
        }
    }

    /// Store `data` under `key` with the default TTL.
    pub async fn insert(&self, key: impl Into<String>, data: V) {
        self.insert_with_ttl(key, data, self.default_ttl).await;
    }

    /// Store `data` under `key`, valid for `ttl`.
    pub async fn insert_with_ttl(&self, key: impl Into<String>, data: V, ttl: Duration) {
        let entry = CacheEntry {
            data,
            captured_at: Instant::now(),
            ttl,
        };
        self.entries.insert(key.into(), entry).await;
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Drop every entry whose key contains `pattern`.
    pub async fn invalidate(&self, pattern: &str) {
        let keys: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.entries.invalidate(key.as_str()).await;
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_returns_fresh_entry() {
        let cache = TtlCache::new();
        cache.insert("fabric:a", 1).await;
        assert_eq!(cache.get("fabric:a").await, Some(1));
        assert_eq!(cache.get("fabric:b").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new();
        cache
            .insert_with_ttl("fabric:a", 1, Duration::from_secs(10))
            .await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get("fabric:a").await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("fabric:a").await, None);
        assert!(cache.entries.get("fabric:a").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_five_minutes() {
        let cache = TtlCache::new();
        cache.insert("fabric-categories", "x").await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("fabric-categories").await, Some("x"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("fabric-categories").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_matches_substring() {
        let cache = TtlCache::new();
        cache.insert("fabrics:{}", 1).await;
        cache.insert("fabrics:{\"active\":true}", 2).await;
        cache.insert("fabric:a", 3).await;
        cache.insert("fabric-categories", 4).await;

        cache.invalidate("fabrics:").await;

        assert_eq!(cache.get("fabrics:{}").await, None);
        assert_eq!(cache.get("fabrics:{\"active\":true}").await, None);
        assert_eq!(cache.get("fabric:a").await, Some(3));
        assert_eq!(cache.get("fabric-categories").await, Some(4));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = TtlCache::new();
        cache.insert("fabric:a", 1).await;
        cache.insert("fabric-categories", 2).await;
        cache.clear().await;
        assert_eq!(cache.get("fabric:a").await, None);
        assert_eq!(cache.get("fabric-categories").await, None);
    }
}

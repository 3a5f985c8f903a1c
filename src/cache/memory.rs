//! In-memory cache implementation using moka
//!
//! Values are stored as JSON strings so any serializable type can be cached.
//! Each entry carries its own TTL, capped by the cache-wide default.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries (1 hour)
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
struct CacheEntry {
    /// JSON-serialized value
    data: Arc<String>,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T, ttl: Duration) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
            ttl,
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// Expire each entry after the TTL it was inserted with
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings (10,000 entries, 1 hour)
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and default TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(default_ttl)
            .expire_after(EntryExpiry)
            .support_invalidation_closures()
            .build();

        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Remove a value and return it, if present and unexpired
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.remove(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    /// Glob-style match: `*` matches any sequence, `?` any single character.
    pub(crate) fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let key: Vec<char> = key.chars().collect();
        Self::glob_match(&pattern, &key)
    }

    fn glob_match(pattern: &[char], key: &[char]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some(('*', rest)) => {
                Self::glob_match(rest, key) || (!key.is_empty() && Self::glob_match(pattern, &key[1..]))
            }
            Some(('?', rest)) => !key.is_empty() && Self::glob_match(rest, &key[1..]),
            Some((c, rest)) => key.first() == Some(c) && Self::glob_match(rest, &key[1..]),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl.min(self.default_ttl))?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| Self::pattern_matches(pattern, key.as_ref()))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys_to_delete {
            self.cache.invalidate(&key).await;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("key1", &"value1".to_string(), Duration::from_secs(60)).await.unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let cache = MemoryCache::new();
        let result: Option<String> = cache.get("missing").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_take_removes_entry() {
        let cache = MemoryCache::new();
        cache.set("code", &"123456".to_string(), Duration::from_secs(60)).await.unwrap();

        let first: Option<String> = cache.take("code").await.unwrap();
        let second: Option<String> = cache.take("code").await.unwrap();
        assert_eq!(first.as_deref(), Some("123456"));
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn test_per_entry_ttl() {
        let cache = MemoryCache::with_capacity_and_ttl(100, Duration::from_secs(60));
        cache.set("short", &1u8, Duration::from_millis(20)).await.unwrap();
        cache.set("long", &2u8, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.cache.run_pending_tasks().await;

        assert_eq!(cache.get::<u8>("short").await.unwrap(), None);
        assert_eq!(cache.get::<u8>("long").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_delete_pattern_star() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("faq:1", &"a", ttl).await.unwrap();
        cache.set("programs:1", &"b", ttl).await.unwrap();
        cache.set("faq:2", &"c", ttl).await.unwrap();

        cache.delete_pattern("*:1").await.unwrap();

        assert_eq!(cache.get::<String>("faq:1").await.unwrap(), None);
        assert_eq!(cache.get::<String>("programs:1").await.unwrap(), None);
        assert_eq!(cache.get::<String>("faq:2").await.unwrap(), Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.set("a", &1u8, Duration::from_secs(60)).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.get::<u8>("a").await.unwrap(), None);
    }

    #[test]
    fn test_pattern_matches() {
        assert!(MemoryCache::pattern_matches("university:*", "university:north"));
        assert!(MemoryCache::pattern_matches("faq:?", "faq:1"));
        assert!(!MemoryCache::pattern_matches("faq:?", "faq:12"));
        assert!(MemoryCache::pattern_matches("*", ""));
        assert!(!MemoryCache::pattern_matches("faq", "faqs"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(50))]

            #[test]
            fn literal_pattern_matches_only_itself(key in "[a-z:0-9]{1,20}", other in "[a-z:0-9]{1,20}") {
                prop_assert!(MemoryCache::pattern_matches(&key, &key));
                prop_assert_eq!(MemoryCache::pattern_matches(&key, &other), key == other);
            }

            #[test]
            fn prefix_star_matches_any_suffix(prefix in "[a-z]{1,8}", suffix in "[a-z0-9]{0,8}") {
                let pattern = format!("{}:*", prefix);
                let key = format!("{}:{}", prefix, suffix);
                prop_assert!(MemoryCache::pattern_matches(&pattern, &key));
            }

            #[test]
            fn cached_value_reads_back(key in "[a-z]{1,10}", value in "[a-zA-Z0-9 ]{0,50}") {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let cache = MemoryCache::new();
                    cache.set(&key, &value, Duration::from_secs(60)).await.unwrap();
                    let result: Option<String> = cache.get(&key).await.unwrap();
                    prop_assert_eq!(result, Some(value.clone()));
                    Ok(())
                })?;
            }
        }
    }
}

//! Cache layer
//!
//! In-process response cache for hot reads (university profile, public FAQ,
//! program lists). Writes invalidate affected keys by glob pattern.
//!
//! ```rust,ignore
//! use unicms::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("university:north", &university, Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic methods make this trait unusable as `dyn CacheLayer`; services
/// hold `Arc<MemoryCache>` directly.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// Cache key helpers, shared by services that read and invalidate the same entries
pub mod keys {
    pub fn university(slug: &str) -> String {
        format!("university:{}", slug)
    }

    pub fn public_faq(college_id: i64) -> String {
        format!("faq:{}", college_id)
    }

    pub fn programs(college_id: i64) -> String {
        format!("programs:{}", college_id)
    }

    /// Everything cached for one college
    pub fn college_pattern(college_id: i64) -> String {
        format!("*:{}", college_id)
    }
}

/// Create the response cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}

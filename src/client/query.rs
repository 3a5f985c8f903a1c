//! Client query cache
//!
//! Reads are cached per [`QueryKey`]. Mutations never patch cached data;
//! they invalidate the affected keys instead. Invalidating a key drops its
//! entry and, when someone is subscribed to it, refetches it exactly once.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::{ClientError, CmsApi};

/// Cache key of one backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    University,
    Faq(i64),
    FaqSubmissions(i64),
    FaqSubmissionCount(i64),
    Programs(i64),
}

impl QueryKey {
    async fn fetch(&self, api: &dyn CmsApi) -> Result<Value, ClientError> {
        let value = match *self {
            Self::University => serde_json::to_value(api.get_university().await?),
            Self::Faq(id) => serde_json::to_value(api.get_faq(id).await?),
            Self::FaqSubmissions(id) => serde_json::to_value(api.list_submissions(id).await?),
            Self::FaqSubmissionCount(id) => serde_json::to_value(api.count_submissions(id).await?),
            Self::Programs(id) => serde_json::to_value(api.list_programs(id).await?),
        };
        value.map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::University => write!(f, "[\"university\"]"),
            Self::Faq(id) => write!(f, "[\"faq\", {}]", id),
            Self::FaqSubmissions(id) => write!(f, "[\"faq-submissions\", {}]", id),
            Self::FaqSubmissionCount(id) => write!(f, "[\"faq-submission-count\", {}]", id),
            Self::Programs(id) => write!(f, "[\"programs\", {}]", id),
        }
    }
}

type Subscribers = Arc<Mutex<HashMap<QueryKey, usize>>>;

#[derive(Clone)]
pub struct QueryCache {
    api: Arc<dyn CmsApi>,
    data: Arc<RwLock<HashMap<QueryKey, Value>>>,
    subscribers: Subscribers,
}

/// Active interest in a key; released on drop
#[derive(Debug)]
pub struct Subscription {
    key: QueryKey,
    subscribers: Subscribers,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = subscribers.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                subscribers.remove(&self.key);
            }
        }
    }
}

/// Background refetch loop; stops when dropped
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
    _subscription: Subscription,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl QueryCache {
    pub fn new(api: Arc<dyn CmsApi>) -> Self {
        Self {
            api,
            data: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Read through the cache
    pub async fn query<T: DeserializeOwned>(&self, key: QueryKey) -> Result<T, ClientError> {
        let cached = self.data.read().await.get(&key).cloned();
        let value = match cached {
            Some(value) => value,
            None => self.refresh(key).await?,
        };
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Cached value without fetching
    pub async fn peek<T: DeserializeOwned>(&self, key: QueryKey) -> Option<T> {
        let value = self.data.read().await.get(&key).cloned()?;
        serde_json::from_value(value).ok()
    }

    pub fn subscribe(&self, key: QueryKey) -> Subscription {
        *self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert(0) += 1;
        Subscription {
            key,
            subscribers: self.subscribers.clone(),
        }
    }

    pub fn subscriber_count(&self, key: QueryKey) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    /// Drop the cached entry; refetch once if the key is subscribed.
    ///
    /// Never fails: a failed refetch leaves the entry empty for the next read.
    pub async fn invalidate(&self, key: QueryKey) {
        self.data.write().await.remove(&key);
        if self.subscriber_count(key) == 0 {
            return;
        }
        if let Err(e) = self.refresh(key).await {
            tracing::warn!("Refetch of {} failed: {}", key, e);
        }
    }

    /// Refetch `key` every `interval` while the handle lives
    pub fn poll(&self, key: QueryKey, interval: Duration) -> PollHandle {
        let subscription = self.subscribe(key);
        let cache = self.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if let Err(e) = cache.refresh(key).await {
                    tracing::debug!("Polling {} failed: {}", key, e);
                }
            }
        });
        PollHandle {
            task,
            _subscription: subscription,
        }
    }

    async fn refresh(&self, key: QueryKey) -> Result<Value, ClientError> {
        let value = key.fetch(self.api.as_ref()).await?;
        self.data.write().await.insert(key, value.clone());
        Ok(value)
    }
}

//! TTL result cache for deduplicating generation requests.
//!
//! The cache is consulted twice per request lifecycle: at intake, where a
//! hit short-circuits the whole pipeline, and at job completion, where the
//! final result set is stored under the request's cache key.
//!
//! Backend unavailability is never fatal: a failed `get` degrades to a
//! forced miss and a failed `set` is logged and dropped by the caller.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CacheError;
use crate::question::Question;

/// The value cached per request key: the finalized result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    /// Request that originally produced the result.
    pub request_id: Uuid,
    /// The validated questions.
    pub questions: Vec<Question>,
}

/// TTL key/value store for generation results.
///
/// Atomic get/set semantics are required per key; no cross-key
/// transactions.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Looks up a cached result. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<CachedResult>, CacheError>;

    /// Stores a result under `key` for `ttl`.
    async fn set(&self, key: &str, value: &CachedResult, ttl: Duration) -> Result<(), CacheError>;
}

/// In-process cache with per-entry expiry.
///
/// Entries are lazily evicted on access; `set` also sweeps expired
/// entries to bound memory between reads.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Instant, CachedResult)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|(expires, _)| *expires > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResult>, CacheError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &CachedResult, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        entries.retain(|_, (expires, _)| *expires > now);
        entries.insert(key.to_string(), (now + ttl, value.clone()));
        Ok(())
    }
}

/// Redis-backed cache for deployments sharing results across processes.
pub struct RedisCache {
    redis: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis.
    ///
    /// Connection failure here is reported, but callers typically fall
    /// back to [`MemoryCache`] rather than aborting startup.
    pub async fn connect(redis_url: &str, key_prefix: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self {
            redis,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResult>, CacheError> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn
            .get(self.full_key(key))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        match data {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &CachedResult, ttl: Duration) -> Result<(), CacheError> {
        let serialized = serde_json::to_string(value)?;
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(self.full_key(key), serialized, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(request_id: Uuid) -> CachedResult {
        CachedResult {
            request_id,
            questions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        let id = Uuid::new_v4();

        assert!(cache.get("k").await.unwrap().is_none());
        cache
            .set("k", &cached(id), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get("k").await.unwrap().expect("entry should exist");
        assert_eq!(hit.request_id, id);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k", &cached(Uuid::new_v4()), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_overwrite() {
        let cache = MemoryCache::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        cache
            .set("k", &cached(first), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", &cached(second), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get("k").await.unwrap().expect("entry should exist");
        assert_eq!(hit.request_id, second);
    }
}

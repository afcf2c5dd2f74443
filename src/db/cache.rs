// db/cache.rs
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::service::error::ServiceError;

/// Cache TTL defaults (in seconds)
pub const SEARCH_CACHE_TTL: usize = 600; // 10 minutes
pub const TREND_CACHE_TTL: usize = 1800; // 30 minutes
pub const QUICK_STATS_CACHE_TTL: usize = 3600; // 1 hour

const KEY_PREFIX: &str = "stay";

/// Cache namespaces, one per payload kind.
pub mod namespace {
    pub const SEARCH: &str = "search";
    pub const CHART: &str = "chart";
    pub const TREND: &str = "trend";
    pub const COMPARISON: &str = "compare";
    pub const QUICK_STATS: &str = "quick_stats";
}

/// Key derived from the validated criteria, never from raw query strings:
/// `stay:<namespace>:<sha256 of canonical json>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<T: Serialize>(namespace: &str, criteria: &T) -> Result<Self, ServiceError> {
        // Going through `Value` sorts object keys, so field order never leaks into the key.
        let canonical = serde_json::to_string(&serde_json::to_value(criteria)?)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(CacheKey(format!("{}:{}:{:x}", KEY_PREFIX, namespace, digest)))
    }

    pub fn prefix(namespace: &str) -> String {
        format!("{}:{}", KEY_PREFIX, namespace)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
pub trait QueryCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;

    async fn set(&self, key: &str, value: String, ttl_seconds: usize) -> Result<(), ServiceError>;

    /// Remove every key starting with `prefix`; returns how many went.
    async fn invalidate(&self, prefix: &str) -> Result<u64, ServiceError>;

    async fn ping(&self) -> Result<(), ServiceError>;

    fn backend(&self) -> &'static str;
}

pub struct CacheHelper;

impl CacheHelper {
    /// Read-through lookup. Any cache failure is logged and treated as a
    /// miss; only `compute` errors reach the caller.
    pub async fn get_or_compute<T, F, Fut>(
        cache: &dyn QueryCache,
        key: &CacheKey,
        ttl_seconds: usize,
        compute: F,
    ) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        match cache.get(key.as_str()).await {
            Ok(Some(data)) => match serde_json::from_str::<T>(&data) {
                Ok(value) => {
                    tracing::debug!("Cache HIT: {}", key.as_str());
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!("Cache deserialization failed for {}: {}", key.as_str(), e)
                }
            },
            Ok(None) => tracing::debug!("Cache MISS: {}", key.as_str()),
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key.as_str(), e),
        }

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(json) => {
                if let Err(e) = cache.set(key.as_str(), json, ttl_seconds).await {
                    tracing::warn!("Cache write failed for {}: {}", key.as_str(), e);
                }
            }
            Err(e) => tracing::warn!("Cache serialization failed for {}: {}", key.as_str(), e),
        }

        Ok(value)
    }
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis connection established successfully");
        Ok(RedisCache { conn })
    }
}

#[async_trait]
impl QueryCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: usize) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        tracing::debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        Ok(())
    }

    // SCAN instead of KEYS so a large keyspace never blocks redis
    async fn invalidate(&self, prefix: &str) -> Result<u64, ServiceError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut deleted_count: u64 = 0;

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                deleted_count += keys.len() as u64;
                let _: () = conn.del(&keys).await?;
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!("Cache DELETE pattern: {} ({} keys deleted)", pattern, deleted_count);
        Ok(deleted_count)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Process-local cache used when redis is not configured or unreachable.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: usize) -> Result<(), ServiceError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds as u64);
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expiry)| *expiry > Instant::now());
        entries.insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn invalidate(&self, prefix: &str) -> Result<u64, ServiceError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

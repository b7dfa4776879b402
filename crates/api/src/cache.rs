//! TTL response cache for public catalog reads.
//!
//! Two backends behind one [`Cache`] handle: an in-process map (default) and
//! Redis when `REDIS_URL` is configured, so several API instances share
//! invalidations. Keys are plain strings; values are JSON.
//!
//! Cache failures never fail a request: [`Cache::get_json`] treats errors as
//! misses and [`Cache::set_json`] logs and moves on.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

/// Prefix for catalog listing and studio detail keys.
pub const STUDIOS_PREFIX: &str = "studios:";

/// Keys scanned per Redis `SCAN` round trip during prefix invalidation.
const SCAN_BATCH: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

struct Entry {
    value: String,
    expires_at: Instant,
}

enum Backend {
    Memory(RwLock<HashMap<String, Entry>>),
    Redis(ConnectionManager),
}

pub struct Cache {
    backend: Backend,
    ttl: Duration,
}

impl Cache {
    pub fn memory(ttl: Duration) -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Connect to Redis at `url`.
    pub async fn redis(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            backend: Backend::Redis(manager),
            ttl,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match &self.backend {
            Backend::Memory(map) => {
                let map = map.read().await;
                Ok(map
                    .get(key)
                    .filter(|e| Instant::now() < e.expires_at)
                    .map(|e| e.value.clone()))
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                Ok(conn.get::<_, Option<String>>(key).await?)
            }
        }
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        match &self.backend {
            Backend::Memory(map) => {
                map.write().await.insert(
                    key.to_string(),
                    Entry {
                        value,
                        expires_at: Instant::now() + self.ttl,
                    },
                );
                Ok(())
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                // SETEX rejects 0.
                let secs = self.ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, secs).await?;
                Ok(())
            }
        }
    }

    /// Drop every key starting with `prefix`; returns how many were removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        match &self.backend {
            Backend::Memory(map) => {
                let mut map = map.write().await;
                let before = map.len();
                map.retain(|k, _| !k.starts_with(prefix));
                Ok(before - map.len())
            }
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                let pattern = format!("{prefix}*");
                let mut cursor: u64 = 0;
                let mut removed = 0;
                loop {
                    let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await?;
                    if !keys.is_empty() {
                        removed += keys.len();
                        conn.del::<_, ()>(keys).await?;
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }
                Ok(removed)
            }
        }
    }

    /// Evict expired in-memory entries. Redis expires keys on its own.
    pub async fn purge_expired(&self) -> usize {
        match &self.backend {
            Backend::Memory(map) => {
                let now = Instant::now();
                let mut map = map.write().await;
                let before = map.len();
                map.retain(|_, e| now < e.expires_at);
                before - map.len()
            }
            Backend::Redis(_) => 0,
        }
    }

    /// Cached value decoded as `T`; any failure is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, key, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache read failed");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let result = match serde_json::to_string(value) {
            Ok(raw) => self.set(key, raw).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, key, "Cache write failed");
        }
    }

    /// Invalidate all studio-derived entries after a catalog-visible write.
    pub async fn invalidate_studios(&self) {
        match self.invalidate_prefix(STUDIOS_PREFIX).await {
            Ok(removed) => tracing::debug!(removed, "Studio cache invalidated"),
            Err(e) => tracing::warn!(error = %e, "Studio cache invalidation failed"),
        }
    }
}

/// Key for a studio detail response.
pub fn studio_key(studio_id: studiora_core::types::DbId) -> String {
    format!("{STUDIOS_PREFIX}detail:{studio_id}")
}

/// Key for a catalog page.
pub fn catalog_key(filter_key: &str) -> String {
    format!("{STUDIOS_PREFIX}catalog:{filter_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_round_trip() {
        let cache = Cache::memory(Duration::from_secs(60));
        cache.set_json("studios:detail:1", &vec![1, 2, 3]).await;

        let hit: Option<Vec<i32>> = cache.get_json("studios:detail:1").await;
        assert_eq!(hit, Some(vec![1, 2, 3]));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_ttl_entries_are_never_served() {
        let cache = Cache::memory(Duration::ZERO);
        cache.set("k", "v".into()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn prefix_invalidation_keeps_other_keys() {
        let cache = Cache::memory(Duration::from_secs(60));
        cache.set(&studio_key(1), "a".into()).await.unwrap();
        cache.set(&catalog_key("city=kazan"), "b".into()).await.unwrap();
        cache.set("plans", "c".into()).await.unwrap();

        assert_eq!(cache.invalidate_prefix(STUDIOS_PREFIX).await.unwrap(), 2);
        assert_eq!(cache.get("plans").await.unwrap().as_deref(), Some("c"));
        assert_eq!(cache.get(&studio_key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let cache = Cache::memory(Duration::from_secs(60));
        cache.set("k", "not json".into()).await.unwrap();
        let value: Option<Vec<i32>> = cache.get_json("k").await;
        assert!(value.is_none());
    }
}

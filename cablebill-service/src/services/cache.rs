use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

const REDIS_PREFIX: &str = "cablebill:cache";

/// Short-lived cache of serialized read responses. Entries may be stale
/// until their TTL runs out; every write calls [`ReadCache::invalidate_all`].
#[async_trait]
pub trait ReadCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error>;
    async fn invalidate_all(&self) -> Result<(), anyhow::Error>;
}

/// Serve `key` from the cache, otherwise run `load` and remember its result.
/// Cache faults are logged and fall through to `load`.
pub async fn cached<T, E, F>(
    cache: &dyn ReadCache,
    key: &str,
    ttl: Duration,
    load: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T, E>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                return Ok(value);
            }
            Err(e) => tracing::warn!(key, error = %e, "Discarding undecodable cache entry"),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(key, error = %e, "Cache read failed"),
    }

    let value = load.await?;
    match serde_json::to_string(&value) {
        Ok(raw) => {
            if let Err(e) = cache.set(key, &raw, ttl).await {
                tracing::warn!(key, error = %e, "Cache write failed");
            }
        }
        Err(e) => tracing::warn!(key, error = %e, "Failed to serialize cache entry"),
    }
    Ok(value)
}

/// Drop every cached read after a write.
pub async fn invalidate(cache: &dyn ReadCache) {
    if let Err(e) = cache.invalidate_all().await {
        tracing::warn!(error = %e, "Cache invalidation failed");
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (Instant, String)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let hit = self.entries.get(key).map(|entry| {
            let (expires_at, value) = entry.value();
            (*expires_at, value.clone())
        });

        match hit {
            Some((expires_at, value)) if Instant::now() < expires_at => Ok(Some(value)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error> {
        self.entries
            .insert(key.to_string(), (Instant::now() + ttl, value.to_string()));
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), anyhow::Error> {
        self.entries.clear();
        Ok(())
    }
}

/// Redis-backed cache. Keys carry a generation number; invalidation bumps
/// the generation and old entries age out on their own TTL.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(url: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis cache");
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;
        tracing::info!("Successfully connected to Redis cache");
        Ok(Self { manager })
    }

    fn generation_key() -> String {
        format!("{}:generation", REDIS_PREFIX)
    }

    async fn generation(&self) -> Result<u64, anyhow::Error> {
        let mut conn = self.manager.clone();
        let generation: Option<u64> = redis::cmd("GET")
            .arg(Self::generation_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read cache generation: {}", e))?;
        Ok(generation.unwrap_or(0))
    }

    async fn scoped_key(&self, key: &str) -> Result<String, anyhow::Error> {
        Ok(format!("{}:{}:{}", REDIS_PREFIX, self.generation().await?, key))
    }
}

#[async_trait]
impl ReadCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let scoped = self.scoped_key(key).await?;
        let mut conn = self.manager.clone();
        redis::cmd("GET")
            .arg(&scoped)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get cache: {}", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), anyhow::Error> {
        let scoped = self.scoped_key(key).await?;
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(&scoped)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to set cache: {}", e))
    }

    async fn invalidate_all(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let _: u64 = redis::cmd("INCR")
            .arg(Self::generation_key())
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bump cache generation: {}", e))?;
        Ok(())
    }
}

/// Used when caching is turned off.
pub struct NoopCache;

#[async_trait]
impl ReadCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, anyhow::Error> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tether_core::{CacheError, CacheResult, Link, LinkCache, ShortCode};
use tracing::{debug, trace, warn};

/// A Redis-based implementation of [`LinkCache`].
///
/// Links are stored as JSON strings under a configurable key prefix and
/// expire through Redis itself (`SET ... PX`).
#[derive(Debug, Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    pub const DEFAULT_PREFIX: &'static str = "tether:link:";

    /// Creates a cache over an existing multiplexed connection.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, Self::DEFAULT_PREFIX)
    }

    /// Creates a cache with a custom key prefix (e.g. "myapp:link:").
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get_link(&self, code: &ShortCode) -> CacheResult<Option<Link>> {
        let key = self.cache_key(code);
        trace!(code = %code, "fetching link from redis");

        let mut conn = self.conn.clone();
        let cached: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| map_redis_error("failed to fetch value from Redis", e))?;

        match cached {
            Some(json) => {
                debug!(code = %code, "cache hit in redis");
                serde_json::from_str::<Link>(&json).map(Some).map_err(|e| {
                    warn!(code = %code, error = %e, "failed to deserialize cached link");
                    CacheError::InvalidData(format!("invalid cached value for key '{key}': {e}"))
                })
            }
            None => {
                trace!(code = %code, "cache miss in redis");
                Ok(None)
            }
        }
    }

    async fn set_link(&self, code: &ShortCode, link: &Link, ttl: Duration) -> CacheResult<()> {
        let key = self.cache_key(code);
        let json = serde_json::to_string(link)
            .map_err(|e| CacheError::Serialization(format!("failed to serialize link: {e}")))?;
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(&key, json, ttl_ms)
            .await
            .map_err(|e| map_redis_error("failed to write value to Redis", e))?;
        trace!(code = %code, ttl_ms, "cached link in redis");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> CacheResult<()> {
        let key = self.cache_key(code);

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| map_redis_error("failed to delete value from Redis", e))?;
        trace!(code = %code, "removed link from redis");
        Ok(())
    }
}

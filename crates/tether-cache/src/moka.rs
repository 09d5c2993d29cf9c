use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tether_core::{CacheResult, Link, LinkCache, ShortCode};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct Entry {
    link: Link,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<ShortCode, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &ShortCode,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &ShortCode,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-process cache implementation using Moka.
///
/// Bounded by entry count; every entry carries its own TTL. It's ideal for
/// single-node deployments or as the L1 in front of Redis.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<ShortCode, Entry>,
}

impl MokaLinkCache {
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Creates a cache holding at most [`Self::DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a cache holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Number of entries, including ones not yet evicted.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get_link(&self, code: &ShortCode) -> CacheResult<Option<Link>> {
        match self.cache.get(code).await {
            Some(entry) => {
                debug!(code = %code, "cache hit in moka");
                Ok(Some(entry.link))
            }
            None => {
                trace!(code = %code, "cache miss in moka");
                Ok(None)
            }
        }
    }

    async fn set_link(&self, code: &ShortCode, link: &Link, ttl: Duration) -> CacheResult<()> {
        self.cache
            .insert(
                code.clone(),
                Entry {
                    link: link.clone(),
                    ttl,
                },
            )
            .await;
        trace!(code = %code, ttl_ms = ttl.as_millis() as u64, "cached link in moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> CacheResult<()> {
        self.cache.invalidate(code).await;
        trace!(code = %code, "removed link from moka");
        Ok(())
    }
}

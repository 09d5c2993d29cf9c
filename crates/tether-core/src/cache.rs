use crate::error::CacheResult;
use crate::link::Link;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

/// A cache for resolved links.
///
/// This trait provides a domain-specific caching abstraction for [`Link`]s,
/// using [`ShortCode`] as the key. Implementations can use Redis, in-memory
/// caches, or other storage backends.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Get a link from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_link(&self, code: &ShortCode) -> CacheResult<Option<Link>>;

    /// Store a link in cache for at most `ttl`.
    async fn set_link(&self, code: &ShortCode, link: &Link, ttl: Duration) -> CacheResult<()>;

    /// Remove a link from cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> CacheResult<()>;
}

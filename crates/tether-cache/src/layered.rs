use async_trait::async_trait;
use std::time::Duration;
use tether_core::{CacheResult, Link, LinkCache, ShortCode};
use tracing::{debug, trace};

/// A two-level cache composing a fast local L1 with a shared L2.
///
/// - **Get**: L1 first; on a miss try L2 and backfill L1 with the hit.
/// - **Set**: write-through, L2 then L1.
/// - **Delete**: remove from L1, then L2.
///
/// ```rust
/// use tether_cache::{LayeredCache, MokaLinkCache};
///
/// let l1 = MokaLinkCache::with_capacity(10_000);
/// // let l2 = RedisLinkCache::connect("redis://127.0.0.1:6379").await?;
/// let l2 = MokaLinkCache::with_capacity(100_000);
/// let cache = LayeredCache::new(l1, l2);
/// ```
#[derive(Debug, Clone)]
pub struct LayeredCache<L1, L2> {
    l1: L1,
    l2: L2,
    backfill_ttl: Duration,
}

impl<L1, L2> LayeredCache<L1, L2> {
    pub const DEFAULT_BACKFILL_TTL: Duration = Duration::from_secs(30);

    pub fn new(l1: L1, l2: L2) -> Self {
        Self {
            l1,
            l2,
            backfill_ttl: Self::DEFAULT_BACKFILL_TTL,
        }
    }

    /// Sets how long a value copied from L2 lives in L1.
    pub fn with_backfill_ttl(mut self, ttl: Duration) -> Self {
        self.backfill_ttl = ttl;
        self
    }

    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    pub fn l2(&self) -> &L2 {
        &self.l2
    }

    pub fn into_inner(self) -> (L1, L2) {
        (self.l1, self.l2)
    }
}

#[async_trait]
impl<L1, L2> LinkCache for LayeredCache<L1, L2>
where
    L1: LinkCache,
    L2: LinkCache,
{
    async fn get_link(&self, code: &ShortCode) -> CacheResult<Option<Link>> {
        if let Some(link) = self.l1.get_link(code).await? {
            debug!(code = %code, "L1 cache hit");
            return Ok(Some(link));
        }
        trace!(code = %code, "L1 cache miss, trying L2");

        match self.l2.get_link(code).await? {
            Some(link) => {
                debug!(code = %code, "L2 cache hit, backfilling L1");
                self.l1.set_link(code, &link, self.backfill_ttl).await?;
                Ok(Some(link))
            }
            None => {
                trace!(code = %code, "L2 cache miss");
                Ok(None)
            }
        }
    }

    async fn set_link(&self, code: &ShortCode, link: &Link, ttl: Duration) -> CacheResult<()> {
        self.l2.set_link(code, link, ttl).await?;
        self.l1
            .set_link(code, link, ttl.min(self.backfill_ttl))
            .await
    }

    async fn del(&self, code: &ShortCode) -> CacheResult<()> {
        self.l1.del(code).await?;
        self.l2.del(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MokaLinkCache;
    use jiff::Timestamp;
    use tether_core::CacheError;

    const TTL: Duration = Duration::from_secs(60);

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn test_link(url: &str) -> Link {
        Link {
            code: code("abc123"),
            target_url: url.to_string(),
            owner: None,
            created_at: Timestamp::now(),
            expires_at: None,
        }
    }

    fn create_test_cache() -> LayeredCache<MokaLinkCache, MokaLinkCache> {
        LayeredCache::new(
            MokaLinkCache::with_capacity(100),
            MokaLinkCache::with_capacity(100),
        )
    }

    /// L2 that is always down.
    struct Broken;

    #[async_trait]
    impl LinkCache for Broken {
        async fn get_link(&self, _code: &ShortCode) -> CacheResult<Option<Link>> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn set_link(&self, _: &ShortCode, _: &Link, _: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn del(&self, _code: &ShortCode) -> CacheResult<()> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn get_from_l1() {
        let cache = create_test_cache();
        let c = code("abc123");
        let link = test_link("https://example.com");

        cache.l1.set_link(&c, &link, TTL).await.unwrap();

        assert_eq!(cache.get_link(&c).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn get_backfills_l1_from_l2() {
        let cache = create_test_cache();
        let c = code("abc123");
        let link = test_link("https://example.com");

        cache.l2.set_link(&c, &link, TTL).await.unwrap();
        assert!(cache.l1.get_link(&c).await.unwrap().is_none());

        assert_eq!(cache.get_link(&c).await.unwrap(), Some(link.clone()));
        assert_eq!(cache.l1.get_link(&c).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn set_writes_to_both() {
        let cache = create_test_cache();
        let c = code("abc123");
        let link = test_link("https://example.com");

        cache.set_link(&c, &link, TTL).await.unwrap();

        assert_eq!(cache.l1.get_link(&c).await.unwrap(), Some(link.clone()));
        assert_eq!(cache.l2.get_link(&c).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn del_removes_from_both() {
        let cache = create_test_cache();
        let c = code("abc123");
        let link = test_link("https://example.com");

        cache.l1.set_link(&c, &link, TTL).await.unwrap();
        cache.l2.set_link(&c, &link, TTL).await.unwrap();

        cache.del(&c).await.unwrap();

        assert!(cache.l1.get_link(&c).await.unwrap().is_none());
        assert!(cache.l2.get_link(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn miss_when_both_empty() {
        let cache = create_test_cache();
        assert!(cache.get_link(&code("abc123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn l2_failure_surfaces_on_l1_miss() {
        let cache = LayeredCache::new(MokaLinkCache::with_capacity(10), Broken);
        let c = code("abc123");

        assert!(matches!(
            cache.get_link(&c).await.unwrap_err(),
            CacheError::Unavailable(_)
        ));

        cache
            .l1()
            .set_link(&c, &test_link("https://example.com"), TTL)
            .await
            .unwrap();
        assert!(cache.get_link(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn del_clears_l1_even_if_l2_fails() {
        let cache = LayeredCache::new(MokaLinkCache::with_capacity(10), Broken);
        let c = code("abc123");
        cache
            .l1()
            .set_link(&c, &test_link("https://example.com"), TTL)
            .await
            .unwrap();

        assert!(cache.del(&c).await.is_err());
        assert!(cache.l1().get_link(&c).await.unwrap().is_none());
    }
}

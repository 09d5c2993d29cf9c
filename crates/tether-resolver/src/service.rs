use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use tether_core::{Link, LinkCache, LinkError, ReadLinkStore, Result, ShortCode};
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

use crate::resolver::Resolver;

/// Settings for the resolution cache.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverConfig {
    /// Upper bound on how long a link stays cached.
    #[builder(default = Duration::from_secs(60))]
    pub cache_ttl: Duration,
    /// Maximum number of remembered invalidations.
    #[builder(default = 100_000)]
    pub tombstone_capacity: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

type Flight = Arc<OnceCell<Result<Link>>>;

/// Longest a tombstone is kept, whatever the cache TTL.
const MAX_TOMBSTONE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Resolves short codes against a link store, optionally through a cache.
///
/// Cache behaviour:
/// - entries live at most `cache_ttl` and never past the link's own expiry;
/// - misses are not cached;
/// - concurrent misses for one code share a single store read;
/// - [`Resolver::invalidate`] leaves a tombstone for the code. A cached value
///   is ignored while a tombstone exists, and a load that overlaps an
///   invalidation discards what it read and goes back to the store;
/// - cache errors are logged and the store is read directly.
pub struct ResolutionService<S: ?Sized> {
    store: Arc<S>,
    cache: Option<Arc<dyn LinkCache>>,
    cache_ttl: Duration,
    inflight: DashMap<ShortCode, Flight>,
    tombstones: moka::future::Cache<ShortCode, u64>,
    fence: AtomicU64,
}

impl<S: ReadLinkStore + ?Sized> ResolutionService<S> {
    /// Creates a resolver that always reads the store.
    pub fn new(store: Arc<S>) -> Self {
        Self::build(store, None, ResolverConfig::default())
    }

    /// Creates a resolver that reads through `cache`.
    pub fn with_cache(store: Arc<S>, cache: Arc<dyn LinkCache>, config: ResolverConfig) -> Self {
        Self::build(store, Some(cache), config)
    }

    fn build(store: Arc<S>, cache: Option<Arc<dyn LinkCache>>, config: ResolverConfig) -> Self {
        // A tombstone must outlive any entry written before it.
        let cache_ttl = config.cache_ttl.min(MAX_TOMBSTONE_TTL / 2);
        let tombstones = moka::future::Cache::builder()
            .max_capacity(config.tombstone_capacity)
            .time_to_live(cache_ttl * 2)
            .build();

        Self {
            store,
            cache,
            cache_ttl,
            inflight: DashMap::new(),
            tombstones,
            fence: AtomicU64::new(0),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// How long `link` may be cached at `now`, or `None` if it must not be.
    fn ttl_for(&self, link: &Link, now: Timestamp) -> Option<Duration> {
        match link.expires_at {
            None => Some(self.cache_ttl),
            Some(expires_at) => {
                let remaining = Duration::try_from(now.duration_until(expires_at)).ok()?;
                (!remaining.is_zero()).then(|| remaining.min(self.cache_ttl))
            }
        }
    }

    async fn evict(&self, cache: &dyn LinkCache, code: &ShortCode) {
        if let Err(e) = cache.del(code).await {
            warn!(code = %code, error = %e, "failed to evict cached link");
        }
    }

    /// Loads `code` from the store, coalescing concurrent callers.
    async fn load(&self, cache: &dyn LinkCache, code: &ShortCode) -> Result<Link> {
        let flight = Arc::clone(
            &self
                .inflight
                .entry(code.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let result = flight
            .get_or_init(|| self.fetch_and_populate(cache, code))
            .await
            .clone();

        self.inflight
            .remove_if(code, |_, current| Arc::ptr_eq(current, &flight));
        result
    }

    async fn fetch_and_populate(&self, cache: &dyn LinkCache, code: &ShortCode) -> Result<Link> {
        trace!(code = %code, "loading link from store");
        let fence = self.tombstones.get(code).await;
        let link = self.store.get(code).await?;

        let Some(ttl) = self.ttl_for(&link, Timestamp::now()) else {
            return Ok(link);
        };
        if let Err(e) = cache.set_link(code, &link, ttl).await {
            warn!(code = %code, error = %e, "failed to cache link");
            return Ok(link);
        }

        if self.tombstones.get(code).await != fence {
            debug!(code = %code, "link invalidated while loading, rereading store");
            self.evict(cache, code).await;
            return self.store.get(code).await;
        }

        Ok(link)
    }
}

#[async_trait]
impl<S: ReadLinkStore + ?Sized> Resolver for ResolutionService<S> {
    async fn resolve_link(&self, code: &ShortCode) -> Result<Link> {
        trace!(code = %code, "resolving short code");

        let Some(cache) = self.cache.as_deref() else {
            return self.store.get(code).await;
        };

        match cache.get_link(code).await {
            Ok(Some(link)) => {
                if link.is_expired_at(Timestamp::now()) {
                    debug!(code = %code, "cached link has expired");
                    self.evict(cache, code).await;
                    return Err(LinkError::NotFound(code.to_string()));
                }
                if self.tombstones.contains_key(code) {
                    debug!(code = %code, "cached link predates invalidation");
                    self.evict(cache, code).await;
                    return self.store.get(code).await;
                }
                debug!(code = %code, "resolved from cache");
                Ok(link)
            }
            Ok(None) => {
                debug!(code = %code, "cache miss");
                self.load(cache, code).await
            }
            Err(e) => {
                warn!(code = %code, error = %e, "cache read failed, reading store");
                self.store.get(code).await
            }
        }
    }

    async fn invalidate(&self, code: &ShortCode) {
        let Some(cache) = self.cache.as_deref() else {
            return;
        };

        let fence = self.fence.fetch_add(1, Ordering::SeqCst) + 1;
        self.tombstones.insert(code.clone(), fence).await;
        self.inflight.remove(code);
        self.evict(cache, code).await;
        trace!(code = %code, "invalidated cached link");
    }
}

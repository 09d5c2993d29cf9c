use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tether_core::{
    Link, LinkError, LinkStore, NewLink, OwnerId, Principal, ReadLinkStore, Result, ShortCode,
};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

/// Timeout and retry settings for [`ResilientStore`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct RetryConfig {
    /// Upper bound for a single store call.
    #[builder(default = Duration::from_secs(2))]
    pub timeout: Duration,
    /// Total attempts for idempotent reads, the first one included.
    #[builder(default = 3)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(50))]
    pub base_delay: Duration,
    #[builder(default = Duration::from_secs(1))]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryConfig {
    /// Exponential backoff before retry number `retry` (1-based), plus up
    /// to 25% jitter.
    fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let exp = base.saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)));
        let capped = exp.min(max);
        let jitter = rand::random_range(0..=capped / 4);
        Duration::from_millis(capped.saturating_add(jitter))
    }
}

/// Store decorator that bounds every call with a timeout and retries
/// idempotent reads on `StorageUnavailable`.
///
/// Writes are attempted exactly once.
#[derive(Debug, Clone)]
pub struct ResilientStore<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> ResilientStore<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, Fut>(&self, op: &'static str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match timeout(self.config.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LinkError::StorageUnavailable(format!(
                "{op} timed out after {:?}",
                self.config.timeout
            ))),
        }
    }

    async fn read<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match self.bounded(op, call()).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(op, attempt, "store read succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.config.max_attempts => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        op,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "store read failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<S: ReadLinkStore> ReadLinkStore for ResilientStore<S> {
    async fn get(&self, code: &ShortCode) -> Result<Link> {
        self.read("get", || self.inner.get(code)).await
    }

    async fn find(&self, code: &ShortCode) -> Result<Option<Link>> {
        self.read("find", || self.inner.find(code)).await
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        self.read("exists", || self.inner.exists(code)).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Link>> {
        self.read("list_by_owner", || self.inner.list_by_owner(owner))
            .await
    }
}

#[async_trait]
impl<S: LinkStore> LinkStore for ResilientStore<S> {
    async fn create(&self, link: NewLink) -> Result<Link> {
        self.bounded("create", self.inner.create(link)).await
    }

    async fn delete(&self, code: &ShortCode, requester: &Principal) -> Result<()> {
        self.bounded("delete", self.inner.delete(code, requester))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Store that fails the first `failures` calls of every kind.
    #[derive(Default)]
    struct Flaky {
        failures: u32,
        hang: bool,
        reads: AtomicU32,
        writes: AtomicU32,
    }

    impl Flaky {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }

        fn outcome(&self, counter: &AtomicU32) -> Result<()> {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LinkError::StorageUnavailable("connection reset".to_string()))
            } else {
                Ok(())
            }
        }

        async fn maybe_hang(&self) {
            if self.hang {
                sleep(Duration::from_secs(60)).await;
            }
        }
    }

    fn sample(code: &ShortCode) -> Link {
        Link {
            code: code.clone(),
            target_url: "https://example.com".to_string(),
            owner: None,
            created_at: jiff::Timestamp::now(),
            expires_at: None,
        }
    }

    #[async_trait]
    impl ReadLinkStore for Flaky {
        async fn get(&self, code: &ShortCode) -> Result<Link> {
            self.maybe_hang().await;
            self.outcome(&self.reads)?;
            Ok(sample(code))
        }

        async fn find(&self, code: &ShortCode) -> Result<Option<Link>> {
            self.outcome(&self.reads)?;
            Ok(Some(sample(code)))
        }

        async fn exists(&self, _code: &ShortCode) -> Result<bool> {
            self.outcome(&self.reads)?;
            Ok(true)
        }

        async fn list_by_owner(&self, _owner: &OwnerId) -> Result<Vec<Link>> {
            self.outcome(&self.reads)?;
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl LinkStore for Flaky {
        async fn create(&self, link: NewLink) -> Result<Link> {
            self.outcome(&self.writes)?;
            Ok(link.into_link(jiff::Timestamp::now()))
        }

        async fn delete(&self, _code: &ShortCode, _requester: &Principal) -> Result<()> {
            self.outcome(&self.writes)
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::builder()
            .timeout(Duration::from_millis(100))
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build()
    }

    fn code() -> ShortCode {
        ShortCode::new_unchecked("abc123")
    }

    #[tokio::test]
    async fn reads_are_retried_until_success() {
        let store = ResilientStore::new(Flaky::failing(2), fast_config());

        let link = store.get(&code()).await.unwrap();

        assert_eq!(link.code, code());
        assert_eq!(store.inner().reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reads_give_up_after_max_attempts() {
        let store = ResilientStore::new(Flaky::failing(10), fast_config());

        let err = store.exists(&code()).await.unwrap_err();

        assert!(matches!(err, LinkError::StorageUnavailable(_)));
        assert_eq!(store.inner().reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn writes_are_attempted_once() {
        let store = ResilientStore::new(Flaky::failing(1), fast_config());
        let new_link = NewLink {
            code: code(),
            target_url: "https://example.com".to_string(),
            owner: None,
            expires_at: None,
        };

        let err = store.create(new_link).await.unwrap_err();
        assert!(matches!(err, LinkError::StorageUnavailable(_)));
        assert_eq!(store.inner().writes.load(Ordering::SeqCst), 1);

        let store = ResilientStore::new(Flaky::failing(1), fast_config());
        let err = store
            .delete(&code(), &Principal::user("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::StorageUnavailable(_)));
        assert_eq!(store.inner().writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out_as_unavailable() {
        let flaky = Flaky {
            hang: true,
            ..Flaky::default()
        };
        let config = RetryConfig::builder()
            .timeout(Duration::from_millis(10))
            .max_attempts(1)
            .build();
        let store = ResilientStore::new(flaky, config);

        let err = store.get(&code()).await.unwrap_err();
        assert!(matches!(err, LinkError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn wraps_shared_store() {
        let store: Arc<dyn LinkStore> = Arc::new(ResilientStore::new(
            crate::InMemoryLinkStore::new(),
            RetryConfig::default(),
        ));
        let created = store
            .create(NewLink {
                code: code(),
                target_url: "https://example.com".to_string(),
                owner: None,
                expires_at: None,
            })
            .await
            .unwrap();

        assert_eq!(store.get(&code()).await.unwrap(), created);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let config = RetryConfig::builder()
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(300))
            .build();

        let first = config.backoff(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        let third = config.backoff(3);
        assert!(third >= Duration::from_millis(300) && third <= Duration::from_millis(375));
    }
}

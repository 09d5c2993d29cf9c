use async_trait::async_trait;
use tether_core::{Link, Result, ShortCode};

#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    /// Resolves a short code to its full link record.
    ///
    /// Fails with `NotFound` if the code does not exist or has expired.
    async fn resolve_link(&self, code: &ShortCode) -> Result<Link>;

    /// Resolves a short code to its target URL.
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        Ok(self.resolve_link(code).await?.target_url)
    }

    /// Drops any cached state for `code`.
    ///
    /// Once this returns, no lookup may serve a value read before the call.
    async fn invalidate(&self, code: &ShortCode);
}

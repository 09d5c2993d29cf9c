use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tether_core::{Link, Principal, Result, ShortCode};

/// Parameters for creating a link. The code is always generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLink {
    pub target_url: String,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl CreateLink {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// The link lifecycle as seen by callers.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a link with a freshly allocated code, owned by `principal`
    /// unless it is anonymous.
    async fn create(&self, principal: &Principal, request: CreateLink) -> Result<Link>;

    /// Deletes a link owned by `principal`.
    async fn delete(&self, principal: &Principal, code: &ShortCode) -> Result<()>;

    /// Lists the live links owned by `principal`, oldest first.
    async fn list(&self, principal: &Principal) -> Result<Vec<Link>>;

    /// Resolves a code to its full link record.
    async fn resolve_link(&self, code: &ShortCode) -> Result<Link>;

    /// Resolves a code to its target URL.
    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        Ok(self.resolve_link(code).await?.target_url)
    }
}

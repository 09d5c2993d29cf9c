use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use tether_core::{
    validate_expiry, validate_target_url, Link, LinkError, LinkStore, Principal, Result, ShortCode,
};
use tether_generator::Generator;
use tether_resolver::Resolver;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

use crate::guard::OwnershipGuard;
use crate::shortener::{CreateLink, Shortener};

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct LinkServiceConfig {
    /// Candidate codes drawn per create before giving up.
    #[builder(default = 10)]
    pub max_attempts: u32,
}

impl Default for LinkServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The link lifecycle: code allocation, guarded mutations and resolution.
///
/// `resolver` must read from the same `store`; deletes invalidate it before
/// returning.
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    guard: OwnershipGuard<dyn LinkStore>,
    generator: Arc<dyn Generator>,
    resolver: Arc<dyn Resolver>,
    max_attempts: u32,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn LinkStore>,
        generator: Arc<dyn Generator>,
        resolver: Arc<dyn Resolver>,
        config: LinkServiceConfig,
    ) -> Self {
        Self {
            guard: OwnershipGuard::new(Arc::clone(&store)),
            store,
            generator,
            resolver,
            max_attempts: config.max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[async_trait]
impl Shortener for LinkService {
    async fn create(&self, principal: &Principal, request: CreateLink) -> Result<Link> {
        validate_target_url(&request.target_url)?;
        validate_expiry(request.expires_at, Timestamp::now())?;

        for attempt in 1..=self.max_attempts {
            let code = self.generator.generate();

            if self.store.exists(&code).await? {
                debug!(code = %code, attempt, "candidate code taken");
                continue;
            }

            match self
                .guard
                .create(
                    principal,
                    code.clone(),
                    request.target_url.clone(),
                    request.expires_at,
                )
                .await
            {
                Ok(link) => {
                    info!(code = %link.code, owner = %principal, attempt, "link created");
                    return Ok(link);
                }
                Err(LinkError::DuplicateCode(_)) => {
                    debug!(code = %code, attempt, "lost race for candidate code");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(max_attempts = self.max_attempts, "no free code found");
        Err(LinkError::ExhaustedKeyspace(self.max_attempts))
    }

    async fn delete(&self, principal: &Principal, code: &ShortCode) -> Result<()> {
        match self.guard.delete(principal, code).await {
            Ok(()) => {
                self.resolver.invalidate(code).await;
                info!(code = %code, owner = %principal, "link deleted");
                Ok(())
            }
            Err(
                err @ (LinkError::NotFound(_) | LinkError::Forbidden(_) | LinkError::Unauthenticated),
            ) => Err(err),
            Err(err) => {
                // The store may have committed before failing.
                self.resolver.invalidate(code).await;
                warn!(code = %code, error = %err, "delete outcome unknown, cache invalidated");
                Err(err)
            }
        }
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<Link>> {
        self.guard.list(principal).await
    }

    async fn resolve_link(&self, code: &ShortCode) -> Result<Link> {
        self.resolver.resolve_link(code).await
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        self.resolver.resolve(code).await
    }
}

use std::sync::Arc;

use jiff::Timestamp;
use tether_core::{Link, LinkError, LinkStore, NewLink, OwnerId, Principal, Result, ShortCode};
use tracing::debug;

/// Authorization in front of a [`LinkStore`].
///
/// The requester is always passed in explicitly. Rules:
/// - anyone may create; anonymous creates produce owner-less links;
/// - listing and deleting require an authenticated requester;
/// - only the owner may delete, and owner-less links cannot be deleted.
pub struct OwnershipGuard<S: ?Sized> {
    store: Arc<S>,
}

impl<S: LinkStore + ?Sized> OwnershipGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn require_owner(principal: &Principal) -> Result<&OwnerId> {
        principal.owner().ok_or(LinkError::Unauthenticated)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        code: ShortCode,
        target_url: String,
        expires_at: Option<Timestamp>,
    ) -> Result<Link> {
        self.store
            .create(NewLink {
                code,
                target_url,
                owner: principal.owner().cloned(),
                expires_at,
            })
            .await
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Link>> {
        let owner = Self::require_owner(principal)?;
        self.store.list_by_owner(owner).await
    }

    pub async fn delete(&self, principal: &Principal, code: &ShortCode) -> Result<()> {
        let requester = Self::require_owner(principal)?;

        let link = self
            .store
            .find(code)
            .await?
            .ok_or_else(|| LinkError::NotFound(code.to_string()))?;

        match &link.owner {
            Some(owner) if owner == requester => {}
            Some(_) => {
                debug!(code = %code, requester = %requester, "delete by non-owner refused");
                return Err(LinkError::Forbidden(code.to_string()));
            }
            None => {
                debug!(code = %code, "delete of owner-less link refused");
                return Err(LinkError::Forbidden(code.to_string()));
            }
        }

        // The store repeats the owner check atomically with the removal.
        self.store.delete(code, principal).await
    }
}

use crate::error::Result;
use crate::link::{Link, NewLink};
use crate::principal::{OwnerId, Principal};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};

/// Whether a deleted code may ever be assigned again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReusePolicy {
    /// Deleted codes stay retired forever.
    #[default]
    Never,
    /// Deleted codes become available once the grace period has elapsed.
    AfterGrace(SignedDuration),
}

impl ReusePolicy {
    /// Whether a code retired at `retired_at` may be reassigned at `now`.
    ///
    /// A grace period reaching past the representable time range never
    /// elapses.
    pub fn allows_reuse(&self, retired_at: Timestamp, now: Timestamp) -> bool {
        match self {
            ReusePolicy::Never => false,
            ReusePolicy::AfterGrace(grace) => retired_at
                .checked_add(*grace)
                .is_ok_and(|reusable_at| now >= reusable_at),
        }
    }
}

/// A read-only view of a link store.
///
/// These operations are idempotent and may be retried.
#[async_trait]
pub trait ReadLinkStore: Send + Sync + 'static {
    /// Retrieves the link for a given short code.
    ///
    /// Fails with `NotFound` if the code does not exist or has expired.
    async fn get(&self, code: &ShortCode) -> Result<Link>;

    /// Retrieves the stored link for a code, expired or not.
    async fn find(&self, code: &ShortCode) -> Result<Option<Link>>;

    /// Checks whether a short code is taken, by a live or expired link
    /// or by a retired code that may not be reused yet.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Returns all non-expired links owned by `owner`, oldest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Link>>;
}

#[async_trait]
pub trait LinkStore: ReadLinkStore {
    /// Creates a new link.
    ///
    /// Fails with `DuplicateCode` if the code is taken, `InvalidUrl` if the
    /// target is not a valid URL and `InvalidExpiry` if the expiry is not in
    /// the future. Of two concurrent creates for one code exactly one wins.
    async fn create(&self, link: NewLink) -> Result<Link>;

    /// Permanently deletes the link for a given short code.
    ///
    /// Fails with `NotFound` if absent and `Forbidden` if the link has an
    /// owner other than `requester`.
    async fn delete(&self, code: &ShortCode, requester: &Principal) -> Result<()>;
}

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::{
    Link, LinkError, LinkStore, NewLink, OwnerId, Principal, ReadLinkStore, Result, ReusePolicy,
    ShortCode,
};
use tracing::{debug, trace};

/// In-memory storage slot for a link.
#[derive(Debug, Clone)]
struct Slot {
    link: Link,
    /// Insertion order, used for listing.
    seq: u64,
}

/// In-memory implementation of the link store using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. Every mutation of a code happens under that
/// code's entry lock, which makes create and delete atomic per code.
///
/// Deleted codes are remembered in `retired` so the reuse policy can be
/// enforced. Lock order is always `links` then `retired`.
#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    links: DashMap<ShortCode, Slot>,
    retired: DashMap<ShortCode, Timestamp>,
    sequence: AtomicU64,
    reuse: ReusePolicy,
}

impl InMemoryLinkStore {
    /// Creates a new in-memory store that never reuses deleted codes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the given reuse policy.
    pub fn with_reuse_policy(reuse: ReusePolicy) -> Self {
        Self {
            reuse,
            ..Self::default()
        }
    }

    /// Number of stored links, expired ones included.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn is_retired(&self, code: &ShortCode, now: Timestamp) -> bool {
        self.retired
            .get(code)
            .is_some_and(|retired_at| !self.reuse.allows_reuse(*retired_at, now))
    }
}

#[async_trait]
impl ReadLinkStore for InMemoryLinkStore {
    async fn get(&self, code: &ShortCode) -> Result<Link> {
        let Some(slot) = self.links.get(code) else {
            trace!(code = %code, "code not stored");
            return Err(LinkError::NotFound(code.to_string()));
        };

        if slot.link.is_expired() {
            trace!(code = %code, "link expired");
            return Err(LinkError::NotFound(code.to_string()));
        }

        Ok(slot.link.clone())
    }

    async fn find(&self, code: &ShortCode) -> Result<Option<Link>> {
        Ok(self.links.get(code).map(|slot| slot.link.clone()))
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.links.contains_key(code) || self.is_retired(code, Timestamp::now()))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Link>> {
        let now = Timestamp::now();
        let mut owned: Vec<(u64, Link)> = self
            .links
            .iter()
            .filter(|slot| slot.link.owner.as_ref() == Some(owner) && !slot.link.is_expired_at(now))
            .map(|slot| (slot.seq, slot.link.clone()))
            .collect();
        owned.sort_unstable_by_key(|(seq, _)| *seq);
        Ok(owned.into_iter().map(|(_, link)| link).collect())
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn create(&self, link: NewLink) -> Result<Link> {
        let now = Timestamp::now();
        link.validate(now)?;

        match self.links.entry(link.code.clone()) {
            Entry::Occupied(_) => Err(LinkError::DuplicateCode(link.code.to_string())),
            Entry::Vacant(vacant) => {
                if self.is_retired(&link.code, now) {
                    return Err(LinkError::DuplicateCode(link.code.to_string()));
                }
                self.retired.remove(&link.code);

                let link = link.into_link(now);
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                vacant.insert(Slot {
                    link: link.clone(),
                    seq,
                });
                debug!(code = %link.code, "stored link");
                Ok(link)
            }
        }
    }

    async fn delete(&self, code: &ShortCode, requester: &Principal) -> Result<()> {
        match self.links.entry(code.clone()) {
            Entry::Vacant(_) => Err(LinkError::NotFound(code.to_string())),
            Entry::Occupied(occupied) => {
                if !occupied.get().link.deletable_by(requester) {
                    return Err(LinkError::Forbidden(code.to_string()));
                }
                self.retired.insert(code.clone(), Timestamp::now());
                occupied.remove();
                debug!(code = %code, "deleted link");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn new_link(c: &str, owner: Option<&str>, expires_at: Option<Timestamp>) -> NewLink {
        NewLink {
            code: code(c),
            target_url: format!("https://example.com/{c}"),
            owner: owner.map(OwnerId::new),
            expires_at,
        }
    }

    /// Inserts a link whose expiry already passed, bypassing validation.
    fn insert_expired(store: &InMemoryLinkStore, c: &str, owner: Option<&str>) {
        let link = Link {
            code: code(c),
            target_url: "https://example.com".to_string(),
            owner: owner.map(OwnerId::new),
            created_at: Timestamp::now() - SignedDuration::from_secs(10),
            expires_at: Some(Timestamp::now() - SignedDuration::from_secs(1)),
        };
        let seq = store.sequence.fetch_add(1, Ordering::Relaxed);
        store.links.insert(code(c), Slot { link, seq });
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryLinkStore::new();

        let created = store.create(new_link("abc123", None, None)).await.unwrap();
        let fetched = store.get(&code("abc123")).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.target_url, "https://example.com/abc123");
        assert_eq!(fetched.owner, None);
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let store = InMemoryLinkStore::new();

        let err = store.get(&code("nope")).await.unwrap_err();
        assert!(matches!(err, LinkError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_conflict() {
        let store = InMemoryLinkStore::new();
        store.create(new_link("abc123", None, None)).await.unwrap();

        let err = store
            .create(new_link("abc123", Some("alice"), None))
            .await
            .unwrap_err();

        assert!(matches!(err, LinkError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_url() {
        let store = InMemoryLinkStore::new();
        let mut link = new_link("abc123", None, None);
        link.target_url = "not a url".to_string();

        let err = store.create(link).await.unwrap_err();
        assert!(matches!(err, LinkError::InvalidUrl(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_past_expiry() {
        let store = InMemoryLinkStore::new();
        let past = Timestamp::now() - SignedDuration::from_secs(1);

        let err = store
            .create(new_link("abc123", None, Some(past)))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidExpiry(_)));
    }

    #[tokio::test]
    async fn expired_link_is_not_found_but_still_taken() {
        let store = InMemoryLinkStore::new();
        insert_expired(&store, "abc123", None);

        let err = store.get(&code("abc123")).await.unwrap_err();
        assert!(matches!(err, LinkError::NotFound(_)));
        assert!(store.find(&code("abc123")).await.unwrap().is_some());

        assert!(store.exists(&code("abc123")).await.unwrap());
        let err = store.create(new_link("abc123", None, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn not_expired_link() {
        let store = InMemoryLinkStore::new();
        let future = Timestamp::now() + SignedDuration::from_hours(1);

        store
            .create(new_link("abc123", None, Some(future)))
            .await
            .unwrap();

        let link = store.get(&code("abc123")).await.unwrap();
        assert_eq!(link.expires_at, Some(future));
    }

    #[tokio::test]
    async fn delete_by_owner() {
        let store = InMemoryLinkStore::new();
        store
            .create(new_link("abc123", Some("alice"), None))
            .await
            .unwrap();

        store
            .delete(&code("abc123"), &Principal::user("alice"))
            .await
            .unwrap();

        assert!(matches!(
            store.get(&code("abc123")).await.unwrap_err(),
            LinkError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_by_other_user_is_forbidden() {
        let store = InMemoryLinkStore::new();
        store
            .create(new_link("abc123", Some("alice"), None))
            .await
            .unwrap();

        for requester in [Principal::user("bob"), Principal::Anonymous] {
            let err = store.delete(&code("abc123"), &requester).await.unwrap_err();
            assert!(matches!(err, LinkError::Forbidden(_)));
        }
        assert!(store.get(&code("abc123")).await.is_ok());
    }

    #[tokio::test]
    async fn delete_nonexistent() {
        let store = InMemoryLinkStore::new();

        let err = store
            .delete(&code("nope"), &Principal::user("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::NotFound(_)));
    }

    #[tokio::test]
    async fn owner_can_delete_expired_link() {
        let store = InMemoryLinkStore::new();
        insert_expired(&store, "abc123", Some("alice"));

        store
            .delete(&code("abc123"), &Principal::user("alice"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn deleted_code_is_never_reused_by_default() {
        let store = InMemoryLinkStore::new();
        store
            .create(new_link("abc123", Some("alice"), None))
            .await
            .unwrap();
        store
            .delete(&code("abc123"), &Principal::user("alice"))
            .await
            .unwrap();

        assert!(store.exists(&code("abc123")).await.unwrap());
        let err = store.create(new_link("abc123", None, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn deleted_code_reusable_after_grace() {
        let store = InMemoryLinkStore::with_reuse_policy(ReusePolicy::AfterGrace(
            SignedDuration::from_hours(1),
        ));
        store
            .retired
            .insert(code("abc123"), Timestamp::now() - SignedDuration::from_hours(2));
        store
            .retired
            .insert(code("fresh1"), Timestamp::now() - SignedDuration::from_mins(5));

        assert!(!store.exists(&code("abc123")).await.unwrap());
        store.create(new_link("abc123", None, None)).await.unwrap();
        assert!(store.retired.get(&code("abc123")).is_none());

        let err = store.create(new_link("fresh1", None, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn unbounded_grace_keeps_code_retired() {
        let store = InMemoryLinkStore::with_reuse_policy(ReusePolicy::AfterGrace(
            SignedDuration::from_secs(i64::MAX),
        ));
        store
            .create(new_link("abc123", Some("alice"), None))
            .await
            .unwrap();
        store
            .delete(&code("abc123"), &Principal::user("alice"))
            .await
            .unwrap();

        assert!(store.exists(&code("abc123")).await.unwrap());
        let err = store.create(new_link("abc123", None, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::DuplicateCode(_)));
    }

    #[tokio::test]
    async fn list_by_owner_in_insertion_order() {
        let store = InMemoryLinkStore::new();
        for c in ["zzzz1", "aaaa2", "mmmm3"] {
            store.create(new_link(c, Some("alice"), None)).await.unwrap();
        }
        store.create(new_link("bobs1", Some("bob"), None)).await.unwrap();
        store.create(new_link("anon1", None, None)).await.unwrap();
        insert_expired(&store, "gone1", Some("alice"));

        let codes: Vec<_> = store
            .list_by_owner(&OwnerId::new("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|link| link.code.to_string())
            .collect();

        assert_eq!(codes, ["zzzz1", "aaaa2", "mmmm3"]);
    }

    #[tokio::test]
    async fn concurrent_creates_for_same_code_have_one_winner() {
        let store = Arc::new(InMemoryLinkStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut link = new_link("race01", None, None);
                    link.target_url = format!("https://example{i}.com");
                    store.create(link).await
                })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(err) => assert!(matches!(err, LinkError::DuplicateCode(_))),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(store.len(), 1);
    }
}

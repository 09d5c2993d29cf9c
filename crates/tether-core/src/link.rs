use crate::error::{LinkError, Result};
use crate::principal::{OwnerId, Principal};
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use url::Url;

/// Schemes that are never accepted as redirect targets.
const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];

/// A persisted short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub code: ShortCode,
    pub target_url: String,
    pub owner: Option<OwnerId>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl Link {
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }

    /// Whether `requester` may delete this link at the storage level.
    ///
    /// Owner-less links carry no ownership constraint here; the
    /// ownership guard above the store decides who may reach this point.
    pub fn deletable_by(&self, requester: &Principal) -> bool {
        match &self.owner {
            None => true,
            Some(owner) => requester.owner() == Some(owner),
        }
    }
}

/// A link about to be created.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub code: ShortCode,
    pub target_url: String,
    pub owner: Option<OwnerId>,
    pub expires_at: Option<Timestamp>,
}

impl NewLink {
    /// Checks the target URL and the expiry against `now`.
    pub fn validate(&self, now: Timestamp) -> Result<()> {
        validate_target_url(&self.target_url)?;
        validate_expiry(self.expires_at, now)
    }

    /// Stamps the creation time, producing the stored record.
    pub fn into_link(self, created_at: Timestamp) -> Link {
        Link {
            code: self.code,
            target_url: self.target_url,
            owner: self.owner,
            created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Validates that `url` is an absolute http(s) URL with a host.
pub fn validate_target_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(LinkError::InvalidUrl("URL cannot be empty".to_string()));
    }
    if trimmed.len() != url.len() {
        return Err(LinkError::InvalidUrl(
            "URL must not have leading or trailing whitespace".to_string(),
        ));
    }

    // The parser drops tabs and newlines; the stored string must be usable as-is.
    if url.chars().any(char::is_control) {
        return Err(LinkError::InvalidUrl(
            "URL must not contain control characters".to_string(),
        ));
    }

    let parsed = Url::parse(url).map_err(|e| LinkError::InvalidUrl(format!("{url}: {e}")))?;

    let scheme = parsed.scheme();
    if BLOCKED_SCHEMES.contains(&scheme) {
        return Err(LinkError::InvalidUrl(format!(
            "scheme '{scheme}' is not allowed"
        )));
    }
    if scheme != "http" && scheme != "https" {
        return Err(LinkError::InvalidUrl(format!(
            "URL scheme must be http or https: {scheme}"
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(LinkError::InvalidUrl(format!("URL must have a host: {url}")));
    }

    Ok(())
}

/// Rejects expiry timestamps that are not strictly in the future.
pub fn validate_expiry(expires_at: Option<Timestamp>, now: Timestamp) -> Result<()> {
    match expires_at {
        Some(expires_at) if expires_at <= now => Err(LinkError::InvalidExpiry(format!(
            "expires_at {expires_at} is not in the future"
        ))),
        _ => Ok(()),
    }
}

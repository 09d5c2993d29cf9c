use thiserror::Error;

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by link generation, storage, resolution and authorization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),
    #[error("short code already exists: {0}")]
    DuplicateCode(String),
    #[error("could not allocate a free short code after {0} attempts")]
    ExhaustedKeyspace(u32),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("not allowed to modify link: {0}")]
    Forbidden(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage operation failed: {0}")]
    Storage(String),
}

impl LinkError {
    /// Whether an idempotent operation failing with this error may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, LinkError::StorageUnavailable(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

//! Link cache backends used by the resolver.

pub mod layered;
pub mod moka;
pub mod redis;

pub use layered::LayeredCache;
pub use self::moka::MokaLinkCache;
pub use self::redis::RedisLinkCache;
pub use tether_core::{CacheError, CacheResult, LinkCache};

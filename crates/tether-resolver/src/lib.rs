//! Short code resolution with an optional read-through cache.
//!
//! ```rust
//! use std::sync::Arc;
//! use tether_cache::MokaLinkCache;
//! use tether_resolver::{ResolutionService, Resolver, ResolverConfig};
//! use tether_storage::InMemoryLinkStore;
//!
//! # async fn example() -> tether_core::Result<()> {
//! let store = Arc::new(InMemoryLinkStore::new());
//! let resolver = ResolutionService::with_cache(
//!     store,
//!     Arc::new(MokaLinkCache::new()),
//!     ResolverConfig::default(),
//! );
//!
//! let code = tether_core::ShortCode::new("abc123")?;
//! let target = resolver.resolve(&code).await?;
//! println!("redirect to {target}");
//! # Ok(())
//! # }
//! ```

pub mod resolver;
pub mod service;

pub use resolver::Resolver;
pub use service::{ResolutionService, ResolverConfig};

//! Link lifecycle service.
//!
//! [`LinkService`] allocates codes for new links, guards deletes and
//! listings with [`OwnershipGuard`], and resolves codes through a
//! [`tether_resolver::Resolver`].

pub mod guard;
pub mod service;
pub mod shortener;

pub use guard::OwnershipGuard;
pub use service::{LinkService, LinkServiceConfig};
pub use shortener::{CreateLink, Shortener};

//! Core types and traits for the Tether link shortener.
//!
//! This crate provides the types shared by the generator, the stores,
//! the caches and the services built on top of them.

pub mod cache;
pub mod error;
pub mod link;
pub mod principal;
pub mod shortcode;
pub mod store;

pub use cache::LinkCache;
pub use error::{CacheError, CacheResult, LinkError, Result};
pub use link::{validate_expiry, validate_target_url, Link, NewLink};
pub use principal::{OwnerId, Principal};
pub use shortcode::ShortCode;
pub use store::{LinkStore, ReadLinkStore, ReusePolicy};

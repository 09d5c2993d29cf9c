//! Link store implementations.

pub mod memory;
pub mod mysql;
pub mod resilient;

pub use memory::InMemoryLinkStore;
pub use mysql::MySqlLinkStore;
pub use resilient::{ResilientStore, RetryConfig};

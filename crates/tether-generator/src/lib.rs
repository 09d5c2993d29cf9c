//! Short code generation.
//!
//! Generators only propose candidates. Checking a candidate against the
//! store and retrying on collision is the caller's job, see
//! `tether_shortener::LinkService`.

pub mod alphabet;
pub mod error;
pub mod random;
pub mod seq;

pub use alphabet::Alphabet;
pub use error::{GeneratorError, Result};
pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use tether_core::ShortCode;

/// Trait for generating candidate short codes.
///
/// Implementations are pure generators that don't interact with storage.
pub trait Generator: Send + Sync + 'static {
    /// Produces the next candidate code.
    fn generate(&self) -> ShortCode;
}

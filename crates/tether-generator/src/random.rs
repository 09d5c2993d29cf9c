use crate::alphabet::Alphabet;
use crate::error::{GeneratorError, Result};
use crate::Generator;
use tether_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use tether_core::ShortCode;

pub const DEFAULT_LENGTH: usize = 7;

/// Draws fixed-length codes uniformly from an alphabet.
///
/// Symbols come from the thread-local CSPRNG, so codes do not reveal
/// creation order or volume. Uniqueness is not guaranteed here; the
/// caller checks each candidate against the store.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    alphabet: Alphabet,
    length: usize,
}

impl RandomGenerator {
    pub fn new(alphabet: Alphabet, length: usize) -> Result<Self> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(GeneratorError::InvalidLength {
                min: MIN_LENGTH,
                max: MAX_LENGTH,
                got: length,
            });
        }
        Ok(Self { alphabet, length })
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct codes this generator can produce.
    pub fn keyspace(&self) -> u128 {
        (self.alphabet.len() as u128).saturating_pow(self.length as u32)
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::BASE62,
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let code: String = (0..self.length)
            .map(|_| {
                self.alphabet
                    .symbol(rand::random_range(0..self.alphabet.len()))
            })
            .collect();
        ShortCode::new_unchecked(code)
    }
}

use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::Generator;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::shortcode::MIN_LENGTH;
use tether_core::{ReadLinkStore, ShortCode};

pub const DEFAULT_WIDTH: usize = 6;

/// A short code generator using a monotonic counter.
///
/// Each call encodes the next counter value in the alphabet, left-padded
/// to a minimum width. Codes never repeat within one instance, but they
/// reveal creation order and volume.
///
/// For distributed deployments, give each node a disjoint counter range
/// with [`SeqGenerator::with_offset`].
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    alphabet: Alphabet,
    width: usize,
}

impl SeqGenerator {
    pub fn new(alphabet: Alphabet) -> Self {
        Self::with_offset(alphabet, 0)
    }

    /// Creates a generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes (e.g., node 1 starts at 0, node 2 at 1_000_000).
    pub fn with_offset(alphabet: Alphabet, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            alphabet,
            width: DEFAULT_WIDTH,
        }
    }

    /// Sets the minimum code width. Widths below the shortest valid code
    /// are raised to it.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width.max(MIN_LENGTH);
        self
    }

    /// Creates a generator positioned at the first free counter value at
    /// or after `start`.
    ///
    /// Values below the counter are assumed taken, so the boundary is found
    /// with an exponential and then a binary search over `store.exists`.
    /// Gaps left by failed creates may place the counter early, in which
    /// case the next draws skip the taken codes above it.
    pub async fn resume<S>(
        alphabet: Alphabet,
        width: usize,
        start: u64,
        store: &S,
    ) -> tether_core::Result<Self>
    where
        S: ReadLinkStore + ?Sized,
    {
        let generator = Self::with_offset(alphabet, start).width(width);
        if !generator.is_taken(store, start).await? {
            return Ok(generator);
        }

        let mut taken = start;
        let mut step = 1_u64;
        let mut free = loop {
            let candidate = start.saturating_add(step);
            if candidate == taken || !generator.is_taken(store, candidate).await? {
                break candidate;
            }
            taken = candidate;
            step = step.saturating_mul(2);
        };

        while free - taken > 1 {
            let mid = taken + (free - taken) / 2;
            if generator.is_taken(store, mid).await? {
                taken = mid;
            } else {
                free = mid;
            }
        }

        generator.counter.store(free, Ordering::Relaxed);
        Ok(generator)
    }

    /// The counter value the next draw will encode.
    pub fn position(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// The code this generator emits for counter value `count`.
    pub fn code_at(&self, count: u64) -> ShortCode {
        ShortCode::new_unchecked(self.alphabet.encode_padded(count, self.width))
    }

    async fn is_taken<S>(&self, store: &S, count: u64) -> tether_core::Result<bool>
    where
        S: ReadLinkStore + ?Sized,
    {
        store.exists(&self.code_at(count)).await
    }

    /// Maps a code produced by this generator back to its counter value.
    pub fn decode(&self, code: &ShortCode) -> Result<u64> {
        self.alphabet.decode(code.as_str())
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        self.code_at(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

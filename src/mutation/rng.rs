//! Seeded randomness for mutation engines.
//!
//! Every engine instance owns one [`SeededRng`] derived from its seed string, so
//! the same seed always replays the same sequence of draws. The generator is
//! ChaCha8 keyed by the SHA-256 digest of the seed.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Characters used by [`SeededRng::alphanumeric`].
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Returns the lowercase hex SHA-256 digest of a string.
pub fn hex_digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Deterministic random source keyed by a seed string.
pub struct SeededRng {
    rng: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a random source from a seed string.
    pub fn new(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(digest.as_slice());
        Self {
            rng: ChaCha8Rng::from_seed(key),
        }
    }

    /// Returns a uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    /// Returns a uniform integer in `low..=high`.
    pub fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.random_range(low..=high)
    }

    /// Chooses one item uniformly, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index(items.len());
        items.get(idx)
    }

    /// Samples `count` distinct items without replacement.
    ///
    /// `count` is clamped to the slice length. Results come back in draw order.
    pub fn sample<T: Clone>(&mut self, items: &[T], count: usize) -> Vec<T> {
        let count = count.min(items.len());
        let mut pool: Vec<usize> = (0..items.len()).collect();

        // Partial Fisher-Yates: the first `count` slots end up as the sample.
        for i in 0..count {
            let j = self.rng.random_range(i..pool.len());
            pool.swap(i, j);
        }

        pool[..count].iter().map(|&i| items[i].clone()).collect()
    }

    /// Generates a random lowercase alphanumeric string.
    pub fn alphanumeric(&mut self, length: usize) -> String {
        (0..length)
            .map(|_| ALPHANUMERIC[self.index(ALPHANUMERIC.len())] as char)
            .collect()
    }
}

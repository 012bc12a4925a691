//! Hashing and deterministic randomness.
//!
//! Every random choice in a step (spawn placement, drawn-life shuffles,
//! disaster rolls, bank rotation, heart placement) routes through a single
//! [`RandomGenerator`] in a fixed call order, so replaying a block yields a
//! bit-identical state on every node.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit hash, stored in the byte order it is hashed in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Hash256(pub [u8; 32]);

/// Hash of a block, used to seed per-step randomness.
pub type BlockHash = Hash256;

impl Hash256 {
    /// The all-zero hash (pre-genesis marker).
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Hash arbitrary bytes with SHA-256.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        Self(out)
    }

    /// Parse from a lowercase hex string.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }

    /// Check for the all-zero (pre-genesis) value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Seeded deterministic random generator.
///
/// The seed is `SHA-256(previous_block_hash || height_le)`. The 32-byte state
/// is consumed as little-endian u64 words; once exhausted it is replaced by
/// its own SHA-256 digest. [`RandomGenerator::next_range`] uses rejection
/// sampling, so results are uniform for any bound.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    state: [u8; 32],
    cursor: usize,
}

impl RandomGenerator {
    /// Seed from the previous block hash and the height of the step.
    #[must_use]
    pub fn new(prev_hash: &BlockHash, height: i32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.0);
        hasher.update(height.to_le_bytes());
        let mut state = [0u8; 32];
        state.copy_from_slice(&hasher.finalize());
        Self { state, cursor: 0 }
    }

    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64 {
        if self.cursor + 8 > self.state.len() {
            let mut next = [0u8; 32];
            next.copy_from_slice(&Sha256::digest(self.state));
            self.state = next;
            self.cursor = 0;
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.state[self.cursor..self.cursor + 8]);
        self.cursor += 8;
        u64::from_le_bytes(word)
    }

    /// Next 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Uniform value in `[0, n)` via rejection sampling.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn next_range(&mut self, n: u64) -> u64 {
        assert!(n > 0, "next_range bound must be positive");
        // Largest multiple of n that fits in u64; values at or above it are
        // rejected so the modulo below is unbiased.
        let zone = (u64::MAX / n) * n;
        loop {
            let r = self.next_u64();
            if r < zone {
                return r % n;
            }
        }
    }

    /// Deterministic Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

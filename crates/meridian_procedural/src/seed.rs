//! # Seeds and the Seeded Generator
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed` and chunk coordinate, `chunk_seed` returns
//! the same 32-bit value on any platform, any time. A `SeededRng` built
//! from that value and consumed in the same order yields identical
//! results.
//!
//! The stream is ChaCha8: portable, documented output, and independent of
//! the `rand` version's choice of `StdRng`. It drives layout decisions
//! only; nothing here is meant to be unpredictable to a player.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::chunk::ChunkCoord;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the eight little-endian bytes of `value`.
const fn fnv1a(mut hash: u64, value: u64) -> u64 {
    let mut i = 0;
    while i < 8 {
        hash ^= (value >> (i * 8)) & 0xff;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Folds a 64-bit hash into 32 bits.
const fn fold(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Mixes a chunk seed with two sub-indices (placement, entity, ...).
///
/// Used to give every spawned entity its own reproducible stream without
/// disturbing the chunk's layout stream.
#[must_use]
pub const fn derive_seed(seed: u32, a: u32, b: u32) -> u32 {
    let mut hash = fnv1a(FNV_OFFSET, seed as u64);
    hash = fnv1a(hash, a as u64);
    hash = fnv1a(hash, b as u64);
    fold(hash)
}

/// World seed for deterministic generation.
///
/// Fixed for the lifetime of a game session. All generation derives from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives the generation seed of one chunk.
    #[must_use]
    pub const fn chunk_seed(self, coord: ChunkCoord) -> u32 {
        let mut hash = fnv1a(FNV_OFFSET, self.0);
        hash = fnv1a(hash, coord.x as u32 as u64);
        hash = fnv1a(hash, coord.z as u32 as u64);
        fold(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// Reproducible stream of floats in `[0, 1)` plus the helpers built on it.
///
/// Every helper consumes the float stream, so two generators with the same
/// seed stay in lockstep as long as they call the same helpers in order.
#[derive(Clone, Debug)]
pub struct SeededRng {
    rng: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a generator from a 32-bit seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(u64::from(seed)),
        }
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform integer in `[min, max]` (inclusive). Returns `min` if `max <= min`.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = i64::from(max) - i64::from(min) + 1;
        let offset = (self.next_f64() * span as f64).floor() as i64;
        (i64::from(min) + offset.min(span - 1)) as i32
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        let last = i32::try_from(len - 1).unwrap_or(i32::MAX);
        self.range_i32(0, last) as usize
    }

    /// Returns true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a list. `None` for an empty list.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.index(items.len());
        items.get(i)
    }

    /// Weighted pick, returns the chosen index. `None` if all weights are zero.
    pub fn pick_weighted(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        if total == 0 {
            return None;
        }
        let mut roll = (self.next_f64() * total as f64).floor() as u64;
        for (i, &w) in weights.iter().enumerate() {
            let w = u64::from(w);
            if roll < w {
                return Some(i);
            }
            roll -= w;
        }
        weights.iter().rposition(|&w| w > 0)
    }

    /// Fisher-Yates shuffle driven by the same stream.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

//! Deterministic random primitives.
//!
//! Two flavours exist. `static_random_*` hashes a seed together with a list of
//! integers and is used where values must be addressable in any order (per
//! tile, per sector, per layer). [`RandomSource`] is a sequential stream used
//! where generation walks a fixed order, such as laying out a celestial chunk.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Derives an independent seed from `base` and a textual stream label.
#[must_use]
pub fn derive_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hashes `seed` and `values` into a well-distributed 64-bit value.
#[must_use]
pub fn static_random_u64(seed: u64, values: &[i64]) -> u64 {
    let mut state = mix(seed.wrapping_add(GOLDEN_GAMMA));
    for value in values {
        state = mix(state ^ (*value as u64).wrapping_add(GOLDEN_GAMMA));
    }
    state
}

/// Hashes `seed` and `values` into a float in `[0, 1)`.
#[must_use]
pub fn static_random_f32(seed: u64, values: &[i64]) -> f32 {
    const SCALE: f32 = 1.0 / (1_u32 << 24) as f32;
    (static_random_u64(seed, values) >> 40) as f32 * SCALE
}

/// Hashes `seed` and `values` into an integer in `[min, max]`.
#[must_use]
pub fn static_random_i32_range(seed: u64, min: i32, max: i32, values: &[i64]) -> i32 {
    if max <= min {
        return min;
    }
    let span = (i64::from(max) - i64::from(min) + 1) as u64;
    (i64::from(min) + (static_random_u64(seed, values) % span) as i64) as i32
}

/// Seeded sequential random stream.
#[derive(Clone, Debug)]
pub struct RandomSource {
    rng: ChaCha8Rng,
}

impl RandomSource {
    /// Creates a stream seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a stream keyed by a seed and a list of integers.
    #[must_use]
    pub fn keyed(seed: u64, values: &[i64]) -> Self {
        Self::new(static_random_u64(seed, values))
    }

    /// Next raw 64-bit value.
    pub fn randu64(&mut self) -> u64 {
        self.rng.gen()
    }

    /// Uniform float in `[0, 1)`.
    pub fn randf(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform float in `[min, max)`; returns `min` for empty ranges.
    pub fn randf_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + (max - min) * self.randf()
    }

    /// Uniform integer in `[min, max]`; returns `min` for empty ranges.
    pub fn rand_int_range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Bernoulli draw; the probability is clamped to `[0, 1]`.
    pub fn bernoulli(&mut self, probability: f32) -> bool {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self.rng.gen_bool(f64::from(probability))
    }

    /// Picks an entry from `(weight, value)` pairs proportionally to weight.
    ///
    /// Non-positive weights are never picked. Returns `None` when nothing has
    /// positive weight.
    pub fn pick_weighted<'a, T>(&mut self, entries: &'a [(f32, T)]) -> Option<&'a T> {
        let total: f32 = entries
            .iter()
            .map(|(weight, _)| weight.max(0.0))
            .sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.randf() * total;
        let mut last = None;
        for (weight, value) in entries {
            if *weight <= 0.0 {
                continue;
            }
            last = Some(value);
            if target < *weight {
                return Some(value);
            }
            target -= *weight;
        }
        last
    }

    /// Shuffles `values` in place.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }
}

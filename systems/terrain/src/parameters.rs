use orbitile_core::derive_seed;
use serde::{Deserialize, Serialize};

/// World-level inputs shared by every selector in a graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainSelectorParameters {
    /// Circumference of the world in tiles; zero disables wrapping.
    pub world_width: u32,
    /// Reference surface height in tiles.
    pub base_height: f32,
    /// Seed every random choice is derived from.
    pub seed: u64,
    /// Scaling applied by selectors that thin out features.
    #[serde(default = "default_commonality")]
    pub commonality: f32,
}

fn default_commonality() -> f32 {
    1.0
}

impl TerrainSelectorParameters {
    /// Creates parameters with a commonality of one.
    #[must_use]
    pub const fn new(world_width: u32, base_height: f32, seed: u64) -> Self {
        Self {
            world_width,
            base_height,
            seed,
            commonality: 1.0,
        }
    }

    /// Copy with a different seed.
    #[must_use]
    pub const fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Copy with a different commonality.
    #[must_use]
    pub const fn with_commonality(self, commonality: f32) -> Self {
        Self {
            commonality,
            ..self
        }
    }

    /// Copy whose seed is derived from this one and `label`.
    #[must_use]
    pub fn derived(self, label: &str) -> Self {
        self.with_seed(derive_seed(self.seed, label))
    }
}

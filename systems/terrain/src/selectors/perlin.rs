//! Fractal noise field.

use orbitile_core::{Perlin, PerlinConfig};
use serde::Deserialize;

use crate::{TerrainSelector, TerrainSelectorParameters};

/// Config of [`PerlinSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerlinSelectorConfig {
    /// Noise tuning.
    #[serde(flatten)]
    pub perlin: PerlinConfig,
    /// Horizontal input scale.
    #[serde(default = "one")]
    pub x_influence: f64,
    /// Vertical input scale.
    #[serde(default = "one")]
    pub y_influence: f64,
}

fn one() -> f64 {
    1.0
}

/// Perlin noise that wraps seamlessly around the world.
#[derive(Debug)]
pub struct PerlinSelector {
    perlin: Perlin,
    x_influence: f64,
    y_influence: f64,
    world_width: u32,
}

impl PerlinSelector {
    /// Builds the selector, seeding the noise from `parameters.seed`.
    #[must_use]
    pub fn new(config: PerlinSelectorConfig, parameters: TerrainSelectorParameters) -> Self {
        Self {
            perlin: Perlin::new(config.perlin, parameters.seed),
            x_influence: config.x_influence,
            y_influence: config.y_influence,
            world_width: parameters.world_width,
        }
    }
}

impl TerrainSelector for PerlinSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        self.perlin.get_wrapped(
            f64::from(x),
            f64::from(y) * self.y_influence,
            self.world_width,
            self.x_influence,
        ) as f32
    }
}

//! Blocky ridged noise for rock and crystal layers.

use orbitile_core::{Perlin, PerlinConfig, PerlinKind};
use serde::Deserialize;

use crate::{TerrainSelector, TerrainSelectorParameters};

/// Config of [`RidgeBlocksSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RidgeBlocksConfig {
    /// Output scale of the ridge fields.
    pub amplitude: f64,
    /// Input scale of the ridge fields.
    pub frequency: f64,
    /// Constant added to the ridge fields.
    pub bias: f64,
    /// Octaves of the ridge fields.
    pub octaves: u32,
    /// Input scale of the warping noise.
    pub noise_frequency: f64,
    /// Output scale of the warping noise, in tiles.
    pub noise_amplitude: f64,
}

impl Default for RidgeBlocksConfig {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            frequency: 0.05,
            bias: 0.0,
            octaves: 2,
            noise_frequency: 0.1,
            noise_amplitude: 4.0,
        }
    }
}

/// Two ridged multifractal fields sampled at positions pushed apart by a
/// shared billow noise, then averaged.
#[derive(Debug)]
pub struct RidgeBlocksSelector {
    ridge_a: Perlin,
    ridge_b: Perlin,
    noise: Perlin,
    world_width: u32,
}

impl RidgeBlocksSelector {
    /// Builds the selector.
    #[must_use]
    pub fn new(config: RidgeBlocksConfig, parameters: TerrainSelectorParameters) -> Self {
        let ridge = PerlinConfig {
            kind: PerlinKind::RidgedMulti,
            octaves: config.octaves,
            frequency: config.frequency,
            amplitude: config.amplitude,
            bias: config.bias,
            ..PerlinConfig::default()
        };
        let noise = PerlinConfig {
            kind: PerlinKind::Billow,
            octaves: 1,
            frequency: config.noise_frequency,
            amplitude: config.noise_amplitude,
            ..PerlinConfig::default()
        };
        Self {
            ridge_a: Perlin::new(ridge.clone(), parameters.derived("ridgeA").seed),
            ridge_b: Perlin::new(ridge, parameters.derived("ridgeB").seed),
            noise: Perlin::new(noise, parameters.derived("noise").seed),
            world_width: parameters.world_width,
        }
    }
}

impl TerrainSelector for RidgeBlocksSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let x = f64::from(x);
        let y = f64::from(y);
        let warp = f64::from(self.noise.get_wrapped(x, y, self.world_width, 1.0) as f32);
        let a = self.ridge_a.get_wrapped(x + warp, y - warp, self.world_width, 1.0) as f32;
        let b = self.ridge_b.get_wrapped(x - warp, y + warp, self.world_width, 1.0) as f32;
        (a + b) * 0.5
    }
}

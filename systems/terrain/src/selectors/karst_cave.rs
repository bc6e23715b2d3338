//! Layered horizontal caves.

use orbitile_core::{math, static_random_f32, Grid2, IVec2, Perlin, PerlinConfig};
use serde::Deserialize;

use super::{sector_cache::SectorCache, TERRAIN_SECTOR_SIZE};
use crate::{TerrainError, TerrainSelector, TerrainSelectorParameters};

/// Config of [`KarstCaveSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KarstCaveConfig {
    /// Vertical spacing between candidate cave layers.
    pub layer_resolution: i32,
    /// Expected cave layers per row; a candidate layer exists with
    /// probability `layerDensity * layerResolution`.
    pub layer_density: f32,
    /// Rows above and below a sector scanned for layers that reach into it.
    pub buffer_height: i32,
    /// Decision value at which a cave reaches its full height. Clamped to
    /// `[0.001, 1.0]`.
    pub cave_taper_point: f32,
    /// Noise deciding where along a layer a cave exists; positive means cave.
    pub cave_decision: PerlinConfig,
    /// Noise bending each layer vertically.
    pub layer_height_variation: PerlinConfig,
    /// Noise giving the cave height above the layer line.
    pub cave_height_variation: PerlinConfig,
    /// Noise giving the cave depth below the layer line.
    pub cave_floor_variation: PerlinConfig,
    /// Sectors kept in memory.
    pub cache_size: usize,
}

impl Default for KarstCaveConfig {
    fn default() -> Self {
        Self {
            layer_resolution: 20,
            layer_density: 0.02,
            buffer_height: 24,
            cave_taper_point: 0.2,
            cave_decision: PerlinConfig {
                frequency: 0.02,
                ..PerlinConfig::default()
            },
            layer_height_variation: PerlinConfig {
                frequency: 0.02,
                amplitude: 6.0,
                ..PerlinConfig::default()
            },
            cave_height_variation: PerlinConfig {
                frequency: 0.05,
                amplitude: 3.0,
                bias: 6.0,
                ..PerlinConfig::default()
            },
            cave_floor_variation: PerlinConfig {
                frequency: 0.05,
                amplitude: 2.0,
                bias: 3.0,
                ..PerlinConfig::default()
            },
            cache_size: 64,
        }
    }
}

/// Vertical extent of a cave layer in one column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerSlice {
    /// Centre of the cave between floor and ceiling.
    pub midpoint: f32,
    /// Half the distance from floor to ceiling.
    pub half_height: f32,
}

/// Horizontal caves strung along seeded layer lines.
///
/// A cave column's height is scaled by `sin(π/2 · min(d, p) / p)` where `d`
/// is the decision noise and `p` the taper point, so caves close smoothly
/// where the decision noise falls towards zero. Inside a cave the value is
/// the distance to the nearer of floor and ceiling; elsewhere it is `-1`.
#[derive(Debug)]
pub struct KarstCaveSelector {
    layer_resolution: i32,
    layer_chance: f32,
    buffer_height: i32,
    taper_point: f32,
    layer_seed: u64,
    world_width: u32,
    decision: Perlin,
    layer_height: Perlin,
    cave_height: Perlin,
    cave_floor: Perlin,
    cache: SectorCache,
}

impl KarstCaveSelector {
    /// Builds the selector.
    pub fn new(
        config: KarstCaveConfig,
        parameters: TerrainSelectorParameters,
    ) -> Result<Self, TerrainError> {
        if config.layer_resolution < 1 {
            return Err(TerrainError::bad_config(
                "karstcave",
                "layerResolution must be at least 1",
            ));
        }
        if config.buffer_height < 0 {
            return Err(TerrainError::bad_config(
                "karstcave",
                "bufferHeight must not be negative",
            ));
        }
        let taper_point = if config.cave_taper_point.is_nan() {
            1.0
        } else {
            config.cave_taper_point.clamp(0.001, 1.0)
        };
        Ok(Self {
            layer_resolution: config.layer_resolution,
            layer_chance: config.layer_density * config.layer_resolution as f32 * parameters.commonality,
            buffer_height: config.buffer_height,
            taper_point,
            layer_seed: parameters.derived("layers").seed,
            world_width: parameters.world_width,
            decision: Perlin::new(config.cave_decision, parameters.derived("decision").seed),
            layer_height: Perlin::new(
                config.layer_height_variation,
                parameters.derived("layerHeight").seed,
            ),
            cave_height: Perlin::new(
                config.cave_height_variation,
                parameters.derived("caveHeight").seed,
            ),
            cave_floor: Perlin::new(
                config.cave_floor_variation,
                parameters.derived("caveFloor").seed,
            ),
            cache: SectorCache::new(config.cache_size, parameters.world_width),
        })
    }

    /// Taper point after clamping.
    #[must_use]
    pub const fn taper_point(&self) -> f32 {
        self.taper_point
    }

    /// Reports whether a cave layer runs along row `layer_y`.
    #[must_use]
    pub fn layer_exists(&self, layer_y: i32) -> bool {
        layer_y.rem_euclid(self.layer_resolution) == 0
            && static_random_f32(self.layer_seed, &[i64::from(layer_y)]) < self.layer_chance
    }

    /// Decision noise of layer `layer_y` at column `x`.
    #[must_use]
    pub fn decision(&self, layer_y: i32, x: i32) -> f32 {
        self.sample(&self.decision, layer_y, x)
    }

    /// Cave slice of layer `layer_y` at column `x`, if the layer exists and
    /// holds a cave there.
    #[must_use]
    pub fn layer_profile(&self, layer_y: i32, x: i32) -> Option<LayerSlice> {
        if !self.layer_exists(layer_y) {
            return None;
        }
        let decision = self.decision(layer_y, x);
        if decision <= 0.0 {
            return None;
        }
        let taper = math::sinf(
            std::f32::consts::FRAC_PI_2 * decision.min(self.taper_point) / self.taper_point,
        );
        let line = layer_y as f32 + self.sample(&self.layer_height, layer_y, x);
        let ceiling = line + self.sample(&self.cave_height, layer_y, x).max(0.0) * taper;
        let floor = line - self.sample(&self.cave_floor, layer_y, x).max(0.0) * taper;
        Some(LayerSlice {
            midpoint: (ceiling + floor) * 0.5,
            half_height: (ceiling - floor) * 0.5,
        })
    }

    fn sample(&self, perlin: &Perlin, layer_y: i32, x: i32) -> f32 {
        perlin.get_wrapped(f64::from(x), f64::from(layer_y), self.world_width, 1.0) as f32
    }

    fn generate(&self, origin: IVec2) -> Grid2<f32> {
        let size = TERRAIN_SECTOR_SIZE;
        let mut values = Grid2::new(size as usize, size as usize, -1.0_f32);
        let lowest = (origin.y - self.buffer_height).div_euclid(self.layer_resolution)
            * self.layer_resolution;
        let highest = origin.y + size + self.buffer_height;
        let mut layer_y = lowest;
        while layer_y < highest {
            if self.layer_exists(layer_y) {
                for local_x in 0..size {
                    let Some(slice) = self.layer_profile(layer_y, origin.x + local_x) else {
                        continue;
                    };
                    for local_y in 0..size {
                        let distance = (slice.midpoint - (origin.y + local_y) as f32).abs();
                        if distance > slice.half_height {
                            continue;
                        }
                        if let Some(cell) = values.get_mut(local_x as usize, local_y as usize) {
                            *cell = cell.max(slice.half_height - distance);
                        }
                    }
                }
            }
            layer_y += self.layer_resolution;
        }
        values
    }
}

impl TerrainSelector for KarstCaveSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        self.cache.get(x, y, |origin| self.generate(origin))
    }
}

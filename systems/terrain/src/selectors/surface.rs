//! Analytic surface height maps.

use orbitile_core::{math, Perlin, PerlinConfig};
use serde::Deserialize;

use crate::{TerrainSelector, TerrainSelectorParameters};

/// Config of [`FlatSurfaceSelector`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlatSurfaceConfig {
    /// Offset added to the base height.
    pub adjustment: f32,
}

/// Solid below a horizontal surface at the base height.
#[derive(Debug)]
pub struct FlatSurfaceSelector {
    surface: f32,
}

impl FlatSurfaceSelector {
    /// Builds the selector.
    #[must_use]
    pub fn new(config: FlatSurfaceConfig, parameters: TerrainSelectorParameters) -> Self {
        Self {
            surface: parameters.base_height + config.adjustment,
        }
    }
}

impl TerrainSelector for FlatSurfaceSelector {
    fn get(&self, _x: i32, y: i32) -> f32 {
        self.surface - y as f32
    }
}

/// Config of [`IslandSurfaceSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IslandSurfaceConfig {
    /// Height of the island centre above the base height.
    pub island_elevation: f32,
    /// Maximum height of island tops above the centre.
    pub island_height: f32,
    /// Maximum depth of island bottoms below the centre.
    pub island_depth: f32,
    /// Decision value above which islands reach full thickness.
    pub island_taper_point: f32,
    /// Noise deciding where islands exist; positive means island.
    pub island_decision: PerlinConfig,
    /// Noise added to island tops.
    pub island_height_variation: PerlinConfig,
    /// Noise added to island bottoms.
    pub island_depth_variation: PerlinConfig,
}

impl Default for IslandSurfaceConfig {
    fn default() -> Self {
        Self {
            island_elevation: 0.0,
            island_height: 20.0,
            island_depth: 40.0,
            island_taper_point: 0.5,
            island_decision: PerlinConfig {
                frequency: 0.01,
                ..PerlinConfig::default()
            },
            island_height_variation: PerlinConfig {
                frequency: 0.05,
                amplitude: 4.0,
                ..PerlinConfig::default()
            },
            island_depth_variation: PerlinConfig {
                frequency: 0.05,
                amplitude: 8.0,
                ..PerlinConfig::default()
            },
        }
    }
}

/// Floating land masses around the base height.
///
/// Each column decides from noise whether it holds island. Inside an island
/// the thickness ramps up with a sine taper as the decision value climbs to
/// the taper point, so islands thin out towards their edges.
#[derive(Debug)]
pub struct IslandSurfaceSelector {
    center: f32,
    height: f32,
    depth: f32,
    taper_point: f32,
    decision: Perlin,
    height_variation: Perlin,
    depth_variation: Perlin,
    world_width: u32,
}

impl IslandSurfaceSelector {
    /// Builds the selector.
    #[must_use]
    pub fn new(config: IslandSurfaceConfig, parameters: TerrainSelectorParameters) -> Self {
        Self {
            center: parameters.base_height + config.island_elevation,
            height: config.island_height,
            depth: config.island_depth,
            taper_point: config.island_taper_point.clamp(0.001, 1.0),
            decision: Perlin::new(config.island_decision, parameters.derived("decision").seed),
            height_variation: Perlin::new(
                config.island_height_variation,
                parameters.derived("height").seed,
            ),
            depth_variation: Perlin::new(
                config.island_depth_variation,
                parameters.derived("depth").seed,
            ),
            world_width: parameters.world_width,
        }
    }
}

impl TerrainSelector for IslandSurfaceSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let x = f64::from(x);
        let decision = self.decision.get_wrapped(x, 0.0, self.world_width, 1.0) as f32;
        if decision <= 0.0 {
            return -1.0;
        }
        let taper = math::sinf(
            std::f32::consts::FRAC_PI_2 * decision.min(self.taper_point) / self.taper_point,
        );
        let top = self.center
            + (self.height + self.height_variation.get_wrapped(x, 0.0, self.world_width, 1.0) as f32)
                * taper;
        let bottom = self.center
            - (self.depth + self.depth_variation.get_wrapped(x, 0.0, self.world_width, 1.0) as f32)
                * taper;
        let y = y as f32;
        (top - y).min(y - bottom)
    }
}

//! Parametric worm caves.

use orbitile_core::{math, Grid2, IVec2, RandomSource, Vec2};
use serde::Deserialize;

use super::{sector_cache::SectorCache, TERRAIN_SECTOR_SIZE};
use crate::{TerrainError, TerrainSelector, TerrainSelectorParameters};

/// Config of [`WormCaveSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WormCaveConfig {
    /// Inclusive `[min, max]` worms started in each sector.
    pub number_of_worms_per_sector_range: [i32; 2],
    /// `[min, max]` worm radius in tiles.
    pub worm_size_range: [f32; 2],
    /// `[min, max]` worm length in tiles.
    pub worm_length_range: [f32; 2],
    /// Distance over which worm ends narrow to nothing.
    pub worm_taper_distance: f32,
    /// `[min, max]` starting heading in radians.
    pub worm_angle_range: [f32; 2],
    /// Chance per step that the worm picks a new turn rate.
    pub worm_turn_change_chance: f32,
    /// Largest heading change per step in radians.
    pub worm_turn_rate: f32,
    /// Sectors kept in memory.
    pub cache_size: usize,
}

impl Default for WormCaveConfig {
    fn default() -> Self {
        Self {
            number_of_worms_per_sector_range: [0, 2],
            worm_size_range: [2.0, 5.0],
            worm_length_range: [40.0, 120.0],
            worm_taper_distance: 16.0,
            worm_angle_range: [0.0, std::f32::consts::TAU],
            worm_turn_change_chance: 0.1,
            worm_turn_rate: 0.15,
            cache_size: 64,
        }
    }
}

/// Caves carved by random walkers.
///
/// Every sector starts a seeded number of worms. A sector's values are
/// produced by replaying the worms of every sector close enough to reach it,
/// so worms continue across sector boundaries and the horizontal seam.
/// Inside a worm the value is the distance to its edge; elsewhere it is `-1`.
#[derive(Debug)]
pub struct WormCaveSelector {
    config: WormCaveConfig,
    seed: u64,
    commonality: f32,
    world_width: u32,
    reach: i32,
    cache: SectorCache,
}

#[derive(Clone, Copy, Debug)]
struct Worm {
    index: i64,
    start: Vec2,
    angle: f32,
    size: f32,
    length: f32,
}

impl WormCaveSelector {
    /// Builds the selector.
    pub fn new(
        config: WormCaveConfig,
        parameters: TerrainSelectorParameters,
    ) -> Result<Self, TerrainError> {
        let [min_count, max_count] = config.number_of_worms_per_sector_range;
        if min_count < 0 || max_count < min_count {
            return Err(TerrainError::bad_config(
                "wormcave",
                "numberOfWormsPerSectorRange must be a non-negative ascending range",
            ));
        }
        if config.worm_length_range[1] < 0.0 || config.worm_size_range[1] < 0.0 {
            return Err(TerrainError::bad_config(
                "wormcave",
                "worm length and size must not be negative",
            ));
        }
        let extent = config.worm_length_range[1] + config.worm_size_range[1];
        let reach = (extent / TERRAIN_SECTOR_SIZE as f32).ceil() as i32 + 1;
        Ok(Self {
            cache: SectorCache::new(config.cache_size, parameters.world_width),
            seed: parameters.derived("worms").seed,
            commonality: parameters.commonality,
            world_width: parameters.world_width,
            reach,
            config,
        })
    }

    fn wrap_x(&self, x: i32) -> i32 {
        if self.world_width == 0 {
            x
        } else {
            x.rem_euclid(self.world_width as i32)
        }
    }

    fn worms_started_in(&self, sector_origin: IVec2) -> Vec<Worm> {
        let mut random = RandomSource::keyed(
            self.seed,
            &[i64::from(self.wrap_x(sector_origin.x)), i64::from(sector_origin.y)],
        );
        let [min_count, max_count] = self.config.number_of_worms_per_sector_range;
        let count = random.rand_int_range(min_count, max_count);
        let size = TERRAIN_SECTOR_SIZE as f32;
        (0..count)
            .filter_map(|index| {
                let worm = Worm {
                    index: i64::from(index),
                    start: Vec2::new(
                        sector_origin.x as f32 + random.randf() * size,
                        sector_origin.y as f32 + random.randf() * size,
                    ),
                    angle: random.randf_range(
                        self.config.worm_angle_range[0],
                        self.config.worm_angle_range[1],
                    ),
                    size: random.randf_range(
                        self.config.worm_size_range[0],
                        self.config.worm_size_range[1],
                    ),
                    length: random.randf_range(
                        self.config.worm_length_range[0],
                        self.config.worm_length_range[1],
                    ),
                };
                random.bernoulli(self.commonality).then_some(worm)
            })
            .collect()
    }

    fn generate(&self, origin: IVec2) -> Grid2<f32> {
        let size = TERRAIN_SECTOR_SIZE as usize;
        let mut values = Grid2::new(size, size, -1.0_f32);
        for dy in -self.reach..=self.reach {
            for dx in -self.reach..=self.reach {
                let source = origin + IVec2::new(dx, dy) * TERRAIN_SECTOR_SIZE;
                for worm in self.worms_started_in(source) {
                    self.carve(&mut values, origin, worm, source);
                }
            }
        }
        values
    }

    fn carve(&self, values: &mut Grid2<f32>, origin: IVec2, worm: Worm, source: IVec2) {
        let mut random = RandomSource::keyed(
            self.seed,
            &[
                i64::from(self.wrap_x(source.x)),
                i64::from(source.y),
                worm.index,
            ],
        );
        let mut position = worm.start;
        let mut angle = worm.angle;
        let mut turn = 0.0_f32;
        let steps = worm.length.max(0.0) as i32;
        for step in 0..=steps {
            let from_end = step.min(steps - step) as f32;
            let taper = if self.config.worm_taper_distance > 0.0 {
                (from_end / self.config.worm_taper_distance).min(1.0)
            } else {
                1.0
            };
            paint_disc(values, origin, position, worm.size * taper);

            if random.bernoulli(self.config.worm_turn_change_chance) {
                turn = random.randf_range(-self.config.worm_turn_rate, self.config.worm_turn_rate);
            }
            angle += turn;
            position += Vec2::new(math::cosf(angle), math::sinf(angle));
        }
    }
}

fn paint_disc(values: &mut Grid2<f32>, origin: IVec2, center: Vec2, radius: f32) {
    if radius <= 0.0 {
        return;
    }
    let size = TERRAIN_SECTOR_SIZE;
    let local = center - origin.as_vec2();
    let min_x = ((local.x - radius).floor() as i32).max(0);
    let max_x = ((local.x + radius).ceil() as i32).min(size - 1);
    let min_y = ((local.y - radius).floor() as i32).max(0);
    let max_y = ((local.y + radius).ceil() as i32).min(size - 1);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let distance = (Vec2::new(x as f32, y as f32) - local).length();
            let depth = radius - distance;
            if depth < 0.0 {
                continue;
            }
            if let Some(cell) = values.get_mut(x as usize, y as usize) {
                *cell = cell.max(depth);
            }
        }
    }
}

impl TerrainSelector for WormCaveSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        self.cache.get(x, y, |origin| self.generate(origin))
    }
}

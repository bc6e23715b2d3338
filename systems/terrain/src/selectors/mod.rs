//! Selector implementations, one module per kind.

pub mod cache;
pub mod constant;
pub mod displacement;
pub mod karst_cave;
pub mod mix;
pub mod perlin;
pub mod reduce;
pub mod ridge_blocks;
pub mod rotate;
mod sector_cache;
pub mod surface;
pub mod worm_cave;

/// Side of the square sectors that cave selectors generate at once.
pub const TERRAIN_SECTOR_SIZE: i32 = 64;

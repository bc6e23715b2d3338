#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Core primitives shared across the Orbitile world simulation.
//!
//! This crate holds the leaf building blocks every other crate leans on:
//! integer and float geometry on a horizontally wrapping world, deterministic
//! random sources and Perlin noise, ordered caches, the variable-length byte
//! codec used for replication and chunk deltas, and the celestial coordinate
//! that addresses systems, planets, and satellites. Nothing here reads
//! process-global state, so every value derived from a seed is reproducible
//! across sessions and machines.

pub mod cache;
pub mod celestial_coordinate;
pub mod codec;
pub mod geometry;
pub mod grid;
pub mod math;
pub mod perlin;
pub mod random;

pub use cache::{LruCache, TtlCache};
pub use celestial_coordinate::{CelestialCoordinate, CoordinateParseError};
pub use codec::{ByteReader, ByteWriter, CodecError};
pub use geometry::{Line2F, RectF, RectI, WorldGeometry};
pub use grid::Grid2;
pub use perlin::{Perlin, PerlinConfig, PerlinKind};
pub use random::{derive_seed, static_random_f32, static_random_i32_range, static_random_u64, RandomSource};

pub use glam::{IVec2, IVec3, Vec2};

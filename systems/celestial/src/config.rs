//! Data-driven generation tables and runtime tuning.

use std::{collections::BTreeMap, path::PathBuf};

use orbitile_core::PerlinConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CelestialError;

const BUILTIN_GENERATION: &str = include_str!("../assets/celestial.json");

/// Weighted pool entry: `[weight, value]`.
pub type Weighted<T> = (f32, T);

/// Generation tables for the star map.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelestialGenerationConfig {
    /// Side length of a square chunk in system locations.
    pub chunk_size: i32,
    /// Inclusive range of valid x and y system locations.
    pub xy_coord_range: [i32; 2],
    /// Inclusive range of system z values.
    pub z_coord_range: [i32; 2],
    /// Chance that any single location holds a system.
    pub system_probability: f32,
    /// Noise field binned into system types.
    pub system_type_perlin: PerlinConfig,
    /// `[threshold, type]` pairs sorted by threshold.
    pub system_type_bins: Vec<Weighted<String>>,
    /// System types by name.
    pub system_types: BTreeMap<String, SystemTypeConfig>,
    /// Planetary body types by name.
    pub planetary_types: BTreeMap<String, PlanetaryTypeConfig>,
    /// Satellite types by name.
    pub satellite_types: BTreeMap<String, SatelliteTypeConfig>,
    /// Weighted system name prefixes. Empty strings are skipped.
    #[serde(default)]
    pub system_prefix_names: Vec<Weighted<String>>,
    /// Weighted system name roots.
    pub system_names: Vec<Weighted<String>>,
    /// Weighted system name suffixes. Empty strings are skipped.
    #[serde(default)]
    pub system_suffix_names: Vec<Weighted<String>>,
    /// Planet name suffix per orbit, starting at orbit 1.
    #[serde(default)]
    pub planetary_suffixes: Vec<String>,
    /// Satellite name suffix per orbit, starting at orbit 1.
    #[serde(default)]
    pub satellite_suffixes: Vec<String>,
    /// World dimensions by size name.
    pub world_sizes: BTreeMap<String, [u32; 2]>,
    /// Range of hue shifts given to terrestrial worlds.
    #[serde(default)]
    pub hue_shift_range: [f32; 2],
    /// Constellation line settings.
    #[serde(default)]
    pub constellation: ConstellationConfig,
}

/// A kind of star and the orbits around it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTypeConfig {
    /// Parameters shared by every system of this type.
    #[serde(default)]
    pub base_parameters: Value,
    /// One entry is picked and merged over the base.
    #[serde(default)]
    pub variation_parameters: Vec<Value>,
    /// Radial shells of orbits.
    #[serde(default)]
    pub orbit_regions: Vec<OrbitRegion>,
}

/// A shell of orbits sharing one body pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbitRegion {
    /// Label for the region.
    pub region_name: String,
    /// Inclusive orbit numbers in this region.
    pub orbit_range: [i32; 2],
    /// Chance that an orbit holds a planetary body.
    pub body_probability: f32,
    /// Weighted planetary body types.
    pub planetary_types: Vec<Weighted<String>>,
    /// Weighted satellite types for bodies in this region.
    #[serde(default)]
    pub satellite_types: Vec<Weighted<String>>,
}

/// A kind of planetary body.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetaryTypeConfig {
    /// Chance that each satellite orbit is occupied.
    #[serde(default)]
    pub satellite_probability: f32,
    /// Number of satellite orbits considered.
    #[serde(default)]
    pub max_satellite_count: u32,
    /// Parameters shared by every body of this type.
    #[serde(default)]
    pub base_parameters: Value,
    /// One entry is picked and merged over the base.
    #[serde(default)]
    pub variation_parameters: Vec<Value>,
    /// Present when the body can be visited.
    #[serde(default)]
    pub visitable: Option<VisitableTemplate>,
}

/// A kind of satellite.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatelliteTypeConfig {
    /// Parameters shared by every satellite of this type.
    #[serde(default)]
    pub base_parameters: Value,
    /// One entry is picked and merged over the base.
    #[serde(default)]
    pub variation_parameters: Vec<Value>,
    /// Present when the satellite can be visited.
    #[serde(default)]
    pub visitable: Option<VisitableTemplate>,
}

/// Shape of the world generated for a visitable body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisitableKind {
    /// Surface world with biomes.
    Terrestrial,
    /// Floating rocks without a surface.
    Asteroids,
    /// A single dungeon in empty space.
    FloatingDungeon,
    /// Cannot be landed on.
    GasGiant,
}

/// Ranges a visitable body draws its world parameters from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitableTemplate {
    /// World shape.
    pub kind: VisitableKind,
    /// Type name carried into the world parameters.
    pub type_name: String,
    /// Key into the world size table.
    pub size: String,
    /// Inclusive threat level range.
    #[serde(default)]
    pub threat_range: [f32; 2],
    /// Inclusive gravity range.
    #[serde(default)]
    pub gravity_range: [f32; 2],
    /// Whether the world lacks breathable air.
    #[serde(default)]
    pub airless: bool,
    /// Candidate primary biomes for terrestrial worlds.
    #[serde(default)]
    pub biomes: Vec<String>,
    /// Candidate primary liquids for terrestrial worlds.
    #[serde(default)]
    pub liquids: Vec<String>,
    /// Candidate dungeons for floating dungeon worlds.
    #[serde(default)]
    pub dungeons: Vec<String>,
}

/// Constellation line placement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstellationConfig {
    /// Lines accepted per chunk at most.
    pub max_lines: usize,
    /// Candidate star pairs drawn per chunk.
    pub candidate_tries: usize,
    /// Shortest accepted line.
    pub min_line_length: f32,
    /// Longest accepted line.
    pub max_line_length: f32,
    /// Minimum distance between a candidate's midpoint and accepted lines.
    pub min_line_separation: f32,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            max_lines: 0,
            candidate_tries: 0,
            min_line_length: 0.0,
            max_line_length: f32::MAX,
            min_line_separation: 0.0,
        }
    }
}

impl CelestialGenerationConfig {
    /// The embedded default tables.
    pub fn builtin() -> Result<Self, CelestialError> {
        Self::from_json(BUILTIN_GENERATION)
    }

    /// Parses and validates generation tables.
    pub fn from_json(text: &str) -> Result<Self, CelestialError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every table reference resolves.
    pub fn validate(&self) -> Result<(), CelestialError> {
        if self.chunk_size <= 0 {
            return Err(CelestialError::invalid("chunkSize must be positive"));
        }
        if self.xy_coord_range[0] > self.xy_coord_range[1]
            || self.z_coord_range[0] > self.z_coord_range[1]
        {
            return Err(CelestialError::invalid("coordinate ranges must be ordered"));
        }
        if self.system_type_bins.is_empty() {
            return Err(CelestialError::invalid("systemTypeBins is empty"));
        }
        if self.system_names.is_empty() {
            return Err(CelestialError::invalid("systemNames is empty"));
        }
        for (_, system_type) in &self.system_type_bins {
            if !self.system_types.contains_key(system_type) {
                return Err(CelestialError::invalid(format!(
                    "system type bin references unknown type '{system_type}'"
                )));
            }
        }
        for (name, system_type) in &self.system_types {
            for region in &system_type.orbit_regions {
                if region.orbit_range[0] < 1 || region.orbit_range[0] > region.orbit_range[1] {
                    return Err(CelestialError::invalid(format!(
                        "orbit region '{}' of '{name}' has a bad orbit range",
                        region.region_name
                    )));
                }
                for (_, planet) in &region.planetary_types {
                    if !self.planetary_types.contains_key(planet) {
                        return Err(CelestialError::invalid(format!(
                            "orbit region '{}' references unknown planetary type '{planet}'",
                            region.region_name
                        )));
                    }
                }
                for (_, satellite) in &region.satellite_types {
                    if !self.satellite_types.contains_key(satellite) {
                        return Err(CelestialError::invalid(format!(
                            "orbit region '{}' references unknown satellite type '{satellite}'",
                            region.region_name
                        )));
                    }
                }
            }
        }
        let templates = self
            .planetary_types
            .values()
            .filter_map(|planet| planet.visitable.as_ref())
            .chain(
                self.satellite_types
                    .values()
                    .filter_map(|satellite| satellite.visitable.as_ref()),
            );
        for template in templates {
            if !self.world_sizes.contains_key(&template.size) {
                return Err(CelestialError::invalid(format!(
                    "visitable '{}' references unknown world size '{}'",
                    template.type_name, template.size
                )));
            }
        }
        Ok(())
    }
}

/// Runtime tuning for master and slave databases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CelestialDatabaseConfig {
    /// Seed every chunk derives from.
    pub seed: u64,
    /// Milliseconds an untouched chunk stays in memory.
    pub chunk_time_to_live_ms: u64,
    /// Chunks kept in memory at most.
    pub max_cached_chunks: usize,
    /// Milliseconds between master commits.
    pub commit_interval_ms: u64,
    /// Milliseconds between cache cleanups.
    pub cleanup_interval_ms: u64,
    /// Milliseconds before an unanswered slave request may be re-sent.
    pub request_timeout_ms: u64,
    /// Chunk store used by the master; `None` keeps chunks in memory only.
    pub database_path: Option<PathBuf>,
}

impl Default for CelestialDatabaseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_time_to_live_ms: 60_000,
            max_cached_chunks: 256,
            commit_interval_ms: 5_000,
            cleanup_interval_ms: 10_000,
            request_timeout_ms: 10_000,
            database_path: None,
        }
    }
}

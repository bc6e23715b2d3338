#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Star-map generation and serving.
//!
//! The map is divided into square chunks of system locations. A
//! [`CelestialMasterDatabase`] generates chunks just in time from a seed and
//! a set of JSON tables, caches them with a time-to-live, and persists them
//! to a [`orbitile_storage::BTreeDatabase`]. A [`CelestialSlaveDatabase`]
//! holds a partial mirror, answering `None` for anything it has not yet
//! received and queueing requests for the master.

mod chunk;
mod clock;
mod config;
mod error;
mod generation;
mod master;
mod parameters;
mod protocol;
mod slave;

use std::collections::BTreeSet;

use orbitile_core::{CelestialCoordinate, RectI};

pub use chunk::{
    chunk_index_for, chunk_indices_for, CelestialChunk, CelestialPlanet, CelestialSystemObjects,
    ConstellationLine,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    CelestialDatabaseConfig, CelestialGenerationConfig, ConstellationConfig, OrbitRegion,
    PlanetaryTypeConfig, SatelliteTypeConfig, SystemTypeConfig, VisitableKind, VisitableTemplate,
    Weighted,
};
pub use error::CelestialError;
pub use generation::CelestialGenerator;
pub use master::{chunk_key, CelestialMasterDatabase, CHUNK_KEY_SIZE, CHUNK_STORE_IDENTIFIER};
pub use parameters::{CelestialParameters, VisitableCommon, VisitableWorldParameters};
pub use protocol::{
    decode_requests, decode_responses, encode_requests, encode_responses, CelestialRequest,
    CelestialResponse,
};
pub use slave::CelestialSlaveDatabase;

/// Queries shared by master and slave databases.
///
/// `None` means the answer is not available: either the body does not exist
/// or, on a slave, the data has not arrived yet.
pub trait CelestialDatabase {
    /// Parameters of a system, planet, or satellite.
    fn parameters(&self, coordinate: &CelestialCoordinate) -> Option<CelestialParameters>;

    /// Orbit numbers occupied directly under `coordinate`.
    fn child_orbits(&self, coordinate: &CelestialCoordinate) -> Option<Vec<i32>>;

    /// Systems whose location falls in `region`, optionally limited to
    /// system type names.
    fn scan_systems(
        &self,
        region: RectI,
        include_types: Option<&BTreeSet<String>>,
    ) -> Vec<CelestialCoordinate>;

    /// Constellation lines crossing `region`.
    fn scan_constellation_lines(&self, region: RectI) -> Vec<ConstellationLine>;

    /// Reports whether every chunk overlapping `region` is available.
    fn scan_region_fully_loaded(&self, region: RectI) -> bool;

    /// Display name of a body.
    fn name(&self, coordinate: &CelestialCoordinate) -> Option<String> {
        self.parameters(coordinate).map(|parameters| parameters.name)
    }

    /// Reports whether anything orbits `coordinate`.
    fn has_children(&self, coordinate: &CelestialCoordinate) -> Option<bool> {
        self.child_orbits(coordinate).map(|orbits| !orbits.is_empty())
    }

    /// Coordinates of every body orbiting `coordinate`.
    fn children(&self, coordinate: &CelestialCoordinate) -> Option<Vec<CelestialCoordinate>> {
        self.child_orbits(coordinate).map(|orbits| {
            orbits
                .into_iter()
                .filter_map(|orbit| coordinate.child(orbit))
                .collect()
        })
    }
}

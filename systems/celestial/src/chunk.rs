//! Generated star-map chunks and the queries answered from them.

use std::collections::{BTreeMap, BTreeSet};

use orbitile_core::{CelestialCoordinate, IVec2, IVec3, Line2F, RectI, Vec2};
use serde::{Deserialize, Serialize};

use crate::CelestialParameters;

/// A constellation segment between two system locations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstellationLine {
    /// First star.
    pub a: IVec2,
    /// Second star.
    pub b: IVec2,
}

impl ConstellationLine {
    /// Float segment for geometric tests.
    #[must_use]
    pub fn to_line(&self) -> Line2F {
        Line2F::new(self.a.as_vec2(), self.b.as_vec2())
    }
}

/// A planet and its satellites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialPlanet {
    /// Parameters of the planet itself.
    pub planet_parameters: CelestialParameters,
    /// Satellites by orbit number.
    pub satellite_parameters: BTreeMap<i32, CelestialParameters>,
}

/// Every body orbiting one system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialSystemObjects {
    /// Location of the system.
    pub system_location: IVec3,
    /// Planets by orbit number.
    pub planets: BTreeMap<i32, CelestialPlanet>,
}

impl CelestialSystemObjects {
    /// A system with nothing in orbit.
    #[must_use]
    pub fn empty(system_location: IVec3) -> Self {
        Self {
            system_location,
            planets: BTreeMap::new(),
        }
    }

    /// Planet or satellite of this system at `coordinate`.
    #[must_use]
    pub fn body(&self, coordinate: &CelestialCoordinate) -> Option<&CelestialParameters> {
        if coordinate.is_system() || coordinate.is_null() {
            return None;
        }
        let planet = self.planets.get(&coordinate.planet_orbit())?;
        if coordinate.is_planetary_body() {
            return Some(&planet.planet_parameters);
        }
        planet.satellite_parameters.get(&coordinate.satellite_orbit())
    }

    /// Orbits directly under `coordinate`: the planets of the system, the
    /// satellites of a planet, or nothing for a satellite.
    #[must_use]
    pub fn child_orbits(&self, coordinate: &CelestialCoordinate) -> Option<Vec<i32>> {
        if coordinate.is_system() {
            return Some(self.planets.keys().copied().collect());
        }
        let _ = self.body(coordinate)?;
        if coordinate.is_satellite_body() {
            return Some(Vec::new());
        }
        self.planets
            .get(&coordinate.planet_orbit())
            .map(|planet| planet.satellite_parameters.keys().copied().collect())
    }
}

/// Square block of the star map generated as a unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CelestialChunk {
    /// Chunk coordinates, in units of the chunk size.
    pub chunk_index: IVec2,
    /// Constellation lines among this chunk's systems.
    pub constellations: Vec<ConstellationLine>,
    /// System parameters keyed by system coordinate.
    pub system_parameters: BTreeMap<CelestialCoordinate, CelestialParameters>,
    /// Orbiting bodies keyed by system coordinate, filled in as systems are
    /// first asked about.
    pub system_objects: BTreeMap<CelestialCoordinate, CelestialSystemObjects>,
}

/// Result of answering a coordinate query from a single chunk.
#[derive(Debug, PartialEq)]
pub(crate) enum ChunkLookup<T> {
    Found(T),
    /// The body does not exist.
    Absent,
    /// The system exists but its objects are not in this chunk copy.
    ObjectsMissing,
}

impl CelestialChunk {
    /// Copy of this chunk with every system's objects stripped.
    #[must_use]
    pub fn without_objects(&self) -> Self {
        Self {
            chunk_index: self.chunk_index,
            constellations: self.constellations.clone(),
            system_parameters: self.system_parameters.clone(),
            system_objects: BTreeMap::new(),
        }
    }

    /// Objects of the system at `location`, when present.
    #[must_use]
    pub fn system_objects_at(&self, location: IVec3) -> Option<&CelestialSystemObjects> {
        self.system_objects.get(&CelestialCoordinate::system(location))
    }

    pub(crate) fn parameters(
        &self,
        coordinate: &CelestialCoordinate,
    ) -> ChunkLookup<&CelestialParameters> {
        if coordinate.is_null() {
            return ChunkLookup::Absent;
        }
        let system = coordinate.system_coordinate();
        let Some(system_parameters) = self.system_parameters.get(&system) else {
            return ChunkLookup::Absent;
        };
        if coordinate.is_system() {
            return ChunkLookup::Found(system_parameters);
        }
        match self.system_objects.get(&system) {
            Some(objects) => objects.body(coordinate).map_or(ChunkLookup::Absent, ChunkLookup::Found),
            None => ChunkLookup::ObjectsMissing,
        }
    }

    pub(crate) fn child_orbits(&self, coordinate: &CelestialCoordinate) -> ChunkLookup<Vec<i32>> {
        match self.parameters(coordinate) {
            ChunkLookup::Found(_) => {}
            ChunkLookup::Absent => return ChunkLookup::Absent,
            ChunkLookup::ObjectsMissing => return ChunkLookup::ObjectsMissing,
        }
        match self.system_objects.get(&coordinate.system_coordinate()) {
            Some(objects) => objects
                .child_orbits(coordinate)
                .map_or(ChunkLookup::Absent, ChunkLookup::Found),
            None => ChunkLookup::ObjectsMissing,
        }
    }

    /// Systems whose x/y location falls within `region`, optionally limited
    /// to a set of type names.
    pub fn systems_in<'a>(
        &'a self,
        region: &'a RectI,
        include_types: Option<&'a BTreeSet<String>>,
    ) -> impl Iterator<Item = CelestialCoordinate> + 'a {
        self.system_parameters
            .iter()
            .filter(move |(coordinate, _)| region.contains(coordinate.location().truncate()))
            .filter(move |(_, parameters)| match include_types {
                Some(types) => parameters.type_name().is_some_and(|name| types.contains(name)),
                None => true,
            })
            .map(|(coordinate, _)| *coordinate)
    }

    /// Constellation lines crossing `region`.
    pub fn constellations_in<'a>(
        &'a self,
        region: &'a RectI,
    ) -> impl Iterator<Item = ConstellationLine> + 'a {
        let bounds = region.to_rect_f();
        self.constellations
            .iter()
            .filter(move |line| line.to_line().intersects_rect(&bounds))
            .copied()
    }
}

/// Index of the chunk holding the system location `location`.
#[must_use]
pub fn chunk_index_for(location: IVec2, chunk_size: i32) -> IVec2 {
    IVec2::new(
        location.x.div_euclid(chunk_size),
        location.y.div_euclid(chunk_size),
    )
}

/// Indices of every chunk overlapping `region`, row by row.
#[must_use]
pub fn chunk_indices_for(region: &RectI, chunk_size: i32) -> Vec<IVec2> {
    if region.is_empty() {
        return Vec::new();
    }
    let low = chunk_index_for(region.min(), chunk_size);
    let high = chunk_index_for(region.max() - IVec2::ONE, chunk_size);
    let mut indices = Vec::new();
    for y in low.y..=high.y {
        for x in low.x..=high.x {
            indices.push(IVec2::new(x, y));
        }
    }
    indices
}

/// Float midpoint of a line, used for separation tests.
pub(crate) fn midpoint(line: &ConstellationLine) -> Vec2 {
    (line.a.as_vec2() + line.b.as_vec2()) * 0.5
}

//! Authoritative just-in-time star-map generator.

use std::{
    collections::BTreeSet,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use orbitile_core::{CelestialCoordinate, IVec2, IVec3, RandomSource, RectI, TtlCache};
use orbitile_storage::BTreeDatabase;

use crate::{
    chunk::{chunk_index_for, chunk_indices_for, ChunkLookup},
    CelestialChunk, CelestialDatabase, CelestialDatabaseConfig, CelestialError,
    CelestialGenerationConfig, CelestialGenerator, CelestialParameters, CelestialRequest,
    CelestialResponse, CelestialSystemObjects, Clock, ConstellationLine, MonotonicClock,
};

/// Content identifier written into the chunk store header.
pub const CHUNK_STORE_IDENTIFIER: &str = "Celestial2";
/// Bytes in a chunk store key: big-endian biased x then y.
pub const CHUNK_KEY_SIZE: usize = 8;

struct MasterState {
    chunks: TtlCache<IVec2, Arc<CelestialChunk>>,
    database: Option<BTreeDatabase>,
    last_commit: u64,
    last_cleanup: u64,
}

/// Generates chunks on demand, caches them, and persists them.
///
/// All methods take `&self`; a single mutex guards the cache and the store,
/// and is released while a chunk is being generated.
pub struct CelestialMasterDatabase {
    config: CelestialDatabaseConfig,
    generator: CelestialGenerator,
    clock: Arc<dyn Clock>,
    state: Mutex<MasterState>,
}

impl CelestialMasterDatabase {
    /// Creates a master and opens `config.database_path` when set.
    pub fn new(
        config: CelestialDatabaseConfig,
        generation: CelestialGenerationConfig,
    ) -> Result<Self, CelestialError> {
        let generator = CelestialGenerator::new(generation, config.seed)?;
        let database = match &config.database_path {
            Some(path) => Some(open_chunk_store(path)?),
            None => None,
        };
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let now = clock.millis();
        let state = MasterState {
            chunks: TtlCache::new(config.chunk_time_to_live_ms, config.max_cached_chunks),
            database,
            last_commit: now,
            last_cleanup: now,
        };
        Ok(Self {
            config,
            generator,
            clock,
            state: Mutex::new(state),
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let now = clock.millis();
        self.clock = clock;
        {
            let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.last_commit = now;
            state.last_cleanup = now;
        }
        self
    }

    /// Attaches a file-backed chunk store, replacing any previous one.
    pub fn open_database(&self, path: &Path) -> Result<(), CelestialError> {
        let database = open_chunk_store(path)?;
        self.lock().database = Some(database);
        Ok(())
    }

    /// Attaches an already opened chunk store.
    pub fn attach_database(&self, database: BTreeDatabase) {
        self.lock().database = Some(database);
    }

    /// Detaches and returns the chunk store.
    pub fn take_database(&self) -> Option<BTreeDatabase> {
        self.lock().database.take()
    }

    /// Runtime tuning in use.
    #[must_use]
    pub fn config(&self) -> &CelestialDatabaseConfig {
        &self.config
    }

    /// Generator in use.
    #[must_use]
    pub fn generator(&self) -> &CelestialGenerator {
        &self.generator
    }

    /// Number of chunks currently in memory.
    #[must_use]
    pub fn cached_chunk_count(&self) -> usize {
        self.lock().chunks.len()
    }

    /// Returns chunk `index`, loading or generating it when needed.
    pub fn chunk(&self, index: IVec2) -> Arc<CelestialChunk> {
        let now = self.clock.millis();
        {
            let mut state = self.lock();
            if let Some(chunk) = state.chunks.get(&index, now) {
                return Arc::clone(chunk);
            }
            if let Some(chunk) = load_stored_chunk(state.database.as_ref(), index) {
                let chunk = Arc::new(chunk);
                let _ = state.chunks.insert(index, Arc::clone(&chunk), now);
                return chunk;
            }
        }

        let generated = Arc::new(self.generator.generate_chunk(index));

        let mut state = self.lock();
        if let Some(chunk) = state.chunks.get(&index, now) {
            return Arc::clone(chunk);
        }
        if let Some(database) = state.database.as_mut() {
            let stored = bincode::serialize(generated.as_ref())
                .map_err(CelestialError::from)
                .and_then(|bytes| {
                    database
                        .insert(&chunk_key(index), &bytes)
                        .map_err(CelestialError::from)
                });
            if let Err(error) = stored {
                log::warn!("failed to store celestial chunk {index}: {error}");
            }
        }
        let _ = state.chunks.insert(index, Arc::clone(&generated), now);
        generated
    }

    fn chunk_for_location(&self, location: IVec3) -> Arc<CelestialChunk> {
        self.chunk(chunk_index_for(location.truncate(), self.generator.chunk_size()))
    }

    /// Planets and satellites of the system at `location`.
    ///
    /// They are laid out the first time they are asked for and kept in the
    /// cached chunk. Objects are not written to the chunk store; they follow
    /// from the system parameters.
    pub fn system_objects(&self, location: IVec3) -> Option<CelestialSystemObjects> {
        let index = chunk_index_for(location.truncate(), self.generator.chunk_size());
        let system = CelestialCoordinate::system(location);
        let chunk = self.chunk(index);
        if let Some(objects) = chunk.system_objects.get(&system) {
            return Some(objects.clone());
        }
        let objects = self.generator.system_objects(chunk.system_parameters.get(&system)?);
        drop(chunk);

        let now = self.clock.millis();
        let mut state = self.lock();
        if let Some(mut cached) = state.chunks.remove(&index) {
            let _ = Arc::make_mut(&mut cached)
                .system_objects
                .entry(system)
                .or_insert_with(|| objects.clone());
            let _ = state.chunks.insert(index, cached, now);
        }
        Some(objects)
    }

    /// Answers slave requests in order.
    pub fn respond_to_requests(&self, requests: &[CelestialRequest]) -> Vec<CelestialResponse> {
        requests
            .iter()
            .map(|request| match request {
                CelestialRequest::Chunk(index) => {
                    CelestialResponse::Chunk(self.chunk(*index).without_objects())
                }
                CelestialRequest::System(location) => {
                    let objects = self
                        .system_objects(*location)
                        .unwrap_or_else(|| CelestialSystemObjects::empty(*location));
                    CelestialResponse::System(*location, objects)
                }
            })
            .collect()
    }

    /// Commits pending chunk writes to the store.
    pub fn commit(&self) -> Result<(), CelestialError> {
        let mut state = self.lock();
        state.last_commit = self.clock.millis();
        if let Some(database) = state.database.as_mut() {
            database.commit()?;
        }
        Ok(())
    }

    /// Drops chunks untouched for longer than the time-to-live.
    pub fn cleanup(&self, now: u64) {
        let mut state = self.lock();
        let before = state.chunks.len();
        state.chunks.cleanup(now);
        state.last_cleanup = now;
        let dropped = before - state.chunks.len();
        if dropped > 0 {
            log::debug!("dropped {dropped} expired celestial chunks");
        }
    }

    /// Runs the commit and cleanup timers.
    pub fn update(&self) {
        let now = self.clock.millis();
        let (commit_due, cleanup_due) = {
            let state = self.lock();
            (
                now.saturating_sub(state.last_commit) >= self.config.commit_interval_ms,
                now.saturating_sub(state.last_cleanup) >= self.config.cleanup_interval_ms,
            )
        };
        if commit_due {
            if let Err(error) = self.commit() {
                log::warn!("celestial commit failed, retrying next interval: {error}");
            }
        }
        if cleanup_due {
            self.cleanup(now);
        }
    }

    /// Searches random locations within `spatial_range` of the origin for a
    /// visitable planet or satellite accepted by `filter`.
    pub fn find_random_world(
        &self,
        tries: usize,
        spatial_range: i32,
        mut filter: impl FnMut(&CelestialParameters) -> bool,
        seed: u64,
    ) -> Option<CelestialCoordinate> {
        let mut random = RandomSource::new(seed);
        let range = spatial_range.max(0);
        for _ in 0..tries {
            let location = IVec2::new(
                random.rand_int_range(-range, range),
                random.rand_int_range(-range, range),
            );
            let chunk = self.chunk(chunk_index_for(location, self.generator.chunk_size()));
            let mut systems: Vec<IVec3> = chunk
                .system_parameters
                .keys()
                .map(CelestialCoordinate::location)
                .collect();
            drop(chunk);
            random.shuffle(&mut systems);
            for system in systems {
                let Some(objects) = self.system_objects(system) else {
                    continue;
                };
                let bodies = objects.planets.values().flat_map(|planet| {
                    std::iter::once(&planet.planet_parameters)
                        .chain(planet.satellite_parameters.values())
                });
                for body in bodies {
                    if body.is_visitable() && filter(body) {
                        return Some(body.coordinate);
                    }
                }
            }
        }
        None
    }

    fn lock(&self) -> MutexGuard<'_, MasterState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CelestialDatabase for CelestialMasterDatabase {
    fn parameters(&self, coordinate: &CelestialCoordinate) -> Option<CelestialParameters> {
        if coordinate.is_null() {
            return None;
        }
        match self.chunk_for_location(coordinate.location()).parameters(coordinate) {
            ChunkLookup::Found(parameters) => Some(parameters.clone()),
            ChunkLookup::Absent => None,
            ChunkLookup::ObjectsMissing => self
                .system_objects(coordinate.location())?
                .body(coordinate)
                .cloned(),
        }
    }

    fn child_orbits(&self, coordinate: &CelestialCoordinate) -> Option<Vec<i32>> {
        if coordinate.is_null() {
            return None;
        }
        match self.chunk_for_location(coordinate.location()).child_orbits(coordinate) {
            ChunkLookup::Found(orbits) => Some(orbits),
            ChunkLookup::Absent => None,
            ChunkLookup::ObjectsMissing => self
                .system_objects(coordinate.location())?
                .child_orbits(coordinate),
        }
    }

    fn scan_systems(
        &self,
        region: RectI,
        include_types: Option<&BTreeSet<String>>,
    ) -> Vec<CelestialCoordinate> {
        chunk_indices_for(&region, self.generator.chunk_size())
            .into_iter()
            .flat_map(|index| {
                self.chunk(index)
                    .systems_in(&region, include_types)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn scan_constellation_lines(&self, region: RectI) -> Vec<ConstellationLine> {
        chunk_indices_for(&region, self.generator.chunk_size())
            .into_iter()
            .flat_map(|index| self.chunk(index).constellations_in(&region).collect::<Vec<_>>())
            .collect()
    }

    fn scan_region_fully_loaded(&self, _region: RectI) -> bool {
        true
    }
}

fn open_chunk_store(path: &Path) -> Result<BTreeDatabase, CelestialError> {
    Ok(BTreeDatabase::open(
        path,
        CHUNK_STORE_IDENTIFIER,
        CHUNK_KEY_SIZE,
    )?)
}

fn load_stored_chunk(database: Option<&BTreeDatabase>, index: IVec2) -> Option<CelestialChunk> {
    let bytes = match database?.get(&chunk_key(index)) {
        Ok(bytes) => bytes?,
        Err(error) => {
            log::warn!("failed to read celestial chunk {index}: {error}");
            return None;
        }
    };
    match bincode::deserialize(&bytes) {
        Ok(chunk) => Some(chunk),
        Err(error) => {
            log::warn!("discarding undecodable celestial chunk {index}: {error}");
            None
        }
    }
}

/// Store key of chunk `index`; sorts chunks by x then y.
#[must_use]
pub fn chunk_key(index: IVec2) -> [u8; CHUNK_KEY_SIZE] {
    let mut key = [0_u8; CHUNK_KEY_SIZE];
    key[..4].copy_from_slice(&((index.x as u32) ^ 0x8000_0000).to_be_bytes());
    key[4..].copy_from_slice(&((index.y as u32) ^ 0x8000_0000).to_be_bytes());
    key
}

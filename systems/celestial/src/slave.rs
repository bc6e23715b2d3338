//! Read-only mirror that fills itself from a master.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
};

use orbitile_core::{CelestialCoordinate, IVec2, RectI, TtlCache};

use crate::{
    chunk::{chunk_index_for, chunk_indices_for, ChunkLookup},
    CelestialChunk, CelestialDatabase, CelestialDatabaseConfig, CelestialParameters,
    CelestialRequest, CelestialResponse, Clock, ConstellationLine, MonotonicClock,
};

struct PendingRequest {
    request: CelestialRequest,
    /// Time the request was pulled for sending; `None` until then.
    sent: Option<u64>,
}

struct SlaveState {
    chunks: TtlCache<IVec2, Arc<CelestialChunk>>,
    pending: Vec<PendingRequest>,
}

/// Cache of master chunks. Queries for missing data return `None` and queue
/// a request; [`pull_requests`](Self::pull_requests) and
/// [`push_responses`](Self::push_responses) carry the exchange.
pub struct CelestialSlaveDatabase {
    config: CelestialDatabaseConfig,
    chunk_size: i32,
    clock: Arc<dyn Clock>,
    state: Mutex<SlaveState>,
}

impl CelestialSlaveDatabase {
    /// Creates an empty slave for a master using `chunk_size`.
    #[must_use]
    pub fn new(config: CelestialDatabaseConfig, chunk_size: i32) -> Self {
        let state = SlaveState {
            chunks: TtlCache::new(config.chunk_time_to_live_ms, config.max_cached_chunks),
            pending: Vec::new(),
        };
        Self {
            config,
            chunk_size: chunk_size.max(1),
            clock: Arc::new(MonotonicClock::new()),
            state: Mutex::new(state),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Requests not yet pulled, marked as sent now.
    pub fn pull_requests(&self) -> Vec<CelestialRequest> {
        let now = self.clock.millis();
        let mut state = self.lock();
        let mut requests = Vec::new();
        for pending in state.pending.iter_mut().filter(|pending| pending.sent.is_none()) {
            pending.sent = Some(now);
            requests.push(pending.request);
        }
        requests
    }

    /// Applies master responses. System objects for chunks no longer held
    /// are dropped.
    pub fn push_responses(&self, responses: Vec<CelestialResponse>) {
        let now = self.clock.millis();
        let mut state = self.lock();
        for response in responses {
            match response {
                CelestialResponse::Chunk(chunk) => {
                    let index = chunk.chunk_index;
                    state.resolve(CelestialRequest::Chunk(index));
                    let _ = state.chunks.insert(index, Arc::new(chunk), now);
                }
                CelestialResponse::System(location, objects) => {
                    state.resolve(CelestialRequest::System(location));
                    let index = chunk_index_for(location.truncate(), self.chunk_size);
                    let Some(mut chunk) = state.chunks.remove(&index) else {
                        log::debug!("dropping objects for system {location}; chunk {index} is not held");
                        continue;
                    };
                    let _ = Arc::make_mut(&mut chunk)
                        .system_objects
                        .insert(CelestialCoordinate::system(location), objects);
                    let _ = state.chunks.insert(index, chunk, now);
                }
            }
        }
    }

    /// Expires unanswered requests and stale chunks.
    pub fn cleanup(&self, now: u64) {
        let timeout = self.config.request_timeout_ms;
        let mut state = self.lock();
        state.pending.retain(|pending| match pending.sent {
            Some(sent) if now.saturating_sub(sent) > timeout => {
                log::debug!("celestial request {:?} expired", pending.request);
                false
            }
            _ => true,
        });
        state.chunks.cleanup(now);
    }

    /// Number of requests queued or in flight.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn chunk(&self, index: IVec2) -> Option<Arc<CelestialChunk>> {
        let now = self.clock.millis();
        let mut state = self.lock();
        if let Some(chunk) = state.chunks.get(&index, now) {
            return Some(Arc::clone(chunk));
        }
        state.request(CelestialRequest::Chunk(index));
        None
    }

    fn chunk_for(&self, coordinate: &CelestialCoordinate) -> Option<Arc<CelestialChunk>> {
        self.chunk(chunk_index_for(
            coordinate.location().truncate(),
            self.chunk_size,
        ))
    }

    fn request_system(&self, coordinate: &CelestialCoordinate) {
        self.lock()
            .request(CelestialRequest::System(coordinate.location()));
    }

    fn lock(&self) -> MutexGuard<'_, SlaveState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SlaveState {
    fn request(&mut self, request: CelestialRequest) {
        if !self.pending.iter().any(|pending| pending.request == request) {
            self.pending.push(PendingRequest {
                request,
                sent: None,
            });
        }
    }

    fn resolve(&mut self, request: CelestialRequest) {
        self.pending.retain(|pending| pending.request != request);
    }
}

impl CelestialDatabase for CelestialSlaveDatabase {
    fn parameters(&self, coordinate: &CelestialCoordinate) -> Option<CelestialParameters> {
        if coordinate.is_null() {
            return None;
        }
        match self.chunk_for(coordinate)?.parameters(coordinate) {
            ChunkLookup::Found(parameters) => Some(parameters.clone()),
            ChunkLookup::Absent => None,
            ChunkLookup::ObjectsMissing => {
                self.request_system(coordinate);
                None
            }
        }
    }

    fn child_orbits(&self, coordinate: &CelestialCoordinate) -> Option<Vec<i32>> {
        if coordinate.is_null() {
            return None;
        }
        match self.chunk_for(coordinate)?.child_orbits(coordinate) {
            ChunkLookup::Found(orbits) => Some(orbits),
            ChunkLookup::Absent => None,
            ChunkLookup::ObjectsMissing => {
                self.request_system(coordinate);
                None
            }
        }
    }

    fn scan_systems(
        &self,
        region: RectI,
        include_types: Option<&BTreeSet<String>>,
    ) -> Vec<CelestialCoordinate> {
        chunk_indices_for(&region, self.chunk_size)
            .into_iter()
            .filter_map(|index| self.chunk(index))
            .flat_map(|chunk| chunk.systems_in(&region, include_types).collect::<Vec<_>>())
            .collect()
    }

    fn scan_constellation_lines(&self, region: RectI) -> Vec<ConstellationLine> {
        chunk_indices_for(&region, self.chunk_size)
            .into_iter()
            .filter_map(|index| self.chunk(index))
            .flat_map(|chunk| chunk.constellations_in(&region).collect::<Vec<_>>())
            .collect()
    }

    fn scan_region_fully_loaded(&self, region: RectI) -> bool {
        let mut loaded = true;
        for index in chunk_indices_for(&region, self.chunk_size) {
            loaded &= self.chunk(index).is_some();
        }
        loaded
    }
}

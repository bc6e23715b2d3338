//! Sector residency and persistence for one world.

use std::collections::HashMap;

use orbitile_core::{IVec2, RectI};
use orbitile_storage::BTreeDatabase;
use orbitile_system_terrain::Selector;
use serde::{Deserialize, Serialize};

use crate::{
    chunks::{ChunkKey, WorldChunks, WorldChunksUpdate},
    sector_array::{Sector, SectorArray, TileSectorArray},
    tile::{MaterialId, WorldTile, DEFAULT_SOLID_MATERIAL_ID},
    WorldStorageError,
};

/// Side length of a world sector in tiles.
pub const SECTOR_SIZE: usize = 32;

/// Content identifier of world sector databases.
pub const SECTOR_STORE_IDENTIFIER: &str = "WorldSectors1";

/// Length of a sector key in bytes.
pub const SECTOR_KEY_SIZE: usize = 8;

/// Dense tiles of one sector.
pub type WorldSector = SectorArray<WorldTile, SECTOR_SIZE>;

/// Tile grid of a world.
pub type WorldTileArray = TileSectorArray<WorldTile, SECTOR_SIZE>;

/// Database key of a sector; sorts by x then y.
#[must_use]
pub fn sector_key(sector: Sector) -> [u8; SECTOR_KEY_SIZE] {
    let mut key = [0_u8; SECTOR_KEY_SIZE];
    key[..4].copy_from_slice(&((sector.x as u32) ^ 0x8000_0000).to_be_bytes());
    key[4..].copy_from_slice(&((sector.y as u32) ^ 0x8000_0000).to_be_bytes());
    key
}

/// Inverse of [`sector_key`].
#[must_use]
pub fn key_sector(key: &[u8]) -> Option<ChunkKey> {
    let x: [u8; 4] = key.get(..4)?.try_into().ok()?;
    let y: [u8; 4] = key.get(4..SECTOR_KEY_SIZE)?.try_into().ok()?;
    Some(ChunkKey::new(
        (u32::from_be_bytes(x) ^ 0x8000_0000) as i32,
        (u32::from_be_bytes(y) ^ 0x8000_0000) as i32,
    ))
}

/// Source of tiles for sectors that were never stored.
pub trait SectorGenerator: Send {
    /// Builds the tiles of `sector`, which covers `region`. Cells of a
    /// partial sector outside `region` are ignored.
    fn generate_sector(&self, sector: Sector, region: RectI) -> WorldSector;
}

/// Generates plain open space.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptySectorGenerator;

impl SectorGenerator for EmptySectorGenerator {
    fn generate_sector(&self, _sector: Sector, _region: RectI) -> WorldSector {
        SectorArray::filled(WorldTile::empty_background())
    }
}

/// Fills sectors from terrain selectors.
///
/// A cell gets a foreground block where the solid signal is non-negative
/// and the cave signal, if any, is negative. Background walls follow the
/// solid signal alone, so caves stay backed.
pub struct TerrainSectorGenerator {
    solid: Selector,
    cave: Option<Selector>,
    material: MaterialId,
}

impl TerrainSectorGenerator {
    /// Generator placing the default solid material wherever `solid` is.
    #[must_use]
    pub fn new(solid: Selector) -> Self {
        Self {
            solid,
            cave: None,
            material: DEFAULT_SOLID_MATERIAL_ID,
        }
    }

    /// Carves caves where `cave` is non-negative.
    #[must_use]
    pub fn with_cave(mut self, cave: Selector) -> Self {
        self.cave = Some(cave);
        self
    }

    /// Places `material` instead of the default.
    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    /// Tile generated at `(x, y)`.
    #[must_use]
    pub fn tile_at(&self, x: i32, y: i32) -> WorldTile {
        let mut tile = WorldTile::empty_background();
        if self.solid.get(x, y) < 0.0 {
            return tile;
        }
        tile.background = self.material;
        let open = self.cave.as_ref().is_some_and(|cave| cave.get(x, y) >= 0.0);
        if !open {
            tile.set_foreground(self.material);
        }
        tile
    }
}

impl SectorGenerator for TerrainSectorGenerator {
    fn generate_sector(&self, _sector: Sector, region: RectI) -> WorldSector {
        let mut array = SectorArray::filled(WorldTile::default());
        for y in region.min().y..region.max().y {
            for x in region.min().x..region.max().x {
                let local = IVec2::new(x, y) - region.min();
                if let Some(tile) = array.get_mut(local.x as usize, local.y as usize) {
                    *tile = self.tile_at(x, y);
                }
            }
        }
        array
    }
}

/// Residency settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldStorageConfig {
    /// Seconds a sector stays loaded without being kept alive.
    pub sector_time_to_live: f32,
}

impl Default for WorldStorageConfig {
    fn default() -> Self {
        Self {
            sector_time_to_live: 15.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Residency {
    time_to_live: f32,
    dirty: bool,
}

/// Loads sectors on demand from a database or a generator, evicts idle
/// ones, and writes changes back in grouped commits.
pub struct WorldStorage {
    tiles: WorldTileArray,
    database: BTreeDatabase,
    generator: Box<dyn SectorGenerator>,
    config: WorldStorageConfig,
    residency: HashMap<Sector, Residency>,
}

impl WorldStorage {
    /// Creates storage for a world of `size` tiles backed by `database`.
    #[must_use]
    pub fn new(
        size: IVec2,
        database: BTreeDatabase,
        generator: Box<dyn SectorGenerator>,
        config: WorldStorageConfig,
    ) -> Self {
        Self {
            tiles: TileSectorArray::new(size, WorldTile::default()),
            database,
            generator,
            config,
            residency: HashMap::new(),
        }
    }

    /// The resident tiles.
    #[must_use]
    pub fn tiles(&self) -> &WorldTileArray {
        &self.tiles
    }

    /// Tile at `pos`; the default tile when not loaded.
    #[must_use]
    pub fn tile(&self, pos: IVec2) -> &WorldTile {
        self.tiles.tile(pos)
    }

    /// The backing database.
    #[must_use]
    pub fn database(&self) -> &BTreeDatabase {
        &self.database
    }

    /// Loaded sectors, row by row.
    #[must_use]
    pub fn loaded_sectors(&self) -> Vec<Sector> {
        self.tiles.loaded_sectors()
    }

    /// Reports whether `sector` has changes not yet handed to the database.
    #[must_use]
    pub fn is_dirty(&self, sector: Sector) -> bool {
        self.residency.get(&sector).is_some_and(|entry| entry.dirty)
    }

    /// Loads `sector` if needed and renews its time to live. Returns true
    /// when it was newly loaded.
    pub fn load_sector(&mut self, sector: Sector) -> Result<bool, WorldStorageError> {
        if !self.tiles.sector_valid(sector) {
            return Err(WorldStorageError::InvalidSector {
                x: sector.x,
                y: sector.y,
            });
        }
        let time_to_live = self.config.sector_time_to_live;
        if let Some(entry) = self.residency.get_mut(&sector) {
            entry.time_to_live = time_to_live;
            return Ok(false);
        }
        let (array, dirty) = match self.database.get(&sector_key(sector))? {
            Some(bytes) => (decode_sector(&bytes)?, false),
            None => {
                log::debug!("generating sector ({}, {})", sector.x, sector.y);
                let region = self.tiles.sector_region(sector);
                (self.generator.generate_sector(sector, region), true)
            }
        };
        let _ = self.tiles.load_sector(sector, array);
        let _ = self
            .residency
            .insert(sector, Residency { time_to_live, dirty });
        Ok(true)
    }

    /// Loads every sector `rect` touches. Returns the newly loaded ones.
    pub fn load_region(&mut self, rect: RectI) -> Result<Vec<Sector>, WorldStorageError> {
        let mut loaded = Vec::new();
        for sector in self.tiles.valid_sectors_for(rect)? {
            if self.load_sector(sector)? {
                loaded.push(sector);
            }
        }
        Ok(loaded)
    }

    /// Renews the time to live of the loaded sectors `rect` touches.
    pub fn keep_alive(&mut self, rect: RectI) -> Result<(), WorldStorageError> {
        let time_to_live = self.config.sector_time_to_live;
        for sector in self.tiles.valid_sectors_for(rect)? {
            if let Some(entry) = self.residency.get_mut(&sector) {
                entry.time_to_live = time_to_live;
            }
        }
        Ok(())
    }

    /// Mutable tile at `pos`, marking its sector dirty. `None` when the
    /// sector is not loaded or `pos` is outside the world.
    pub fn modify_tile(&mut self, pos: IVec2) -> Option<&mut WorldTile> {
        let sector = self.tiles.sector_for(pos)?;
        let entry = self.residency.get_mut(&sector)?;
        entry.dirty = true;
        self.tiles.modify_tile(pos)
    }

    /// Applies `change` to every loaded tile of `rect`, marking touched
    /// sectors dirty.
    pub fn modify_region(
        &mut self,
        rect: RectI,
        mut change: impl FnMut(IVec2, &mut WorldTile),
    ) -> Result<(), WorldStorageError> {
        for sector in self.tiles.valid_sectors_for(rect)? {
            if let Some(entry) = self.residency.get_mut(&sector) {
                entry.dirty = true;
            }
        }
        self.tiles.tile_eval(rect, |pos, tile| change(pos, tile))?;
        Ok(())
    }

    /// Writes `sector` back if dirty and drops it from memory.
    pub fn unload_sector(&mut self, sector: Sector) -> Result<bool, WorldStorageError> {
        if !self.residency.contains_key(&sector) {
            return Ok(false);
        }
        self.persist(sector)?;
        let _ = self.residency.remove(&sector);
        let _ = self.tiles.unload_sector(sector);
        Ok(true)
    }

    /// Ages loaded sectors by `dt` seconds and unloads the expired ones.
    ///
    /// Sectors that fail to persist stay loaded and are retried next tick.
    pub fn tick(&mut self, dt: f32) -> Vec<Sector> {
        let mut expired: Vec<Sector> = Vec::new();
        for (sector, entry) in &mut self.residency {
            entry.time_to_live -= dt;
            if entry.time_to_live <= 0.0 {
                expired.push(*sector);
            }
        }
        expired.sort_by_key(|sector| (sector.y, sector.x));
        expired.retain(|sector| match self.unload_sector(*sector) {
            Ok(unloaded) => unloaded,
            Err(error) => {
                log::warn!("could not unload sector ({}, {}): {error}", sector.x, sector.y);
                false
            }
        });
        expired
    }

    /// Hands every dirty sector to the database and commits.
    ///
    /// Failures are logged; pending writes stay queued for the next commit.
    pub fn commit(&mut self) -> bool {
        let mut dirty: Vec<Sector> = self
            .residency
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(sector, _)| *sector)
            .collect();
        dirty.sort_by_key(|sector| (sector.y, sector.x));
        for sector in dirty {
            if let Err(error) = self.persist(sector) {
                log::error!("could not store sector ({}, {}): {error}", sector.x, sector.y);
                return false;
            }
        }
        match self.database.commit() {
            Ok(()) => true,
            Err(error) => {
                log::error!("world storage commit failed: {error}");
                false
            }
        }
    }

    /// Every stored sector, including dirty resident ones.
    pub fn world_chunks(&mut self) -> Result<WorldChunks, WorldStorageError> {
        let dirty: Vec<Sector> = self
            .residency
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(sector, _)| *sector)
            .collect();
        for sector in dirty {
            self.persist(sector)?;
        }
        let mut chunks = WorldChunks::new();
        self.database.for_each(|key, value| {
            if let Some(chunk) = key_sector(key) {
                let _ = chunks.insert(chunk, value.to_vec());
            }
        })?;
        Ok(chunks)
    }

    /// Applies a chunk delta from a peer. Resident sectors named by the
    /// delta are reloaded from the new contents.
    ///
    /// Every entry is decoded before any is applied, so a delta holding an
    /// undecodable sector changes nothing.
    pub fn apply_world_chunks(&mut self, update: WorldChunksUpdate) -> Result<(), WorldStorageError> {
        let mut entries: Vec<_> = update.into_iter().collect();
        entries.sort_by_key(|(key, _)| *key);
        for bytes in entries.iter().filter_map(|(_, bytes)| bytes.as_ref()) {
            let _ = decode_sector(bytes)?;
        }
        for (key, bytes) in entries {
            let sector = IVec2::new(key.x, key.y);
            let database_key = sector_key(sector);
            match bytes {
                Some(bytes) => {
                    self.database.insert(&database_key, &bytes)?;
                }
                None => {
                    let _ = self.database.remove(&database_key)?;
                }
            }
            if self.residency.remove(&sector).is_some() {
                let _ = self.tiles.unload_sector(sector);
                let _ = self.load_sector(sector)?;
            }
        }
        Ok(())
    }

    fn persist(&mut self, sector: Sector) -> Result<(), WorldStorageError> {
        let Some(entry) = self.residency.get_mut(&sector) else {
            return Ok(());
        };
        if !entry.dirty {
            return Ok(());
        }
        let Some(array) = self.tiles.sector(sector) else {
            return Ok(());
        };
        let bytes = bincode::serialize(array)?;
        self.database.insert(&sector_key(sector), &bytes)?;
        entry.dirty = false;
        Ok(())
    }
}

fn decode_sector(bytes: &[u8]) -> Result<WorldSector, WorldStorageError> {
    let tiles: Vec<WorldTile> = bincode::deserialize(bytes)?;
    let found = tiles.len();
    WorldSector::try_from(tiles).map_err(|_| WorldStorageError::SectorSize {
        expected: SECTOR_SIZE * SECTOR_SIZE,
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitile_storage::MemoryDevice;
    use orbitile_system_terrain::{create_selector_type, TerrainSelectorParameters};
    use serde_json::json;

    fn storage(device: &MemoryDevice) -> WorldStorage {
        let database = BTreeDatabase::with_device(
            Box::new(device.clone()),
            SECTOR_STORE_IDENTIFIER,
            SECTOR_KEY_SIZE,
        )
        .expect("store opens");
        WorldStorage::new(
            IVec2::new(100, 64),
            database,
            Box::new(EmptySectorGenerator),
            WorldStorageConfig::default(),
        )
    }

    #[test]
    fn sector_keys_round_trip_and_sort() {
        for sector in [IVec2::new(0, 0), IVec2::new(-1, 7), IVec2::new(3, -2)] {
            assert_eq!(
                key_sector(&sector_key(sector)),
                Some(ChunkKey::new(sector.x, sector.y))
            );
        }
        assert!(sector_key(IVec2::new(-1, 0)) < sector_key(IVec2::new(0, 0)));
        assert_eq!(key_sector(&[1, 2, 3]), None);
    }

    #[test]
    fn terrain_generator_carves_caves_but_keeps_walls() {
        let parameters = TerrainSelectorParameters::new(100, 20.0, 3);
        let solid = create_selector_type("flatSurface", &json!({ "adjustment": 0 }), parameters)
            .expect("selector builds");
        let cave = create_selector_type("constant", &json!({ "value": 1.0 }), parameters)
            .expect("selector builds");
        let plain = TerrainSectorGenerator::new(
            create_selector_type("flatSurface", &json!({}), parameters).expect("selector builds"),
        );
        assert!(plain.tile_at(5, 20).is_solid());
        assert!(plain.tile_at(5, 21).is_clear());

        let caved = TerrainSectorGenerator::new(solid).with_cave(cave).with_material(9);
        let tile = caved.tile_at(5, 3);
        assert!(!tile.is_solid());
        assert_eq!(tile.background, 9);

        let sector = plain.generate_sector(IVec2::new(3, 0), RectI::new(96, 0, 100, 32));
        assert!(sector.get(0, 0).is_some_and(WorldTile::is_solid));
        assert!(sector.get(4, 0).is_some_and(WorldTile::is_null));
    }

    #[test]
    fn unloaded_edits_survive_a_reload() {
        let device = MemoryDevice::new();
        let mut world = storage(&device);
        assert!(world.load_sector(IVec2::new(1, 0)).expect("loads"));
        assert!(!world.load_sector(IVec2::new(1, 0)).expect("already loaded"));
        assert!(world.modify_tile(IVec2::new(0, 0)).is_none());
        world
            .modify_tile(IVec2::new(40, 5))
            .expect("sector resident")
            .set_foreground(4);
        assert!(world.unload_sector(IVec2::new(1, 0)).expect("unloads"));
        assert!(world.tile(IVec2::new(40, 5)).is_null());
        assert!(world.commit());

        let mut reopened = storage(&device);
        let _ = reopened.load_sector(IVec2::new(1, 0)).expect("loads");
        assert_eq!(reopened.tile(IVec2::new(40, 5)).foreground, 4);
        assert!(!reopened.is_dirty(IVec2::new(1, 0)));
    }

    #[test]
    fn idle_sectors_expire_unless_kept_alive() {
        let device = MemoryDevice::new();
        let mut world = storage(&device);
        let loaded = world.load_region(RectI::new(-4, 0, 4, 10)).expect("loads");
        assert_eq!(loaded, vec![IVec2::new(0, 0), IVec2::new(3, 0)]);
        assert!(world.tick(10.0).is_empty());
        world.keep_alive(RectI::new(0, 0, 1, 1)).expect("in range");
        assert_eq!(world.tick(10.0), vec![IVec2::new(3, 0)]);
        assert_eq!(world.loaded_sectors(), vec![IVec2::new(0, 0)]);
        assert!(matches!(
            world.load_sector(IVec2::new(0, 9)),
            Err(WorldStorageError::InvalidSector { x: 0, y: 9 })
        ));
    }

    #[test]
    fn peers_exchange_chunk_maps() {
        let mut ship = storage(&MemoryDevice::new());
        let _ = ship.load_sector(IVec2::new(0, 1)).expect("loads");
        ship.modify_region(RectI::new(0, 32, 4, 34), |_, tile| tile.set_foreground(2))
            .expect("in range");
        let chunks = ship.world_chunks().expect("chunks");
        assert_eq!(chunks.len(), 1);

        let mut mirror = storage(&MemoryDevice::new());
        let _ = mirror.load_sector(IVec2::new(0, 1)).expect("loads");
        let update = crate::get_world_chunks_update(&WorldChunks::new(), &chunks);
        mirror.apply_world_chunks(update).expect("applies");
        assert_eq!(mirror.tile(IVec2::new(3, 33)).foreground, 2);
        assert_eq!(mirror.tile(IVec2::new(4, 33)).foreground, crate::EMPTY_MATERIAL_ID);

        let mut bad = WorldChunksUpdate::new();
        let _ = bad.insert(ChunkKey::new(0, 0), Some(bincode::serialize(&vec![WorldTile::default(); 3]).expect("encodes")));
        assert!(matches!(
            mirror.apply_world_chunks(bad),
            Err(WorldStorageError::SectorSize { found: 3, .. })
        ));
    }

    #[test]
    fn undecodable_deltas_apply_nothing() {
        let mut ship = storage(&MemoryDevice::new());
        let _ = ship.load_sector(IVec2::new(0, 1)).expect("loads");
        ship.modify_region(RectI::new(0, 32, 4, 34), |_, tile| tile.set_foreground(2))
            .expect("in range");
        let chunks = ship.world_chunks().expect("chunks");

        let mut mirror = storage(&MemoryDevice::new());
        let _ = mirror.load_sector(IVec2::new(0, 1)).expect("loads");
        let mut update = crate::get_world_chunks_update(&WorldChunks::new(), &chunks);
        let truncated = bincode::serialize(&vec![WorldTile::default(); 3]).expect("encodes");
        let _ = update.insert(ChunkKey::new(1, 1), Some(truncated));

        assert!(matches!(
            mirror.apply_world_chunks(update),
            Err(WorldStorageError::SectorSize { found: 3, .. })
        ));
        assert_eq!(mirror.database().record_count(), 0);
        assert_eq!(mirror.database().pending_count(), 0);
        assert_eq!(mirror.tile(IVec2::new(3, 33)).foreground, crate::EMPTY_MATERIAL_ID);
    }
}

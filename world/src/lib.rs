#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Tile and entity state of a single world.
//!
//! [`TileSectorArray`] pages square sectors of tiles in and out of a grid
//! that wraps horizontally. [`WorldStorage`] decides which sectors are
//! resident, generating missing ones from terrain selectors and writing
//! changes to a [`orbitile_storage::BTreeDatabase`]. [`EntityMap`] indexes
//! everything that moves. None of these types are thread-safe; the thread
//! that owns the world is their only user.

mod chunks;
mod entity_map;
mod error;
mod sector_array;
mod spatial_hash;
mod storage;
mod tile;

pub use chunks::{
    apply_world_chunks_update, get_world_chunks_update, read_world_chunks_update,
    write_world_chunks_update, ChunkKey, WorldChunks, WorldChunksUpdate,
};
pub use entity_map::{
    EntityId, EntityMap, EntityType, InteractiveShape, MapEntity, UpdateContext, MAX_ENTITY_SIZE,
    NULL_ENTITY_ID,
};
pub use error::{EntityMapError, TileArrayError, WorldChunksError, WorldStorageError};
pub use sector_array::{clamp_y_range, split_rect, Sector, SectorArray, SplitRect, TileSectorArray};
pub use spatial_hash::{SpatialHash, DEFAULT_CELL_SIZE};
pub use storage::{
    key_sector, sector_key, EmptySectorGenerator, SectorGenerator, TerrainSectorGenerator,
    WorldSector, WorldStorage, WorldStorageConfig, WorldTileArray, SECTOR_KEY_SIZE, SECTOR_SIZE,
    SECTOR_STORE_IDENTIFIER,
};
pub use tile::{
    CollisionKind, DungeonId, LiquidLevel, MaterialId, ModId, WorldTile,
    DEFAULT_SOLID_MATERIAL_ID, EMPTY_MATERIAL_ID, NO_DUNGEON_ID, NO_MOD_ID, NULL_MATERIAL_ID,
};

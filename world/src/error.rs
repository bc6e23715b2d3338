use orbitile_core::CodecError;
use orbitile_storage::StorageError;
use thiserror::Error;

use crate::EntityId;

/// Failure raised by tile sector array range operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TileArrayError {
    /// A rectangle narrower than the world starts further left than one
    /// world width.
    #[error("rect starting at x={x_min} lies outside [-{width}, {width})")]
    RectOutOfRange {
        /// Left edge of the rejected rectangle.
        x_min: i32,
        /// World width.
        width: i32,
    },
}

/// Failure raised when adding entities or reserving ids.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EntityMapError {
    /// Every id in the map's range is in use or reserved.
    #[error("entity id space [{begin}, {end}) is exhausted")]
    IdSpaceExhausted {
        /// First id of the range.
        begin: EntityId,
        /// One past the last id of the range.
        end: EntityId,
    },
    /// Id zero is never a valid entity id.
    #[error("entity id 0 is reserved")]
    NullId,
    /// The id was not reserved before adding.
    #[error("entity id {0} was not reserved")]
    UnreservedId(EntityId),
    /// An entity with this id is already in the map.
    #[error("duplicate entity id {0}")]
    DuplicateId(EntityId),
    /// Another entity already holds this unique name.
    #[error("duplicate unique entity name '{name}' on entity {id}")]
    DuplicateUniqueName {
        /// Entity being added or renamed.
        id: EntityId,
        /// Name already held.
        name: String,
    },
    /// The meta bound box is empty or inverted.
    #[error("entity {id} has an empty meta bound box")]
    EmptyBounds {
        /// Offending entity.
        id: EntityId,
    },
    /// The meta bound box is wider or taller than allowed.
    #[error("entity {id} meta bound box {width}x{height} is too large")]
    BoundsTooLarge {
        /// Offending entity.
        id: EntityId,
        /// Box width.
        width: f32,
        /// Box height.
        height: f32,
    },
}

/// Failure raised while decoding a world chunk delta.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldChunksError {
    /// The byte stream ended early or held a malformed number.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A chunk coordinate does not fit in 32 bits.
    #[error("chunk coordinate {0} is out of range")]
    CoordinateRange(i64),
    /// Bytes remained after the last entry.
    #[error("{0} trailing bytes after world chunk update")]
    TrailingBytes(usize),
}

/// Failure raised by world storage.
#[derive(Debug, Error)]
pub enum WorldStorageError {
    /// The backing database failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A stored sector could not be encoded or decoded.
    #[error("sector codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// A stored sector has the wrong number of tiles.
    #[error("stored sector has {found} tiles, expected {expected}")]
    SectorSize {
        /// Tiles in a full sector.
        expected: usize,
        /// Tiles found.
        found: usize,
    },
    /// A rectangle could not be mapped onto the world.
    #[error(transparent)]
    Range(#[from] TileArrayError),
    /// The sector coordinate lies outside the world.
    #[error("sector ({x}, {y}) is outside the world")]
    InvalidSector {
        /// Sector column.
        x: i32,
        /// Sector row.
        y: i32,
    },
}

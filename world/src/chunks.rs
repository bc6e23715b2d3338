//! Whole-world chunk maps and the deltas exchanged between them.

use std::collections::HashMap;

use orbitile_core::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};

use crate::WorldChunksError;

/// Coordinates of a persisted chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    /// Chunk column.
    pub x: i32,
    /// Chunk row.
    pub y: i32,
}

impl ChunkKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Snapshot of every chunk of a world.
pub type WorldChunks = HashMap<ChunkKey, Vec<u8>>;

/// Changes between two snapshots; `None` deletes the chunk.
pub type WorldChunksUpdate = HashMap<ChunkKey, Option<Vec<u8>>>;

/// Entries that turn `old` into `new`.
#[must_use]
pub fn get_world_chunks_update(old: &WorldChunks, new: &WorldChunks) -> WorldChunksUpdate {
    let mut update = WorldChunksUpdate::new();
    for (key, bytes) in new {
        if old.get(key) != Some(bytes) {
            let _ = update.insert(*key, Some(bytes.clone()));
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            let _ = update.insert(*key, None);
        }
    }
    update
}

/// Replays `update` onto `chunks`.
pub fn apply_world_chunks_update(chunks: &mut WorldChunks, update: WorldChunksUpdate) {
    for (key, bytes) in update {
        match bytes {
            Some(bytes) => {
                let _ = chunks.insert(key, bytes);
            }
            None => {
                let _ = chunks.remove(&key);
            }
        }
    }
}

/// Encodes an update, entries sorted by key so equal updates encode equally.
#[must_use]
pub fn write_world_chunks_update(update: &WorldChunksUpdate) -> Vec<u8> {
    let mut entries: Vec<_> = update.iter().collect();
    entries.sort_by_key(|(key, _)| **key);

    let mut writer = ByteWriter::new();
    writer.write_vlq_u(entries.len() as u64);
    for (key, bytes) in entries {
        writer.write_vlq_i(i64::from(key.x));
        writer.write_vlq_i(i64::from(key.y));
        match bytes {
            Some(bytes) => {
                writer.write_bool(true);
                writer.write_bytes(bytes);
            }
            None => writer.write_bool(false),
        }
    }
    writer.into_bytes()
}

/// Decodes bytes produced by [`write_world_chunks_update`].
pub fn read_world_chunks_update(bytes: &[u8]) -> Result<WorldChunksUpdate, WorldChunksError> {
    let mut reader = ByteReader::new(bytes);
    let count = reader.read_vlq_u()?;
    let mut update = WorldChunksUpdate::new();
    for _ in 0..count {
        let x = read_coordinate(&mut reader)?;
        let y = read_coordinate(&mut reader)?;
        let bytes = if reader.read_bool()? {
            Some(reader.read_bytes()?.to_vec())
        } else {
            None
        };
        let _ = update.insert(ChunkKey::new(x, y), bytes);
    }
    if !reader.at_end() {
        return Err(WorldChunksError::TrailingBytes(reader.remaining()));
    }
    Ok(update)
}

fn read_coordinate(reader: &mut ByteReader<'_>) -> Result<i32, WorldChunksError> {
    let value = reader.read_vlq_i()?;
    i32::try_from(value).map_err(|_| WorldChunksError::CoordinateRange(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(entries: &[(i32, i32, &[u8])]) -> WorldChunks {
        entries
            .iter()
            .map(|(x, y, bytes)| (ChunkKey::new(*x, *y), bytes.to_vec()))
            .collect()
    }

    #[test]
    fn update_holds_only_changes() {
        let old = chunks(&[(0, 0, b"a"), (1, 0, b"b"), (-3, 2, b"c")]);
        let new = chunks(&[(0, 0, b"a"), (1, 0, b"B"), (4, 4, b"d")]);
        let update = get_world_chunks_update(&old, &new);
        assert_eq!(update.len(), 3);
        assert_eq!(update[&ChunkKey::new(1, 0)], Some(b"B".to_vec()));
        assert_eq!(update[&ChunkKey::new(-3, 2)], None);
        assert!(!update.contains_key(&ChunkKey::new(0, 0)));
    }

    #[test]
    fn encoding_is_independent_of_hash_order() {
        let update: WorldChunksUpdate = [
            (ChunkKey::new(5, -1), Some(vec![1, 2, 3])),
            (ChunkKey::new(-7, 0), None),
            (ChunkKey::new(0, 9), Some(Vec::new())),
        ]
        .into_iter()
        .collect();
        let bytes = write_world_chunks_update(&update);
        let rebuilt: WorldChunksUpdate = update.clone().into_iter().collect::<Vec<_>>().into_iter().rev().collect();
        assert_eq!(write_world_chunks_update(&rebuilt), bytes);
        assert_eq!(read_world_chunks_update(&bytes), Ok(update));
    }

    #[test]
    fn malformed_updates_are_rejected() {
        let bytes = write_world_chunks_update(&WorldChunksUpdate::new());
        let mut padded = bytes.clone();
        padded.push(0);
        assert_eq!(
            read_world_chunks_update(&padded),
            Err(WorldChunksError::TrailingBytes(1))
        );

        let mut writer = ByteWriter::new();
        writer.write_vlq_u(1);
        writer.write_vlq_i(i64::from(i32::MAX) + 1);
        assert_eq!(
            read_world_chunks_update(writer.as_bytes()),
            Err(WorldChunksError::CoordinateRange(i64::from(i32::MAX) + 1))
        );
        assert!(matches!(
            read_world_chunks_update(&[2]),
            Err(WorldChunksError::Codec(_))
        ));
    }
}

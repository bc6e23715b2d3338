use std::{collections::BTreeMap, ops::Bound, path::Path};

use crate::{
    device::{FileDevice, MemoryDevice, StorageDevice},
    error::StorageError,
};

const HEADER_MAGIC: &[u8; 4] = b"OBTD";
const RECORD_MAGIC: &[u8; 4] = b"CMIT";

/// Version written into the log header.
pub const FORMAT_VERSION: u32 = 1;

const OP_REMOVE: u8 = 0;
const OP_INSERT: u8 = 1;

type Key = Vec<u8>;
type Value = Vec<u8>;

/// Where a committed value lives on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ValueSpan {
    offset: u64,
    len: usize,
}

impl ValueSpan {
    fn shifted(self, base: u64) -> Self {
        Self {
            offset: base + self.offset,
            len: self.len,
        }
    }
}

/// Current value of a key, either staged in memory or committed to the device.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Staged(&'a [u8]),
    Stored(ValueSpan),
}

/// Sorted key/value store with fixed-size keys and grouped commits.
///
/// Only keys and the device location of their committed values are held in
/// memory; values are read back from the device when asked for.
pub struct BTreeDatabase {
    device: Box<dyn StorageDevice>,
    content_identifier: String,
    key_size: usize,
    committed: BTreeMap<Key, ValueSpan>,
    pending: BTreeMap<Key, Option<Value>>,
}

impl std::fmt::Debug for BTreeDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTreeDatabase")
            .field("content_identifier", &self.content_identifier)
            .field("key_size", &self.key_size)
            .field("records", &self.committed.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl BTreeDatabase {
    /// Opens or creates a database file.
    pub fn open(
        path: impl AsRef<Path>,
        content_identifier: &str,
        key_size: usize,
    ) -> Result<Self, StorageError> {
        let device = FileDevice::open(path)?;
        Self::with_device(Box::new(device), content_identifier, key_size)
    }

    /// Creates a database that lives only in memory.
    pub fn in_memory(content_identifier: &str, key_size: usize) -> Result<Self, StorageError> {
        Self::with_device(Box::new(MemoryDevice::new()), content_identifier, key_size)
    }

    /// Opens a database over an arbitrary device, replaying its log.
    ///
    /// The log is read once to rebuild the key index; values are not kept.
    pub fn with_device(
        mut device: Box<dyn StorageDevice>,
        content_identifier: &str,
        key_size: usize,
    ) -> Result<Self, StorageError> {
        let bytes = device.read_all()?;
        let mut database = Self {
            device,
            content_identifier: content_identifier.to_owned(),
            key_size,
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
        };

        if bytes.is_empty() {
            let header = database.header_bytes();
            database.device.append(&header)?;
            database.device.sync()?;
            return Ok(database);
        }

        let mut cursor = Cursor::new(&bytes);
        database.read_header(&mut cursor)?;
        let valid_len = database.replay(&mut cursor);
        if valid_len < bytes.len() {
            log::warn!(
                "discarding {} byte(s) of incomplete or corrupted commit log for '{}'",
                bytes.len() - valid_len,
                database.content_identifier
            );
            database.device.truncate(valid_len as u64)?;
            database.device.sync()?;
        }
        Ok(database)
    }

    /// Identifier of the content stored in this database.
    #[must_use]
    pub fn content_identifier(&self) -> &str {
        &self.content_identifier
    }

    /// Fixed key length in bytes.
    #[must_use]
    pub const fn key_size(&self) -> usize {
        self.key_size
    }

    /// Reads the current value of `key`, including uncommitted writes.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_key(key)?;
        match self.lookup(key) {
            Some(slot) => self.resolve(slot).map(Some),
            None => Ok(None),
        }
    }

    /// Reports whether `key` currently holds a value.
    pub fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        self.check_key(key)?;
        Ok(self.lookup(key).is_some())
    }

    /// Stages `value` under `key`.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.check_key(key)?;
        let _ = self.pending.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    /// Stages removal of `key`, reporting whether it held a value.
    pub fn remove(&mut self, key: &[u8]) -> Result<bool, StorageError> {
        self.check_key(key)?;
        let existed = self.lookup(key).is_some();
        if self.committed.contains_key(key) {
            let _ = self.pending.insert(key.to_vec(), None);
        } else {
            let _ = self.pending.remove(key);
        }
        Ok(existed)
    }

    /// Number of live keys, including uncommitted writes.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.merged(Bound::Unbounded, Bound::Unbounded).len()
    }

    /// Number of staged writes awaiting commit.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total bytes of values held in memory, which is only staged writes.
    #[must_use]
    pub fn resident_value_bytes(&self) -> usize {
        self.pending.values().flatten().map(Vec::len).sum()
    }

    /// Live keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.merged(Bound::Unbounded, Bound::Unbounded)
            .into_keys()
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Visits every live entry in key order.
    pub fn for_each(&self, visit: impl FnMut(&[u8], &[u8])) -> Result<(), StorageError> {
        self.visit(Bound::Unbounded, Bound::Unbounded, visit)
    }

    /// Visits live entries with `lower <= key <= upper` in key order.
    pub fn for_each_in_range(
        &self,
        lower: &[u8],
        upper: &[u8],
        visit: impl FnMut(&[u8], &[u8]),
    ) -> Result<(), StorageError> {
        self.check_key(lower)?;
        self.check_key(upper)?;
        if lower > upper {
            return Ok(());
        }
        self.visit(Bound::Included(lower), Bound::Included(upper), visit)
    }

    /// Persists every staged write as one atomic record.
    ///
    /// On failure the staged writes are kept so the commit can be retried.
    pub fn commit(&mut self) -> Result<(), StorageError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let (record, spans) = encode_record(
            self.pending
                .iter()
                .map(|(key, value)| (key.as_slice(), value.as_deref())),
        );
        let previous_len = self.device.len()?;
        let written = self
            .device
            .append(&record)
            .and_then(|()| self.device.sync());
        if let Err(error) = written {
            if let Err(rewind) = self.device.truncate(previous_len) {
                log::warn!("failed to rewind partial commit: {rewind}");
            }
            return Err(error.into());
        }

        let count = self.pending.len();
        for ((key, _), span) in std::mem::take(&mut self.pending).into_iter().zip(spans) {
            match span {
                Some(span) => {
                    let _ = self.committed.insert(key, span.shifted(previous_len));
                }
                None => {
                    let _ = self.committed.remove(&key);
                }
            }
        }
        log::debug!(
            "committed {count} write(s) to '{}'",
            self.content_identifier
        );
        Ok(())
    }

    /// Discards every staged write.
    pub fn rollback(&mut self) {
        self.pending.clear();
    }

    /// Rewrites the log as a header followed by one snapshot record.
    ///
    /// Staged writes are committed first.
    pub fn compact(&mut self) -> Result<(), StorageError> {
        self.commit()?;
        let mut live = Vec::with_capacity(self.committed.len());
        for (key, span) in &self.committed {
            live.push((key.clone(), self.read_span(*span)?));
        }
        let mut bytes = self.header_bytes();
        let base = bytes.len() as u64;
        let (record, spans) = encode_record(
            live.iter()
                .map(|(key, value)| (key.as_slice(), Some(value.as_slice()))),
        );
        bytes.extend(record);
        self.device.replace(&bytes)?;
        self.device.sync()?;
        for ((key, _), span) in live.into_iter().zip(spans) {
            if let Some(span) = span {
                let _ = self.committed.insert(key, span.shifted(base));
            }
        }
        Ok(())
    }

    fn check_key(&self, key: &[u8]) -> Result<(), StorageError> {
        if key.len() == self.key_size {
            Ok(())
        } else {
            Err(StorageError::KeySize {
                expected: self.key_size,
                found: key.len(),
            })
        }
    }

    fn lookup(&self, key: &[u8]) -> Option<Slot<'_>> {
        match self.pending.get(key) {
            Some(staged) => staged.as_deref().map(Slot::Staged),
            None => self.committed.get(key).copied().map(Slot::Stored),
        }
    }

    fn read_span(&self, span: ValueSpan) -> Result<Vec<u8>, StorageError> {
        self.device.read_at(span.offset, span.len).map_err(|error| {
            StorageError::Corrupted(format!(
                "value at offset {} ({} bytes) is unreadable: {error}",
                span.offset, span.len
            ))
        })
    }

    fn resolve(&self, slot: Slot<'_>) -> Result<Vec<u8>, StorageError> {
        match slot {
            Slot::Staged(value) => Ok(value.to_vec()),
            Slot::Stored(span) => self.read_span(span),
        }
    }

    fn visit(
        &self,
        lower: Bound<&[u8]>,
        upper: Bound<&[u8]>,
        mut visit: impl FnMut(&[u8], &[u8]),
    ) -> Result<(), StorageError> {
        for (key, slot) in self.merged(lower, upper) {
            match slot {
                Slot::Staged(value) => visit(key, value),
                Slot::Stored(span) => visit(key, &self.read_span(span)?),
            }
        }
        Ok(())
    }

    fn merged<'a>(
        &'a self,
        lower: Bound<&'a [u8]>,
        upper: Bound<&'a [u8]>,
    ) -> BTreeMap<&'a [u8], Slot<'a>> {
        let range = (lower, upper);
        let mut merged: BTreeMap<&[u8], Slot<'a>> = self
            .committed
            .range::<[u8], _>(range)
            .map(|(key, span)| (key.as_slice(), Slot::Stored(*span)))
            .collect();
        for (key, staged) in self.pending.range::<[u8], _>(range) {
            match staged {
                Some(value) => {
                    let _ = merged.insert(key.as_slice(), Slot::Staged(value.as_slice()));
                }
                None => {
                    let _ = merged.remove(key.as_slice());
                }
            }
        }
        merged
    }

    fn header_bytes(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(16 + self.content_identifier.len());
        header.extend_from_slice(HEADER_MAGIC);
        header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        header.extend_from_slice(&(self.key_size as u32).to_le_bytes());
        header.extend_from_slice(&(self.content_identifier.len() as u32).to_le_bytes());
        header.extend_from_slice(self.content_identifier.as_bytes());
        header
    }

    fn read_header(&self, cursor: &mut Cursor<'_>) -> Result<(), StorageError> {
        let corrupted = || StorageError::Corrupted("truncated header".to_owned());
        if cursor.take(4).ok_or_else(corrupted)? != HEADER_MAGIC {
            return Err(StorageError::Corrupted("bad header magic".to_owned()));
        }
        let version = cursor.u32().ok_or_else(corrupted)?;
        if version != FORMAT_VERSION {
            return Err(StorageError::Corrupted(format!(
                "unsupported format version {version}"
            )));
        }
        let found_key_size = cursor.u32().ok_or_else(corrupted)? as usize;
        let identifier_len = cursor.u32().ok_or_else(corrupted)? as usize;
        let identifier = cursor.take(identifier_len).ok_or_else(corrupted)?;
        let found = String::from_utf8_lossy(identifier).into_owned();
        if found != self.content_identifier || found_key_size != self.key_size {
            return Err(StorageError::Mismatch {
                expected: self.content_identifier.clone(),
                expected_key_size: self.key_size,
                found,
                found_key_size,
            });
        }
        Ok(())
    }

    /// Indexes every intact record, returning the byte length of the valid prefix.
    fn replay(&mut self, cursor: &mut Cursor<'_>) -> usize {
        loop {
            let start = cursor.position;
            if cursor.remaining() == 0 {
                return start;
            }
            match decode_record(cursor, self.key_size) {
                Some(entries) => {
                    for (key, span) in entries {
                        match span {
                            Some(span) => {
                                let _ = self.committed.insert(key, span);
                            }
                            None => {
                                let _ = self.committed.remove(&key);
                            }
                        }
                    }
                }
                None => return start,
            }
        }
    }
}

/// Encodes one commit record, returning it with the span of each inserted
/// value relative to the start of the record.
fn encode_record<'a>(
    entries: impl Iterator<Item = (&'a [u8], Option<&'a [u8]>)>,
) -> (Vec<u8>, Vec<Option<ValueSpan>>) {
    let mut record = Vec::new();
    record.extend_from_slice(RECORD_MAGIC);
    record.extend_from_slice(&0_u32.to_le_bytes());
    let mut spans = Vec::new();
    for (key, value) in entries {
        match value {
            Some(value) => {
                record.push(OP_INSERT);
                record.extend_from_slice(key);
                record.extend_from_slice(&(value.len() as u32).to_le_bytes());
                spans.push(Some(ValueSpan {
                    offset: record.len() as u64,
                    len: value.len(),
                }));
                record.extend_from_slice(value);
            }
            None => {
                record.push(OP_REMOVE);
                record.extend_from_slice(key);
                spans.push(None);
            }
        }
    }
    let count = spans.len() as u32;
    record[4..8].copy_from_slice(&count.to_le_bytes());
    let checksum = crc32fast::hash(&record);
    record.extend_from_slice(&checksum.to_le_bytes());
    (record, spans)
}

/// Decodes one record, giving each inserted value's span within the log.
fn decode_record(cursor: &mut Cursor<'_>, key_size: usize) -> Option<Vec<(Key, Option<ValueSpan>)>> {
    let start = cursor.position;
    if cursor.take(4)? != RECORD_MAGIC {
        return None;
    }
    let count = cursor.u32()?;
    let mut entries = Vec::new();
    for _ in 0..count {
        let op = cursor.take(1)?[0];
        let key = cursor.take(key_size)?.to_vec();
        match op {
            OP_INSERT => {
                let len = cursor.u32()? as usize;
                let offset = cursor.position as u64;
                let _ = cursor.take(len)?;
                entries.push((key, Some(ValueSpan { offset, len })));
            }
            OP_REMOVE => entries.push((key, None)),
            _ => return None,
        }
    }
    let end = cursor.position;
    let checksum = cursor.u32()?;
    if crc32fast::hash(&cursor.bytes[start..end]) != checksum {
        return None;
    }
    Some(entries)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, count: usize) -> Option<&'a [u8]> {
        if self.remaining() < count {
            return None;
        }
        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let mut array = [0_u8; 4];
        array.copy_from_slice(self.take(4)?);
        Some(u32::from_le_bytes(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: u16) -> [u8; 2] {
        value.to_be_bytes()
    }

    #[test]
    fn uncommitted_writes_are_visible_and_rollback_discards_them() {
        let mut database = BTreeDatabase::in_memory("test", 2).expect("database opens");
        database.insert(&key(1), b"one").expect("insert");
        assert_eq!(database.get(&key(1)).expect("get"), Some(b"one".to_vec()));
        database.rollback();
        assert_eq!(database.get(&key(1)).expect("get"), None);
    }

    #[test]
    fn wrong_key_size_is_rejected() {
        let mut database = BTreeDatabase::in_memory("test", 2).expect("database opens");
        assert!(matches!(
            database.insert(&[1, 2, 3], b"x"),
            Err(StorageError::KeySize { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn range_iteration_merges_pending_writes() {
        let mut database = BTreeDatabase::in_memory("test", 2).expect("database opens");
        for value in 0..6 {
            database.insert(&key(value), &[value as u8]).expect("insert");
        }
        database.commit().expect("commit");
        assert!(database.remove(&key(2)).expect("remove"));
        database.insert(&key(3), b"x").expect("insert");

        let mut seen = Vec::new();
        database
            .for_each_in_range(&key(1), &key(4), |key, value| {
                seen.push((key.to_vec(), value.to_vec()));
            })
            .expect("range");
        assert_eq!(
            seen,
            vec![
                (key(1).to_vec(), vec![1]),
                (key(3).to_vec(), b"x".to_vec()),
                (key(4).to_vec(), vec![4]),
            ]
        );
    }

    #[test]
    fn committed_values_leave_memory() {
        let mut database = BTreeDatabase::in_memory("test", 2).expect("database opens");
        database.insert(&key(1), &[7; 64]).expect("insert");
        assert_eq!(database.resident_value_bytes(), 64);
        database.commit().expect("commit");
        assert_eq!(database.resident_value_bytes(), 0);
        assert_eq!(database.get(&key(1)).expect("get"), Some(vec![7; 64]));
        database.compact().expect("compact");
        assert_eq!(database.get(&key(1)).expect("get"), Some(vec![7; 64]));
    }

    #[test]
    fn removing_uncommitted_key_leaves_no_tombstone() {
        let mut database = BTreeDatabase::in_memory("test", 2).expect("database opens");
        database.insert(&key(9), b"v").expect("insert");
        assert!(database.remove(&key(9)).expect("remove"));
        assert_eq!(database.pending_count(), 0);
        assert!(!database.remove(&key(9)).expect("remove"));
    }
}

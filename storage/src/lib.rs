#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Sorted key/value storage persisted as an append-only commit log.
//!
//! A [`BTreeDatabase`] keeps the live key set and the log location of each
//! committed value in memory, reading values back on demand. It persists every
//! [`BTreeDatabase::commit`] as a single checksummed record. Reopening a log
//! replays records in order and discards a torn or corrupted tail, so a crash
//! loses at most the writes made since the previous commit.

mod database;
mod device;
mod error;

pub use database::{BTreeDatabase, FORMAT_VERSION};
pub use device::{FileDevice, MemoryDevice, StorageDevice};
pub use error::StorageError;

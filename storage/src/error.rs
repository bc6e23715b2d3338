use std::io;

use thiserror::Error;

/// Failure raised by the storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying device failed.
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The log header or a committed record is unreadable.
    #[error("storage is corrupted: {0}")]
    Corrupted(String),
    /// The log was written for different content or a different key size.
    #[error("storage holds '{found}' with key size {found_key_size}, expected '{expected}' with key size {expected_key_size}")]
    Mismatch {
        /// Content identifier requested by the caller.
        expected: String,
        /// Key size requested by the caller.
        expected_key_size: usize,
        /// Content identifier found in the header.
        found: String,
        /// Key size found in the header.
        found_key_size: usize,
    },
    /// A key did not have the configured length.
    #[error("key has {found} byte(s), database keys are {expected} byte(s)")]
    KeySize {
        /// Configured key length.
        expected: usize,
        /// Length of the offending key.
        found: usize,
    },
}

use orbitile_storage::StorageError;
use thiserror::Error;

/// Failure raised by the celestial database.
#[derive(Debug, Error)]
pub enum CelestialError {
    /// The generation config is not valid JSON for its schema.
    #[error("malformed celestial generation config: {0}")]
    Config(#[from] serde_json::Error),
    /// The generation config parsed but references missing entries.
    #[error("invalid celestial generation config: {0}")]
    InvalidConfig(String),
    /// The backing chunk store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A chunk or protocol message could not be encoded or decoded.
    #[error("celestial codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl CelestialError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

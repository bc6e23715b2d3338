use orbitile_core::CodecError;
use thiserror::Error;

/// Failure raised while applying replicated state.
#[derive(Debug, Error)]
pub enum NetError {
    /// The byte stream was truncated or held a malformed number.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A delta named an element the group does not have.
    #[error("delta names element {index} but the group has {count}")]
    UnknownElement {
        /// One-based index read from the delta.
        index: u64,
        /// Elements in the group.
        count: usize,
    },
    /// Delta entries were not in ascending element order.
    #[error("delta element {index} is out of order")]
    OutOfOrder {
        /// One-based index read from the delta.
        index: u64,
    },
    /// An enum discriminant has no matching variant.
    #[error("no variant with index {0}")]
    InvalidEnum(u64),
    /// A JSON field did not parse.
    #[error("invalid json value: {0}")]
    Json(#[from] serde_json::Error),
    /// A state header byte was neither full nor delta.
    #[error("unknown net state kind {0}")]
    UnknownStateKind(u8),
    /// A value sent in its printed form did not parse.
    #[error("malformed replicated text: {0}")]
    InvalidText(String),
    /// Bytes remained after the state was applied.
    #[error("{0} trailing bytes after net state")]
    TrailingBytes(usize),
}

use orbitile_core::{CodecError, CoordinateParseError};
use orbitile_net::NetError;
use orbitile_world::WorldChunksError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised while parsing a [`WorldId`](crate::WorldId).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldIdParseError {
    /// The kind before the first `:` is not a world kind.
    #[error("unknown world kind '{0}'")]
    UnknownKind(String),
    /// The kind needs a payload after `:`.
    #[error("world kind '{0}' needs a payload")]
    MissingPayload(String),
    /// A celestial world named a malformed coordinate.
    #[error(transparent)]
    Coordinate(#[from] CoordinateParseError),
    /// A ship or instance world named a malformed uuid.
    #[error(transparent)]
    Uuid(#[from] UuidParseError),
    /// An instance name was empty or contained `:` or `=`.
    #[error("invalid instance name '{0}'")]
    InstanceName(String),
    /// An instance level was not a finite number.
    #[error("invalid instance level '{0}'")]
    InstanceLevel(String),
    /// An instance world had more than three parts.
    #[error("instance world '{0}' has too many parts")]
    InstanceParts(String),
}

/// Failure raised while parsing a [`Uuid`](crate::Uuid).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("uuid '{0}' is not 32 lowercase hex digits")]
pub struct UuidParseError(pub String);

/// Failure raised while parsing a [`WarpAction`](crate::WarpAction).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WarpActionParseError {
    /// The warp named a malformed world.
    #[error(transparent)]
    World(#[from] WorldIdParseError),
    /// The warp named a malformed player uuid.
    #[error(transparent)]
    Player(#[from] UuidParseError),
    /// A `=` was followed by nothing.
    #[error("warp to '{0}' has an empty spawn target")]
    EmptySpawn(String),
    /// An entity name that would print as a position or a column.
    #[error("'{0}' cannot name a spawn entity; it reads as a tile position or column")]
    AmbiguousEntityName(String),
}

/// Failure of a remote procedure call.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcError {
    /// No handler is registered for the method.
    #[error("unknown rpc method '{0}'")]
    UnknownMethod(String),
    /// A message batch or the arguments of a call did not decode.
    #[error("malformed rpc payload: {0}")]
    Malformed(String),
    /// The handler refused the call.
    #[error("rpc call failed: {0}")]
    Failed(String),
}

/// Failure raised while exchanging context updates.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The update bundle was truncated.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The replicated state did not apply.
    #[error(transparent)]
    Net(#[from] NetError),
    /// The rpc batch did not decode.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The ship chunk update did not decode.
    #[error(transparent)]
    Chunks(#[from] WorldChunksError),
    /// Bytes remained after the bundle.
    #[error("{0} trailing bytes after context update")]
    TrailingBytes(usize),
}

#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! State that rides with every client connection.
//!
//! A [`ServerClientContext`] on the server and a [`ClientContext`] on the
//! client exchange update bundles: a [`JsonRpc`] call batch, the replicated
//! per-player state (world, warp, team, ship upgrades) and changes to the
//! player's ship world. The crate also names worlds ([`WorldId`]), warp
//! intents ([`WarpAction`]) and turns celestial bodies into
//! [`WorldTemplate`]s.

mod context;
mod error;
mod rpc;
mod ship;
mod template;
mod uuid;
mod warping;

pub use context::{
    ClientContext, ServerClientContext, ServerContextHost, METHOD_APPLY_SHIP_UPGRADES,
    METHOD_CONTAINER_PUT_ITEMS, METHOD_SET_SHIP_SPECIES, METHOD_SET_UNIVERSE_FLAG,
};
pub use error::{ContextError, RpcError, UuidParseError, WarpActionParseError, WorldIdParseError};
pub use rpc::{JsonRpc, RpcHandle};
pub use ship::{EntityDamageTeam, ShipUpgrades, TeamKind};
pub use template::WorldTemplate;
pub use uuid::Uuid;
pub use warping::{SpawnTarget, WarpAction, WarpAlias, WarpToWorld, WorldId};

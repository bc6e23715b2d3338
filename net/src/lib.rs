#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Versioned state trees replicated between a master and its slaves.
//!
//! Stateful objects group their replicated fields in a [`NetGroup`] and wrap
//! it in a [`NetTopGroup`]. Every change stamps the field with the tree's
//! current version, so the master can answer "what changed since version
//! `v`" with a delta holding only those fields. Trees are owned by a single
//! thread; bytes are what crosses threads.

mod element;
mod error;
mod field;
mod group;
mod value;
mod version;

pub use element::NetElement;
pub use error::NetError;
pub use field::{NetEvent, NetField, NetFloat};
pub use group::{NetGroup, NetSubGroup, NetTopGroup};
pub use value::{NetEnum, NetValue};
pub use version::{NetCompatibilityRules, NetElementVersion};

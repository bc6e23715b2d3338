#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Composable procedural terrain signals.
//!
//! A terrain selector answers `get(x, y)` with a float where non-negative
//! means solid and negative means open. Selectors are described by a type
//! tag, a JSON config, and a [`TerrainSelectorParameters`] block; the same
//! description always rebuilds a selector with bit-identical output.

mod database;
mod error;
mod factory;
mod parameters;
pub mod selectors;

use std::fmt;

use serde_json::Value;

pub use database::TerrainDatabase;
pub use error::TerrainError;
pub use factory::{create_selector_type, SelectorDescription, SELECTOR_KINDS};
pub use parameters::TerrainSelectorParameters;
pub use selectors::karst_cave::{KarstCaveSelector, LayerSlice};

/// Behaviour shared by every selector implementation.
pub trait TerrainSelector: Send + Sync {
    /// Samples the signal at an integer world position.
    fn get(&self, x: i32, y: i32) -> f32;
}

/// A selector together with the description it was built from.
pub struct Selector {
    kind: String,
    config: Value,
    parameters: TerrainSelectorParameters,
    function: Box<dyn TerrainSelector>,
}

impl Selector {
    pub(crate) fn new(
        kind: &str,
        config: Value,
        parameters: TerrainSelectorParameters,
        function: Box<dyn TerrainSelector>,
    ) -> Self {
        Self {
            kind: kind.to_owned(),
            config,
            parameters,
            function,
        }
    }

    /// Samples the signal at an integer world position.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> f32 {
        self.function.get(x, y)
    }

    /// Type tag the selector was created with.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// JSON config the selector was created with.
    #[must_use]
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Parameter block the selector was created with.
    #[must_use]
    pub fn parameters(&self) -> &TerrainSelectorParameters {
        &self.parameters
    }
}

impl TerrainSelector for Selector {
    fn get(&self, x: i32, y: i32) -> f32 {
        self.function.get(x, y)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

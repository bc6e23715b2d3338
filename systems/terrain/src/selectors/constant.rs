//! Uniform signal.

use serde::Deserialize;

use crate::TerrainSelector;

/// Config of [`ConstantSelector`].
#[derive(Clone, Debug, Deserialize)]
pub struct ConstantConfig {
    /// Value returned everywhere.
    pub value: f32,
}

/// Returns the same value at every position.
#[derive(Debug)]
pub struct ConstantSelector {
    value: f32,
}

impl ConstantSelector {
    /// Builds the selector.
    #[must_use]
    pub fn new(config: ConstantConfig) -> Self {
        Self {
            value: config.value,
        }
    }
}

impl TerrainSelector for ConstantSelector {
    fn get(&self, _x: i32, _y: i32) -> f32 {
        self.value
    }
}

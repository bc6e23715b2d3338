//! Blend of two selectors.

use serde::Deserialize;

use crate::{
    factory::SelectorDescription, Selector, TerrainError, TerrainSelector,
    TerrainSelectorParameters,
};

/// Config of [`MixSelector`].
#[derive(Clone, Debug, Deserialize)]
pub struct MixConfig {
    /// Signal weighted by `1 - t`.
    pub a: SelectorDescription,
    /// Signal weighted by `t`.
    pub b: SelectorDescription,
    /// Blend factor `t`.
    pub mix: SelectorDescription,
}

/// Returns `a * (1 - t) + b * t`.
#[derive(Debug)]
pub struct MixSelector {
    a: Selector,
    b: Selector,
    mix: Selector,
}

impl MixSelector {
    /// Builds the selector and its three children with independent seeds.
    pub fn new(config: MixConfig, parameters: TerrainSelectorParameters) -> Result<Self, TerrainError> {
        Ok(Self {
            a: config.a.build(parameters.derived("a"))?,
            b: config.b.build(parameters.derived("b"))?,
            mix: config.mix.build(parameters.derived("mix"))?,
        })
    }
}

impl TerrainSelector for MixSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let t = self.mix.get(x, y);
        self.a.get(x, y) * (1.0 - t) + self.b.get(x, y) * t
    }
}

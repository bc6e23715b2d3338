//! Rotation of the query position.

use orbitile_core::math;
use serde::Deserialize;

use crate::{
    factory::SelectorDescription, Selector, TerrainError, TerrainSelector,
    TerrainSelectorParameters,
};

/// Config of [`RotateSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateConfig {
    /// Selector being rotated.
    pub source: SelectorDescription,
    /// Rotation in radians, counter-clockwise.
    pub rotation: f32,
    /// Pivot; defaults to `(worldWidth / 2, 0)`.
    pub rotation_center: Option<[f32; 2]>,
}

/// Samples `source` at the query position rotated about a pivot.
#[derive(Debug)]
pub struct RotateSelector {
    source: Selector,
    cos: f32,
    sin: f32,
    center: [f32; 2],
}

impl RotateSelector {
    /// Builds the selector and its child.
    pub fn new(
        config: RotateConfig,
        parameters: TerrainSelectorParameters,
    ) -> Result<Self, TerrainError> {
        Ok(Self {
            source: config.source.build(parameters)?,
            cos: math::cosf(config.rotation),
            sin: math::sinf(config.rotation),
            center: config
                .rotation_center
                .unwrap_or([parameters.world_width as f32 / 2.0, 0.0]),
        })
    }
}

impl TerrainSelector for RotateSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let dx = x as f32 - self.center[0];
        let dy = y as f32 - self.center[1];
        let rx = dx * self.cos - dy * self.sin + self.center[0];
        let ry = dx * self.sin + dy * self.cos + self.center[1];
        self.source.get(rx.round() as i32, ry.round() as i32)
    }
}

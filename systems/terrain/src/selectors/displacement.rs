//! Domain warping.

use serde::Deserialize;

use crate::{
    factory::SelectorDescription, Selector, TerrainError, TerrainSelector,
    TerrainSelectorParameters,
};

/// Config of [`DisplacementSelector`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacementConfig {
    /// Selector being displaced.
    pub source: SelectorDescription,
    /// Horizontal offset signal.
    pub x_displacement: Option<SelectorDescription>,
    /// Vertical offset signal.
    pub y_displacement: Option<SelectorDescription>,
    /// Optional `[min, max]` clamp applied to the horizontal offset.
    pub x_clamp: Option<[f32; 2]>,
    /// Optional `[min, max]` clamp applied to the vertical offset.
    pub y_clamp: Option<[f32; 2]>,
}

/// Samples `source` at a position offset by two other selectors.
#[derive(Debug)]
pub struct DisplacementSelector {
    source: Selector,
    x_displacement: Option<Selector>,
    y_displacement: Option<Selector>,
    x_clamp: Option<[f32; 2]>,
    y_clamp: Option<[f32; 2]>,
}

impl DisplacementSelector {
    /// Builds the selector and its children.
    ///
    /// The offset children get seeds derived from the parent so that x and
    /// y displacement never correlate.
    pub fn new(
        config: DisplacementConfig,
        parameters: TerrainSelectorParameters,
    ) -> Result<Self, TerrainError> {
        let build = |description: Option<SelectorDescription>, label: &str| {
            description
                .map(|description| description.build(parameters.derived(label)))
                .transpose()
        };
        Ok(Self {
            source: config.source.build(parameters)?,
            x_displacement: build(config.x_displacement, "xDisplacement")?,
            y_displacement: build(config.y_displacement, "yDisplacement")?,
            x_clamp: config.x_clamp,
            y_clamp: config.y_clamp,
        })
    }
}

fn offset(selector: Option<&Selector>, clamp: Option<[f32; 2]>, x: i32, y: i32) -> i32 {
    let Some(selector) = selector else {
        return 0;
    };
    let mut value = selector.get(x, y);
    if let Some([min, max]) = clamp {
        value = value.clamp(min.min(max), max.max(min));
    }
    value.round() as i32
}

impl TerrainSelector for DisplacementSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let dx = offset(self.x_displacement.as_ref(), self.x_clamp, x, y);
        let dy = offset(self.y_displacement.as_ref(), self.y_clamp, x, y);
        self.source.get(x.wrapping_add(dx), y.wrapping_add(dy))
    }
}

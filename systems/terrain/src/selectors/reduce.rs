//! Pointwise reductions over a list of selectors.

use serde::Deserialize;

use crate::{
    factory::SelectorDescription, Selector, TerrainError, TerrainSelector,
    TerrainSelectorParameters,
};

/// Config shared by the `min`, `max` and `minmax` kinds.
#[derive(Clone, Debug, Deserialize)]
pub struct ReduceConfig {
    /// Inputs; must not be empty.
    pub sources: Vec<SelectorDescription>,
}

/// Reduction applied across sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reduction {
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Largest value when any is positive, otherwise the most negative.
    MinMax,
}

/// Combines several selectors with a [`Reduction`].
#[derive(Debug)]
pub struct ReduceSelector {
    reduction: Reduction,
    sources: Vec<Selector>,
}

impl ReduceSelector {
    /// Builds the selector. Sources share the parent parameters.
    pub fn new(
        kind: &str,
        reduction: Reduction,
        config: ReduceConfig,
        parameters: TerrainSelectorParameters,
    ) -> Result<Self, TerrainError> {
        if config.sources.is_empty() {
            return Err(TerrainError::bad_config(kind, "sources must not be empty"));
        }
        let sources = config
            .sources
            .iter()
            .map(|description| description.build(parameters))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { reduction, sources })
    }
}

impl TerrainSelector for ReduceSelector {
    fn get(&self, x: i32, y: i32) -> f32 {
        let values = self.sources.iter().map(|source| source.get(x, y));
        match self.reduction {
            Reduction::Min => values.fold(f32::INFINITY, f32::min),
            Reduction::Max => values.fold(f32::NEG_INFINITY, f32::max),
            Reduction::MinMax => {
                let (lowest, highest) = values.fold(
                    (f32::INFINITY, f32::NEG_INFINITY),
                    |(lowest, highest), value| (lowest.min(value), highest.max(value)),
                );
                if highest > 0.0 {
                    highest
                } else {
                    lowest
                }
            }
        }
    }
}

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    selectors::{
        cache::CacheSelector,
        constant::ConstantSelector,
        displacement::DisplacementSelector,
        karst_cave::KarstCaveSelector,
        mix::MixSelector,
        perlin::PerlinSelector,
        reduce::{Reduction, ReduceSelector},
        ridge_blocks::RidgeBlocksSelector,
        rotate::RotateSelector,
        surface::{FlatSurfaceSelector, IslandSurfaceSelector},
        worm_cave::WormCaveSelector,
    },
    Selector, TerrainError, TerrainSelector, TerrainSelectorParameters,
};

/// Every type tag accepted by [`create_selector_type`].
pub const SELECTOR_KINDS: &[&str] = &[
    "constant",
    "perlin",
    "flatSurface",
    "islandSurface",
    "displacement",
    "rotate",
    "mix",
    "min",
    "max",
    "minmax",
    "ridgeblocks",
    "wormcave",
    "karstcave",
    "cache",
];

/// Type tag and config of a selector, as nested inside composite configs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectorDescription {
    /// Selector kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific config.
    #[serde(default)]
    pub config: Value,
}

impl SelectorDescription {
    /// Builds the described selector.
    pub fn build(&self, parameters: TerrainSelectorParameters) -> Result<Selector, TerrainError> {
        create_selector_type(&self.kind, &self.config, parameters)
    }
}

/// Builds a selector of kind `kind` from its JSON config.
pub fn create_selector_type(
    kind: &str,
    config: &Value,
    parameters: TerrainSelectorParameters,
) -> Result<Selector, TerrainError> {
    let function: Box<dyn TerrainSelector> = match kind {
        "constant" => Box::new(ConstantSelector::new(parse(kind, config)?)),
        "perlin" => Box::new(PerlinSelector::new(parse(kind, config)?, parameters)),
        "flatSurface" => Box::new(FlatSurfaceSelector::new(parse(kind, config)?, parameters)),
        "islandSurface" => Box::new(IslandSurfaceSelector::new(parse(kind, config)?, parameters)),
        "displacement" => Box::new(DisplacementSelector::new(parse(kind, config)?, parameters)?),
        "rotate" => Box::new(RotateSelector::new(parse(kind, config)?, parameters)?),
        "mix" => Box::new(MixSelector::new(parse(kind, config)?, parameters)?),
        "min" => Box::new(ReduceSelector::new(kind, Reduction::Min, parse(kind, config)?, parameters)?),
        "max" => Box::new(ReduceSelector::new(kind, Reduction::Max, parse(kind, config)?, parameters)?),
        "minmax" => Box::new(ReduceSelector::new(kind, Reduction::MinMax, parse(kind, config)?, parameters)?),
        "ridgeblocks" => Box::new(RidgeBlocksSelector::new(parse(kind, config)?, parameters)),
        "wormcave" => Box::new(WormCaveSelector::new(parse(kind, config)?, parameters)?),
        "karstcave" => Box::new(KarstCaveSelector::new(parse(kind, config)?, parameters)?),
        "cache" => Box::new(CacheSelector::new(parse(kind, config)?, parameters)?),
        _ => return Err(TerrainError::UnknownSelector(kind.to_owned())),
    };
    Ok(Selector::new(kind, config.clone(), parameters, function))
}

pub(crate) fn parse<T: DeserializeOwned>(kind: &str, config: &Value) -> Result<T, TerrainError> {
    let config = if config.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        config.clone()
    };
    serde_json::from_value(config).map_err(|error| TerrainError::bad_config(kind, error))
}

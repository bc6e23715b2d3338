//! Per-body generated parameters.

use orbitile_core::CelestialCoordinate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generated description of a system, planet, or satellite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialParameters {
    /// Body this describes.
    pub coordinate: CelestialCoordinate,
    /// Seed for anything generated from this body.
    pub seed: u64,
    /// Display name.
    pub name: String,
    /// Merged base and variation parameters, including `typeName`.
    #[serde(with = "json_value")]
    pub parameters: Value,
    /// World parameters when the body can be visited.
    pub visitable: Option<VisitableWorldParameters>,
}

impl CelestialParameters {
    /// Type name recorded in the parameters.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.parameters.get("typeName").and_then(Value::as_str)
    }

    /// A single parameter by key.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Reports whether a world can be generated for this body.
    #[must_use]
    pub fn is_visitable(&self) -> bool {
        self.visitable
            .as_ref()
            .is_some_and(|visitable| !matches!(visitable, VisitableWorldParameters::GasGiant(_)))
    }
}

/// Fields every visitable world carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisitableCommon {
    /// World type name.
    pub type_name: String,
    /// Difficulty of the world.
    pub threat_level: f32,
    /// World dimensions in tiles.
    pub world_size: [u32; 2],
    /// Gravity applied in the world.
    pub gravity: f32,
    /// Whether the world lacks breathable air.
    pub airless: bool,
}

/// World parameters of a visitable body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VisitableWorldParameters {
    /// Surface world.
    Terrestrial {
        /// Shared fields.
        common: VisitableCommon,
        /// Biome covering most of the surface.
        primary_biome: String,
        /// Liquid filling oceans and pools, if any.
        primary_liquid: Option<String>,
        /// Hue rotation applied to the biome palette.
        hue_shift: f32,
        /// Size name the dimensions came from.
        size_name: String,
    },
    /// Asteroid field.
    Asteroids(VisitableCommon),
    /// Single floating dungeon.
    FloatingDungeon {
        /// Shared fields.
        common: VisitableCommon,
        /// Dungeon placed in the world.
        dungeon: String,
    },
    /// Gas giant; has parameters but no landable world.
    GasGiant(VisitableCommon),
}

impl VisitableWorldParameters {
    /// Shared fields of any variant.
    #[must_use]
    pub fn common(&self) -> &VisitableCommon {
        match self {
            Self::Terrestrial { common, .. } | Self::FloatingDungeon { common, .. } => common,
            Self::Asteroids(common) | Self::GasGiant(common) => common,
        }
    }
}

/// JSON values travel as text through binary formats, which cannot
/// self-describe arbitrary trees.
mod json_value {
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub(super) fn serialize<S: Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            value.serialize(serializer)
        } else {
            serializer.serialize_str(&value.to_string())
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        if deserializer.is_human_readable() {
            Value::deserialize(deserializer)
        } else {
            let text = String::deserialize(deserializer)?;
            serde_json::from_str(&text).map_err(D::Error::custom)
        }
    }
}

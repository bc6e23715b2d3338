//! World addresses and warp intents, with their printed forms.

use std::{fmt, str::FromStr};

use orbitile_core::{ByteReader, ByteWriter, CelestialCoordinate, IVec2};
use orbitile_net::{NetError, NetValue};
use serde::{Deserialize, Serialize};

use crate::{Uuid, WarpActionParseError, WorldIdParseError};

const ABSENT: &str = "-";

/// Address of a world a player can be in.
///
/// Printed as `Kind:payload`, for example `CelestialWorld:1:2:3:4`,
/// `ClientShipWorld:<uuid>` or `InstanceWorld:<name>:<uuid or ->:<level or ->`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorldId {
    /// Planet or satellite on the star map.
    CelestialWorld(CelestialCoordinate),
    /// A player's ship.
    ClientShipWorld(Uuid),
    /// A named instance, optionally private and levelled.
    InstanceWorld {
        /// Instance template name.
        instance: String,
        /// Distinguishes private copies of the same instance.
        uuid: Option<Uuid>,
        /// Threat level override.
        level: Option<f32>,
    },
    /// Not in any world.
    #[default]
    Nowhere,
}

impl WorldId {
    /// Instance world, rejecting names the printed form cannot carry.
    pub fn instance(
        instance: impl Into<String>,
        uuid: Option<Uuid>,
        level: Option<f32>,
    ) -> Result<Self, WorldIdParseError> {
        let instance = instance.into();
        if !valid_instance_name(&instance) {
            return Err(WorldIdParseError::InstanceName(instance));
        }
        if level.is_some_and(|level| !level.is_finite()) {
            return Err(WorldIdParseError::InstanceLevel(format!("{level:?}")));
        }
        Ok(Self::InstanceWorld {
            instance,
            uuid,
            level,
        })
    }

    /// Reports whether this names a world at all.
    #[must_use]
    pub fn is_somewhere(&self) -> bool {
        !matches!(self, Self::Nowhere)
    }
}

fn valid_instance_name(name: &str) -> bool {
    !name.is_empty() && !name.contains([':', '='])
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CelestialWorld(coordinate) => write!(f, "CelestialWorld:{coordinate}"),
            Self::ClientShipWorld(uuid) => write!(f, "ClientShipWorld:{uuid}"),
            Self::InstanceWorld {
                instance,
                uuid,
                level,
            } => {
                write!(f, "InstanceWorld:{instance}:")?;
                match uuid {
                    Some(uuid) => write!(f, "{uuid}:")?,
                    None => write!(f, "{ABSENT}:")?,
                }
                match level {
                    Some(level) => write!(f, "{level}"),
                    None => f.write_str(ABSENT),
                }
            }
            Self::Nowhere => f.write_str("Nowhere"),
        }
    }
}

impl FromStr for WorldId {
    type Err = WorldIdParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (kind, payload) = match text.split_once(':') {
            Some((kind, payload)) => (kind, Some(payload)),
            None => (text, None),
        };
        if kind == "Nowhere" {
            return Ok(Self::Nowhere);
        }
        let payload = match payload {
            Some(payload) if !payload.is_empty() => payload,
            _ if matches!(kind, "CelestialWorld" | "ClientShipWorld" | "InstanceWorld") => {
                return Err(WorldIdParseError::MissingPayload(kind.to_owned()))
            }
            _ => return Err(WorldIdParseError::UnknownKind(kind.to_owned())),
        };
        match kind {
            "CelestialWorld" => Ok(Self::CelestialWorld(payload.parse()?)),
            "ClientShipWorld" => Ok(Self::ClientShipWorld(payload.parse()?)),
            "InstanceWorld" => parse_instance(payload),
            other => Err(WorldIdParseError::UnknownKind(other.to_owned())),
        }
    }
}

fn parse_instance(payload: &str) -> Result<WorldId, WorldIdParseError> {
    let parts: Vec<&str> = payload.split(':').collect();
    if parts.len() > 3 {
        return Err(WorldIdParseError::InstanceParts(payload.to_owned()));
    }
    let uuid = match parts.get(1) {
        None | Some(&ABSENT) => None,
        Some(text) => Some(text.parse()?),
    };
    let level = match parts.get(2) {
        None | Some(&ABSENT) => None,
        Some(text) => match text.parse::<f32>() {
            Ok(level) if level.is_finite() => Some(level),
            _ => return Err(WorldIdParseError::InstanceLevel((*text).to_owned())),
        },
    };
    WorldId::instance(parts[0], uuid, level)
}

impl TryFrom<String> for WorldId {
    type Error = WorldIdParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<WorldId> for String {
    fn from(world: WorldId) -> Self {
        world.to_string()
    }
}

impl NetValue for WorldId {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.to_string());
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        reader
            .read_string()?
            .parse()
            .map_err(|error: WorldIdParseError| NetError::InvalidText(error.to_string()))
    }
}

/// Where to appear in the destination world.
///
/// Printed as `x.y` for a tile position, `x` for a column, or the unique name
/// of an entity to appear next to. Names that read as a position or a column
/// do not survive printing; [`SpawnTarget::unique_entity`] rejects them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpawnTarget {
    /// Tile position.
    Position(IVec2),
    /// Column; the world picks the height.
    X(i32),
    /// Next to the entity with this unique name. Build it with
    /// [`SpawnTarget::unique_entity`] to keep the printed form unambiguous.
    UniqueEntity(String),
}

impl fmt::Display for SpawnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(position) => write!(f, "{}.{}", position.x, position.y),
            Self::X(x) => write!(f, "{x}"),
            Self::UniqueEntity(name) => f.write_str(name),
        }
    }
}

impl SpawnTarget {
    /// Target next to the entity named `name`.
    ///
    /// Fails for empty names and for names such as `5` or `1.2` that would
    /// parse back as a column or a position.
    pub fn unique_entity(name: impl Into<String>) -> Result<Self, WarpActionParseError> {
        let name = name.into();
        if name.is_empty() || !matches!(Self::parse(&name), Self::UniqueEntity(_)) {
            return Err(WarpActionParseError::AmbiguousEntityName(name));
        }
        Ok(Self::UniqueEntity(name))
    }

    /// Parses the printed form; anything that is not numeric names an entity.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Some((x, y)) = text.split_once('.') {
            if let (Ok(x), Ok(y)) = (x.parse(), y.parse()) {
                return Self::Position(IVec2::new(x, y));
            }
        }
        match text.parse() {
            Ok(x) => Self::X(x),
            Err(_) => Self::UniqueEntity(text.to_owned()),
        }
    }
}

/// Warp to a world, optionally at a spawn target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarpToWorld {
    /// Destination world.
    pub world: WorldId,
    /// Arrival point; the world's default spawn when absent.
    pub target: Option<SpawnTarget>,
}

impl WarpToWorld {
    /// Warp to `world` at its default spawn.
    #[must_use]
    pub fn new(world: WorldId) -> Self {
        Self {
            world,
            target: None,
        }
    }

    /// Copy arriving at `target`.
    #[must_use]
    pub fn at(self, target: SpawnTarget) -> Self {
        Self {
            target: Some(target),
            ..self
        }
    }
}

impl fmt::Display for WarpToWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.world)?;
        if let Some(target) = &self.target {
            write!(f, "={target}")?;
        }
        Ok(())
    }
}

/// Destinations resolved by the server from the player's situation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarpAlias {
    /// The world the player last warped from.
    Return,
    /// The world the player's ship is orbiting.
    OrbitedWorld,
    /// The player's own ship.
    OwnShip,
}

impl WarpAlias {
    fn name(self) -> &'static str {
        match self {
            Self::Return => "Return",
            Self::OrbitedWorld => "OrbitedWorld",
            Self::OwnShip => "OwnShip",
        }
    }
}

/// A one-shot teleport intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WarpAction {
    /// To a world.
    ToWorld(WarpToWorld),
    /// To wherever another player is.
    ToPlayer(Uuid),
    /// To a symbolic destination.
    Alias(WarpAlias),
}

impl fmt::Display for WarpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToWorld(warp) => write!(f, "{warp}"),
            Self::ToPlayer(uuid) => write!(f, "Player:{uuid}"),
            Self::Alias(alias) => f.write_str(alias.name()),
        }
    }
}

impl FromStr for WarpAction {
    type Err = WarpActionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        for alias in [WarpAlias::Return, WarpAlias::OrbitedWorld, WarpAlias::OwnShip] {
            if text == alias.name() {
                return Ok(Self::Alias(alias));
            }
        }
        if let Some(uuid) = text.strip_prefix("Player:") {
            return Ok(Self::ToPlayer(uuid.parse()?));
        }
        let (world, target) = match text.split_once('=') {
            Some((_, "")) => return Err(WarpActionParseError::EmptySpawn(text.to_owned())),
            Some((world, spawn)) => (world, Some(SpawnTarget::parse(spawn))),
            None => (text, None),
        };
        Ok(Self::ToWorld(WarpToWorld {
            world: world.parse()?,
            target,
        }))
    }
}

impl TryFrom<String> for WarpAction {
    type Error = WarpActionParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<WarpAction> for String {
    fn from(action: WarpAction) -> Self {
        action.to_string()
    }
}

impl NetValue for WarpAction {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_string(&self.to_string());
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        reader
            .read_string()?
            .parse()
            .map_err(|error: WarpActionParseError| NetError::InvalidText(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use orbitile_core::IVec3;

    use super::*;

    #[test]
    fn world_ids_print_kind_and_payload() {
        let planet = WorldId::CelestialWorld(CelestialCoordinate::planet(IVec3::new(1, -2, 3), 4));
        assert_eq!(planet.to_string(), "CelestialWorld:1:-2:3:4");
        let dungeon = WorldId::instance("outpost", None, Some(2.5)).expect("valid");
        assert_eq!(dungeon.to_string(), "InstanceWorld:outpost:-:2.5");
        assert_eq!("InstanceWorld:outpost".parse::<WorldId>(), WorldId::instance("outpost", None, None));
        assert_eq!("Nowhere".parse::<WorldId>(), Ok(WorldId::Nowhere));
    }

    #[test]
    fn ill_formed_world_ids_are_rejected() {
        assert_eq!(
            "Moon:1".parse::<WorldId>(),
            Err(WorldIdParseError::UnknownKind("Moon".to_owned()))
        );
        assert_eq!(
            "ClientShipWorld".parse::<WorldId>(),
            Err(WorldIdParseError::MissingPayload("ClientShipWorld".to_owned()))
        );
        assert!(matches!(
            "CelestialWorld:1:2".parse::<WorldId>(),
            Err(WorldIdParseError::Coordinate(_))
        ));
        assert!(matches!(
            "InstanceWorld:a:-:high".parse::<WorldId>(),
            Err(WorldIdParseError::InstanceLevel(_))
        ));
        assert!(matches!(
            "InstanceWorld:a:-:-:extra".parse::<WorldId>(),
            Err(WorldIdParseError::InstanceParts(_))
        ));
        assert!(WorldId::instance("a=b", None, None).is_err());
    }

    #[test]
    fn warp_actions_parse_every_form() {
        assert_eq!(
            "OwnShip".parse::<WarpAction>(),
            Ok(WarpAction::Alias(WarpAlias::OwnShip))
        );
        let uuid = Uuid::from_bytes([7; 16]);
        assert_eq!(
            format!("Player:{uuid}").parse::<WarpAction>(),
            Ok(WarpAction::ToPlayer(uuid))
        );

        let warp: WarpAction = "InstanceWorld:arena:-:-=-12.40".parse().expect("valid");
        let WarpAction::ToWorld(warp) = warp else {
            panic!("expected a world warp");
        };
        assert_eq!(warp.target, Some(SpawnTarget::Position(IVec2::new(-12, 40))));
        assert_eq!(
            "Nowhere=7".parse::<WarpAction>(),
            Ok(WarpAction::ToWorld(
                WarpToWorld::new(WorldId::Nowhere).at(SpawnTarget::X(7))
            ))
        );
        assert_eq!(
            "Nowhere=door.left".parse::<WarpAction>(),
            Ok(WarpAction::ToWorld(
                WarpToWorld::new(WorldId::Nowhere)
                    .at(SpawnTarget::UniqueEntity("door.left".to_owned()))
            ))
        );
        assert!(matches!(
            "Nowhere=".parse::<WarpAction>(),
            Err(WarpActionParseError::EmptySpawn(_))
        ));
    }

    #[test]
    fn entity_names_that_read_as_numbers_are_rejected() {
        for name in ["5", "-3", "1.2", "-4.-8", ""] {
            assert_eq!(
                SpawnTarget::unique_entity(name),
                Err(WarpActionParseError::AmbiguousEntityName(name.to_owned()))
            );
        }
        for name in ["door.left", "5a", "1.2.3", "gate"] {
            let target = SpawnTarget::unique_entity(name).expect("unambiguous name");
            assert_eq!(SpawnTarget::parse(&target.to_string()), target);
        }
    }

    #[test]
    fn serde_uses_the_printed_form() {
        let action = WarpAction::ToWorld(WarpToWorld::new(WorldId::ClientShipWorld(
            Uuid::from_bytes([1; 16]),
        )));
        let json = serde_json::to_string(&action).expect("serializes");
        assert_eq!(json, format!("\"ClientShipWorld:{}\"", "01".repeat(16)));
        assert_eq!(serde_json::from_str::<WarpAction>(&json).expect("parses"), action);
    }
}

//! Per-player ship progression and damage teams.

use std::collections::BTreeSet;

use orbitile_core::{ByteReader, ByteWriter};
use orbitile_net::{NetEnum, NetError, NetValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RpcError;

/// Upgrades a player has bought for their ship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipUpgrades {
    /// Ship tier.
    pub ship_level: u32,
    /// Fuel tank capacity.
    pub max_fuel: u32,
    /// Crew members the ship can hold.
    pub crew_size: u32,
    /// Multiplier on fuel spent per jump.
    pub fuel_efficiency: f32,
    /// Travel speed between systems.
    pub ship_speed: f32,
    /// Unlocked ship features such as `teleport` or `planetTravel`.
    pub capabilities: BTreeSet<String>,
}

impl Default for ShipUpgrades {
    fn default() -> Self {
        Self {
            ship_level: 0,
            max_fuel: 0,
            crew_size: 0,
            fuel_efficiency: 1.0,
            ship_speed: 0.0,
            capabilities: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipUpgradesDelta {
    ship_level: Option<u32>,
    max_fuel: Option<u32>,
    crew_size: Option<u32>,
    fuel_efficiency: Option<f32>,
    ship_speed: Option<f32>,
    capabilities: Option<Vec<String>>,
}

impl ShipUpgrades {
    /// Copy with the fields present in `delta` replaced; capabilities are
    /// added to the existing set.
    pub fn apply(&self, delta: &Value) -> Result<Self, RpcError> {
        let delta = ShipUpgradesDelta::deserialize(delta)
            .map_err(|error| RpcError::Malformed(error.to_string()))?;
        let mut upgrades = self.clone();
        if let Some(level) = delta.ship_level {
            upgrades.ship_level = level;
        }
        if let Some(fuel) = delta.max_fuel {
            upgrades.max_fuel = fuel;
        }
        if let Some(crew) = delta.crew_size {
            upgrades.crew_size = crew;
        }
        if let Some(efficiency) = delta.fuel_efficiency {
            upgrades.fuel_efficiency = efficiency;
        }
        if let Some(speed) = delta.ship_speed {
            upgrades.ship_speed = speed;
        }
        upgrades
            .capabilities
            .extend(delta.capabilities.into_iter().flatten());
        Ok(upgrades)
    }

    /// Reports whether `capability` is unlocked.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

impl NetValue for ShipUpgrades {
    fn write_value(&self, writer: &mut ByteWriter) {
        writer.write_vlq_u(u64::from(self.ship_level));
        writer.write_vlq_u(u64::from(self.max_fuel));
        writer.write_vlq_u(u64::from(self.crew_size));
        writer.write_f32(self.fuel_efficiency);
        writer.write_f32(self.ship_speed);
        writer.write_vlq_u(self.capabilities.len() as u64);
        for capability in &self.capabilities {
            writer.write_string(capability);
        }
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        let ship_level = read_u32(reader)?;
        let max_fuel = read_u32(reader)?;
        let crew_size = read_u32(reader)?;
        let fuel_efficiency = reader.read_f32()?;
        let ship_speed = reader.read_f32()?;
        let count = reader.read_vlq_u()?;
        let mut capabilities = BTreeSet::new();
        for _ in 0..count {
            let _ = capabilities.insert(reader.read_string()?);
        }
        Ok(Self {
            ship_level,
            max_fuel,
            crew_size,
            fuel_efficiency,
            ship_speed,
            capabilities,
        })
    }
}

fn read_u32(reader: &mut ByteReader<'_>) -> Result<u32, NetError> {
    let value = reader.read_vlq_u()?;
    u32::try_from(value).map_err(|_| NetError::InvalidText(format!("{value} exceeds u32")))
}

/// Damage relationship class of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamKind {
    /// Takes part in no damage at all.
    #[default]
    Null,
    /// Players and their allies.
    Friendly,
    /// Monsters hostile to players.
    Enemy,
    /// Players who opted into fighting each other.
    Pvp,
    /// Can be hurt but never hurts.
    Passive,
    /// Neither hurts nor can be hurt.
    Ghostly,
    /// Hazards of the world itself.
    Environment,
    /// Hurts and is hurt by everything.
    Indiscriminate,
    /// Helpers that fight on the players' side.
    Assistant,
}

impl NetEnum for TeamKind {
    fn to_index(self) -> u64 {
        self as u64
    }

    fn from_index(index: u64) -> Option<Self> {
        Some(match index {
            0 => Self::Null,
            1 => Self::Friendly,
            2 => Self::Enemy,
            3 => Self::Pvp,
            4 => Self::Passive,
            5 => Self::Ghostly,
            6 => Self::Environment,
            7 => Self::Indiscriminate,
            8 => Self::Assistant,
            _ => return None,
        })
    }
}

/// Team an entity deals and takes damage as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDamageTeam {
    /// Relationship class.
    #[serde(rename = "type")]
    pub kind: TeamKind,
    /// Team number within the class; separates rival enemy factions and
    /// PvP parties.
    pub team: u16,
}

impl EntityDamageTeam {
    /// Team of `kind` number `team`.
    #[must_use]
    pub const fn new(kind: TeamKind, team: u16) -> Self {
        Self { kind, team }
    }

    /// Reports whether this team can damage `victim`.
    #[must_use]
    pub fn can_damage(&self, victim: &Self, victim_is_self: bool) -> bool {
        use TeamKind::*;

        if victim_is_self {
            return self.kind == Indiscriminate;
        }
        match self.kind {
            Friendly | Assistant => {
                matches!(victim.kind, Enemy | Passive | Environment | Indiscriminate)
            }
            Enemy => {
                matches!(victim.kind, Friendly | Pvp | Indiscriminate)
                    || (victim.kind == Enemy && self.team != victim.team)
            }
            Pvp => {
                matches!(victim.kind, Enemy | Passive | Environment | Indiscriminate)
                    || (victim.kind == Pvp && (self.team == 0 || self.team != victim.team))
            }
            Environment => matches!(victim.kind, Friendly | Pvp | Indiscriminate),
            Indiscriminate => !matches!(victim.kind, Null | Ghostly | Assistant),
            Null | Passive | Ghostly => false,
        }
    }
}

impl NetValue for EntityDamageTeam {
    fn write_value(&self, writer: &mut ByteWriter) {
        self.kind.write_value(writer);
        writer.write_vlq_u(u64::from(self.team));
    }

    fn read_value(reader: &mut ByteReader<'_>) -> Result<Self, NetError> {
        let kind = TeamKind::read_value(reader)?;
        let team = reader.read_vlq_u()?;
        let team =
            u16::try_from(team).map_err(|_| NetError::InvalidText(format!("team {team}")))?;
        Ok(Self { kind, team })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn upgrades_merge_partial_deltas() {
        let base = ShipUpgrades {
            ship_level: 1,
            capabilities: ["teleport".to_owned()].into(),
            ..ShipUpgrades::default()
        };
        let upgraded = base
            .apply(&json!({ "shipLevel": 3, "capabilities": ["planetTravel"] }))
            .expect("valid delta");
        assert_eq!(upgraded.ship_level, 3);
        assert_eq!(upgraded.max_fuel, 0);
        assert!(upgraded.has_capability("teleport"));
        assert!(upgraded.has_capability("planetTravel"));

        assert!(matches!(
            base.apply(&json!({ "shipLevel": "three" })),
            Err(RpcError::Malformed(_))
        ));
        assert_eq!(base.apply(&json!({})).expect("empty delta"), base);
    }

    #[test]
    fn damage_follows_team_relationships() {
        let player = EntityDamageTeam::new(TeamKind::Friendly, 0);
        let monster = EntityDamageTeam::new(TeamKind::Enemy, 1);
        let rival = EntityDamageTeam::new(TeamKind::Enemy, 2);
        let ghost = EntityDamageTeam::new(TeamKind::Ghostly, 0);
        let bomb = EntityDamageTeam::new(TeamKind::Indiscriminate, 0);

        assert!(player.can_damage(&monster, false));
        assert!(monster.can_damage(&player, false));
        assert!(monster.can_damage(&rival, false));
        assert!(!monster.can_damage(&monster, false));
        assert!(!player.can_damage(&ghost, false));
        assert!(!player.can_damage(&player, true));
        assert!(bomb.can_damage(&bomb, true));

        let duelist = EntityDamageTeam::new(TeamKind::Pvp, 4);
        assert!(duelist.can_damage(&EntityDamageTeam::new(TeamKind::Pvp, 5), false));
        assert!(!duelist.can_damage(&EntityDamageTeam::new(TeamKind::Pvp, 4), false));
        assert!(EntityDamageTeam::new(TeamKind::Pvp, 0)
            .can_damage(&EntityDamageTeam::new(TeamKind::Pvp, 0), false));
    }
}

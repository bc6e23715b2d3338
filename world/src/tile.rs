//! The concrete world tile.

use serde::{Deserialize, Serialize};

/// Index into the material table.
pub type MaterialId = u16;
/// Index into the material mod table.
pub type ModId = u16;
/// Index into the dungeon table.
pub type DungeonId = u16;

/// Material of unloaded or out-of-range tiles.
pub const NULL_MATERIAL_ID: MaterialId = 65535;
/// Material of open space.
pub const EMPTY_MATERIAL_ID: MaterialId = 65534;
/// Material placed by terrain generation for solid ground.
pub const DEFAULT_SOLID_MATERIAL_ID: MaterialId = 1;
/// Mod of tiles without one.
pub const NO_MOD_ID: ModId = 65535;
/// Dungeon of tiles outside any dungeon.
pub const NO_DUNGEON_ID: DungeonId = 65535;

/// How a tile collides with movers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionKind {
    /// Unloaded; treated as solid by movers.
    #[default]
    Null,
    /// Passable.
    None,
    /// Solid from above only.
    Platform,
    /// Occupied by a dynamic collider.
    Dynamic,
    /// Solid with no friction.
    Slippery,
    /// Fully solid.
    Block,
}

impl CollisionKind {
    /// Reports whether movers are blocked from every side.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Null | Self::Dynamic | Self::Slippery | Self::Block)
    }
}

/// Liquid filling part of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidLevel {
    /// Liquid id; zero is no liquid.
    pub liquid: u8,
    /// Fill fraction, 1.0 is full.
    pub level: f32,
}

impl LiquidLevel {
    /// A tile with no liquid.
    pub const EMPTY: Self = Self {
        liquid: 0,
        level: 0.0,
    };

    /// Reports whether any liquid is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.liquid != 0 && self.level > 0.0
    }
}

/// One cell of the tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldTile {
    /// Material in the foreground layer.
    pub foreground: MaterialId,
    /// Mod applied to the foreground material.
    pub foreground_mod: ModId,
    /// Material in the background layer.
    pub background: MaterialId,
    /// Mod applied to the background material.
    pub background_mod: ModId,
    /// Liquid in the tile.
    pub liquid: LiquidLevel,
    /// Collision derived from the foreground.
    pub collision: CollisionKind,
    /// Dungeon that placed the tile.
    pub dungeon_id: DungeonId,
    /// Biome the block belongs to.
    pub block_biome_index: u8,
}

impl Default for WorldTile {
    /// The unloaded sentinel.
    fn default() -> Self {
        Self {
            foreground: NULL_MATERIAL_ID,
            foreground_mod: NO_MOD_ID,
            background: NULL_MATERIAL_ID,
            background_mod: NO_MOD_ID,
            liquid: LiquidLevel::EMPTY,
            collision: CollisionKind::Null,
            dungeon_id: NO_DUNGEON_ID,
            block_biome_index: 0,
        }
    }
}

impl WorldTile {
    /// An open tile with nothing in either layer.
    #[must_use]
    pub fn empty_background() -> Self {
        Self {
            foreground: EMPTY_MATERIAL_ID,
            background: EMPTY_MATERIAL_ID,
            collision: CollisionKind::None,
            ..Self::default()
        }
    }

    /// A solid tile of `material` over an empty background.
    #[must_use]
    pub fn solid(material: MaterialId) -> Self {
        Self {
            foreground: material,
            collision: CollisionKind::Block,
            ..Self::empty_background()
        }
    }

    /// Reports whether both layers are empty.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        self.foreground == EMPTY_MATERIAL_ID && self.background == EMPTY_MATERIAL_ID
    }

    /// Reports whether this is the unloaded sentinel.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.foreground == NULL_MATERIAL_ID
    }

    /// Reports whether movers are blocked by the tile.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.collision.is_solid()
    }

    /// Replaces the foreground material and the collision it implies.
    pub fn set_foreground(&mut self, material: MaterialId) {
        self.foreground = material;
        self.collision = match material {
            NULL_MATERIAL_ID => CollisionKind::Null,
            EMPTY_MATERIAL_ID => CollisionKind::None,
            _ => CollisionKind::Block,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_and_clear_tiles_differ() {
        let unloaded = WorldTile::default();
        assert!(unloaded.is_null());
        assert!(!unloaded.is_clear());
        assert!(unloaded.is_solid());

        let clear = WorldTile::empty_background();
        assert!(clear.is_clear());
        assert!(!clear.is_solid());
        assert_eq!(clear.collision, CollisionKind::None);
    }

    #[test]
    fn foreground_sets_collision() {
        let mut tile = WorldTile::empty_background();
        tile.set_foreground(7);
        assert_eq!(tile.collision, CollisionKind::Block);
        assert!(!tile.is_clear());
        tile.set_foreground(EMPTY_MATERIAL_ID);
        assert!(tile.is_clear());
        assert_eq!(tile, WorldTile::empty_background());
    }
}

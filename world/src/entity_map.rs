//! Entity storage, id allocation, and spatial queries.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
};

use orbitile_core::{IVec2, Line2F, RectF, Vec2, WorldGeometry};
use serde::{Deserialize, Serialize};

use crate::{
    spatial_hash::{SpatialHash, DEFAULT_CELL_SIZE},
    EntityMapError,
};

/// Identifier of an entity within one world.
pub type EntityId = i32;

/// Id that never names an entity.
pub const NULL_ENTITY_ID: EntityId = 0;

/// Largest allowed meta bound box side.
pub const MAX_ENTITY_SIZE: f32 = 10_000.0;

// Shrinks tile rects so touching neighbours do not count as overlapping.
const TILE_EPSILON: f32 = 1.0e-3;

/// Coarse category used by query filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Growing plant.
    Plant,
    /// Placed world object.
    Object,
    /// Drivable vehicle.
    Vehicle,
    /// Dropped item.
    ItemDrop,
    /// Piece of a harvested plant.
    PlantDrop,
    /// Projectile in flight.
    Projectile,
    /// Invisible scripted helper.
    Stagehand,
    /// Monster.
    Monster,
    /// Non-player character.
    Npc,
    /// Player.
    Player,
}

/// Region an entity can be interacted through, relative to its position.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractiveShape {
    /// Not interactive.
    #[default]
    None,
    /// A rectangle.
    Rect(RectF),
    /// Individual tile cells, offset from the entity's tile position.
    TileSpaces(Vec<IVec2>),
}

/// What the map needs to know about a stored entity.
pub trait MapEntity {
    /// Id the entity was reserved under.
    fn entity_id(&self) -> EntityId;

    /// Globally unique name, if any.
    fn unique_id(&self) -> Option<&str> {
        None
    }

    /// World position.
    fn position(&self) -> Vec2;

    /// Bounds of everything the entity may touch, relative to its position.
    fn meta_bound_box(&self) -> RectF;

    /// Category for query filters.
    fn entity_type(&self) -> EntityType;

    /// Ephemeral entities are ignored by occupancy tests by default.
    fn is_ephemeral(&self) -> bool {
        false
    }

    /// Interaction region.
    fn interactive_shape(&self) -> InteractiveShape {
        InteractiveShape::None
    }

    /// Solid area relative to the position; `None` occupies nothing.
    fn collision_area(&self) -> Option<RectF> {
        None
    }

    /// Tile cells the entity occupies, relative to its tile position.
    fn tile_spaces(&self) -> Vec<IVec2> {
        Vec::new()
    }
}

fn world_bounds<E: MapEntity>(entity: &E) -> RectF {
    entity.meta_bound_box().translated(entity.position())
}

fn tile_position<E: MapEntity>(entity: &E) -> IVec2 {
    entity.position().floor().as_ivec2()
}

fn tile_rect(cell: IVec2) -> RectF {
    RectF::new(
        cell.x as f32 + TILE_EPSILON,
        cell.y as f32 + TILE_EPSILON,
        (cell.x + 1) as f32 - TILE_EPSILON,
        (cell.y + 1) as f32 - TILE_EPSILON,
    )
}

/// Entities of one world, indexed by id, unique name, and location.
///
/// Ids come from the half-open range `[begin, end)` and are handed out by a
/// cursor that moves forward and wraps, so a freed id is not reused until
/// the cursor comes round again.
pub struct EntityMap<E> {
    geometry: WorldGeometry,
    begin: EntityId,
    end: EntityId,
    next_id: EntityId,
    entities: BTreeMap<EntityId, E>,
    reserved: BTreeSet<EntityId>,
    unique: HashMap<String, EntityId>,
    unique_names: HashMap<EntityId, String>,
    spatial: SpatialHash<EntityId>,
    updating: Option<EntityId>,
}

impl<E: MapEntity> EntityMap<E> {
    /// Creates an empty map handing out ids in `[begin, end)`.
    #[must_use]
    pub fn new(geometry: WorldGeometry, begin: EntityId, end: EntityId) -> Self {
        Self {
            geometry,
            begin,
            end: end.max(begin),
            next_id: begin,
            entities: BTreeMap::new(),
            reserved: BTreeSet::new(),
            unique: HashMap::new(),
            unique_names: HashMap::new(),
            spatial: SpatialHash::new(geometry, DEFAULT_CELL_SIZE),
            updating: None,
        }
    }

    /// World the map indexes.
    #[must_use]
    pub const fn geometry(&self) -> WorldGeometry {
        self.geometry
    }

    fn is_held(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id) || self.reserved.contains(&id) || self.updating == Some(id)
    }

    /// Reserves the next free id after the cursor.
    pub fn reserve_id(&mut self) -> Result<EntityId, EntityMapError> {
        let span = i64::from(self.end) - i64::from(self.begin);
        let start = i64::from(self.next_id) - i64::from(self.begin);
        for step in 0..span {
            let id = (i64::from(self.begin) + (start + step).rem_euclid(span)) as EntityId;
            if id == NULL_ENTITY_ID || self.is_held(id) {
                continue;
            }
            let following = i64::from(id) + 1;
            self.next_id = if following >= i64::from(self.end) {
                self.begin
            } else {
                following as EntityId
            };
            let _ = self.reserved.insert(id);
            return Ok(id);
        }
        Err(EntityMapError::IdSpaceExhausted {
            begin: self.begin,
            end: self.end,
        })
    }

    /// Reserves `wanted` if it is non-zero and free.
    pub fn maybe_reserve_id(&mut self, wanted: EntityId) -> Option<EntityId> {
        if wanted == NULL_ENTITY_ID || self.is_held(wanted) {
            return None;
        }
        let _ = self.reserved.insert(wanted);
        Some(wanted)
    }

    /// Returns a reservation that will not be used.
    pub fn release_id(&mut self, id: EntityId) -> bool {
        self.reserved.remove(&id)
    }

    /// Adds an entity under its previously reserved id.
    pub fn add(&mut self, entity: E) -> Result<(), EntityMapError> {
        let id = entity.entity_id();
        if id == NULL_ENTITY_ID {
            return Err(EntityMapError::NullId);
        }
        if self.entities.contains_key(&id) || self.updating == Some(id) {
            return Err(EntityMapError::DuplicateId(id));
        }
        if !self.reserved.contains(&id) {
            return Err(EntityMapError::UnreservedId(id));
        }
        let bounds = entity.meta_bound_box();
        if bounds.is_empty() {
            return Err(EntityMapError::EmptyBounds { id });
        }
        if bounds.width() > MAX_ENTITY_SIZE || bounds.height() > MAX_ENTITY_SIZE {
            return Err(EntityMapError::BoundsTooLarge {
                id,
                width: bounds.width(),
                height: bounds.height(),
            });
        }
        if let Some(name) = entity.unique_id() {
            if self.unique.contains_key(name) {
                return Err(EntityMapError::DuplicateUniqueName {
                    id,
                    name: name.to_owned(),
                });
            }
            let _ = self.unique.insert(name.to_owned(), id);
            let _ = self.unique_names.insert(id, name.to_owned());
        }
        let _ = self.reserved.remove(&id);
        let _ = self.spatial.set(id, world_bounds(&entity));
        let _ = self.entities.insert(id, entity);
        Ok(())
    }

    /// Removes and returns an entity.
    pub fn remove(&mut self, id: EntityId) -> Option<E> {
        let entity = self.entities.remove(&id)?;
        let _ = self.spatial.remove(id);
        if let Some(name) = self.unique_names.remove(&id) {
            let _ = self.unique.remove(&name);
        }
        Some(entity)
    }

    /// Entity with `id`.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&E> {
        self.entities.get(&id)
    }

    /// Mutable entity with `id`.
    ///
    /// Index entries follow the entity's bounds only after the next
    /// [`update_all`](Self::update_all) or [`reindex`](Self::reindex).
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut E> {
        self.entities.get_mut(&id)
    }

    /// Entity holding the unique name.
    #[must_use]
    pub fn unique_entity(&self, name: &str) -> Option<&E> {
        self.unique.get(name).and_then(|id| self.entities.get(id))
    }

    /// Number of entities.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entities.len()
    }

    /// All ids, ascending.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Refreshes the index entry of one entity after it moved.
    pub fn reindex(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get(&id) {
            let _ = self.spatial.set(id, world_bounds(entity));
        }
    }

    /// Calls `update` on every entity present when the pass starts, in id
    /// order or in `ordering` when given, then reindexes it.
    ///
    /// The entity is detached from the map during its own call. Entities
    /// added through the context join the map at once but are not visited
    /// until the next pass.
    ///
    /// An entity renamed onto a name another entity holds keeps its previous
    /// registration; each such rename is returned as
    /// [`EntityMapError::DuplicateUniqueName`].
    pub fn update_all<F>(
        &mut self,
        ordering: Option<&dyn Fn(&E, &E) -> Ordering>,
        mut update: F,
    ) -> Vec<EntityMapError>
    where
        F: FnMut(&mut E, &mut UpdateContext<'_, E>),
    {
        let mut ids = self.entity_ids();
        if let Some(ordering) = ordering {
            let entities = &self.entities;
            ids.sort_by(|a, b| match (entities.get(a), entities.get(b)) {
                (Some(a), Some(b)) => ordering(a, b),
                _ => a.cmp(b),
            });
        }
        let mut conflicts = Vec::new();
        for id in ids {
            let Some(mut entity) = self.entities.remove(&id) else {
                continue;
            };
            self.updating = Some(id);
            update(&mut entity, &mut UpdateContext { map: self });
            self.updating = None;
            if let Err(conflict) = self.reinsert(id, entity) {
                conflicts.push(conflict);
            }
        }
        conflicts
    }

    fn reinsert(&mut self, id: EntityId, entity: E) -> Result<(), EntityMapError> {
        let renamed = self.sync_unique_name(id, entity.unique_id());
        let _ = self.spatial.set(id, world_bounds(&entity));
        let _ = self.entities.insert(id, entity);
        renamed
    }

    fn sync_unique_name(&mut self, id: EntityId, current: Option<&str>) -> Result<(), EntityMapError> {
        if self.unique_names.get(&id).map(String::as_str) == current {
            return Ok(());
        }
        if let Some(name) = current {
            if self.unique.get(name).is_some_and(|holder| *holder != id) {
                log::warn!("entity {id} renamed to '{name}', which is already held");
                return Err(EntityMapError::DuplicateUniqueName {
                    id,
                    name: name.to_owned(),
                });
            }
        }
        if let Some(old) = self.unique_names.remove(&id) {
            let _ = self.unique.remove(&old);
        }
        if let Some(name) = current {
            let _ = self.unique.insert(name.to_owned(), id);
            let _ = self.unique_names.insert(id, name.to_owned());
        }
        Ok(())
    }

    /// Unique name registered for `id`.
    #[must_use]
    pub fn unique_name(&self, id: EntityId) -> Option<&str> {
        self.unique_names.get(&id).map(String::as_str)
    }

    /// Entities whose bounds overlap `rect` and pass `filter`.
    pub fn entities_in_rect(&self, rect: RectF, mut filter: impl FnMut(&E) -> bool) -> Vec<EntityId> {
        self.spatial
            .query(rect)
            .into_iter()
            .filter(|id| {
                self.entities.get(id).is_some_and(|entity| {
                    self.geometry.rect_intersects_rect(&world_bounds(entity), &rect) && filter(entity)
                })
            })
            .collect()
    }

    /// Entities overlapping `rect` whose type is in `types`; every type when empty.
    #[must_use]
    pub fn entity_query(&self, rect: RectF, types: &[EntityType]) -> Vec<EntityId> {
        self.entities_in_rect(rect, |entity| {
            types.is_empty() || types.contains(&entity.entity_type())
        })
    }

    /// Entities whose bounds the segment touches.
    pub fn entities_on_line(&self, line: Line2F, mut filter: impl FnMut(&E) -> bool) -> Vec<EntityId> {
        let span = RectF::new(
            line.a.x.min(line.b.x),
            line.a.y.min(line.b.y),
            line.a.x.max(line.b.x),
            line.a.y.max(line.b.y),
        );
        self.spatial
            .query(span)
            .into_iter()
            .filter(|id| {
                self.entities.get(id).is_some_and(|entity| {
                    self.geometry.line_intersects_rect(&line, &world_bounds(entity)) && filter(entity)
                })
            })
            .collect()
    }

    /// Entities covering the tile at `cell`. Entities with tile spaces cover
    /// only those cells.
    pub fn entities_at_tile(&self, cell: IVec2, mut filter: impl FnMut(&E) -> bool) -> Vec<EntityId> {
        let target = self.geometry.wrap_cell(cell);
        let rect = tile_rect(cell);
        self.spatial
            .query(rect)
            .into_iter()
            .filter(|id| {
                self.entities.get(id).is_some_and(|entity| {
                    let spaces = entity.tile_spaces();
                    let covers = if spaces.is_empty() {
                        self.geometry.rect_intersects_rect(&world_bounds(entity), &rect)
                    } else {
                        let origin = tile_position(entity);
                        spaces
                            .iter()
                            .any(|space| self.geometry.wrap_cell(origin + *space) == target)
                    };
                    covers && filter(entity)
                })
            })
            .collect()
    }

    /// Nearest entity within `radius` of `center` passing `filter`; ties go
    /// to the lower id.
    pub fn closest_entity(
        &self,
        center: Vec2,
        radius: f32,
        mut filter: impl FnMut(&E) -> bool,
    ) -> Option<EntityId> {
        let area = RectF::point(center).padded(radius);
        let mut best: Option<(f32, EntityId)> = None;
        for id in self.spatial.query(area) {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let distance = self.geometry.distance(entity.position(), center);
            if distance > radius || !filter(entity) {
                continue;
            }
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Interactive entity nearest to `position` within `max_radius`.
    ///
    /// Candidates are ranked by distance to their interactive shape, then
    /// by distance from the shape's center, then by id.
    #[must_use]
    pub fn interactive_entity_near(&self, position: Vec2, max_radius: f32) -> Option<EntityId> {
        let area = RectF::point(position).padded(max_radius);
        let mut best: Option<(f32, f32, EntityId)> = None;
        for id in self.spatial.query(area) {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let Some((edge, center)) = self.interactive_distance(entity, position) else {
                continue;
            };
            if edge > max_radius {
                continue;
            }
            let candidate = (edge, self.geometry.distance(center, position), id);
            let better = best.map_or(true, |current| {
                candidate
                    .0
                    .total_cmp(&current.0)
                    .then(candidate.1.total_cmp(&current.1))
                    .then(candidate.2.cmp(&current.2))
                    == Ordering::Less
            });
            if better {
                best = Some(candidate);
            }
        }
        best.map(|(_, _, id)| id)
    }

    fn interactive_distance(&self, entity: &E, position: Vec2) -> Option<(f32, Vec2)> {
        match entity.interactive_shape() {
            InteractiveShape::None => None,
            InteractiveShape::Rect(rect) => {
                let rect = rect.translated(entity.position());
                Some((self.geometry.rect_distance(&rect, position), rect.center()))
            }
            InteractiveShape::TileSpaces(spaces) => {
                let origin = tile_position(entity);
                let mut edge = f32::INFINITY;
                let mut min = IVec2::splat(i32::MAX);
                let mut max = IVec2::splat(i32::MIN);
                for space in &spaces {
                    let cell = origin + *space;
                    let rect = RectF::new(
                        cell.x as f32,
                        cell.y as f32,
                        (cell.x + 1) as f32,
                        (cell.y + 1) as f32,
                    );
                    edge = edge.min(self.geometry.rect_distance(&rect, position));
                    min = min.min(cell);
                    max = max.max(cell + IVec2::ONE);
                }
                if spaces.is_empty() {
                    return None;
                }
                Some((edge, (min + max).as_vec2() * 0.5))
            }
        }
    }

    /// Reports whether a solid entity covers the tile at `cell`.
    #[must_use]
    pub fn tile_is_occupied(&self, cell: IVec2, include_ephemeral: bool) -> bool {
        let target = self.geometry.wrap_cell(cell);
        let rect = tile_rect(cell);
        self.spatial.query(rect).into_iter().any(|id| {
            let Some(entity) = self.entities.get(&id) else {
                return false;
            };
            if entity.is_ephemeral() && !include_ephemeral {
                return false;
            }
            let spaces = entity.tile_spaces();
            if !spaces.is_empty() {
                let origin = tile_position(entity);
                return spaces
                    .iter()
                    .any(|space| self.geometry.wrap_cell(origin + *space) == target);
            }
            entity.collision_area().is_some_and(|area| {
                self.geometry
                    .rect_intersects_rect(&area.translated(entity.position()), &rect)
            })
        })
    }

    /// Reports whether any solid entity overlaps `rect`.
    #[must_use]
    pub fn space_is_occupied(&self, rect: RectF, include_ephemeral: bool) -> bool {
        self.spatial.query(rect).into_iter().any(|id| {
            let Some(entity) = self.entities.get(&id) else {
                return false;
            };
            if entity.is_ephemeral() && !include_ephemeral {
                return false;
            }
            entity.collision_area().is_some_and(|area| {
                self.geometry
                    .rect_intersects_rect(&area.translated(entity.position()), &rect)
            })
        })
    }
}

/// Access to the map from inside [`EntityMap::update_all`].
///
/// Removal is not offered; entities can only be added.
pub struct UpdateContext<'a, E> {
    map: &'a mut EntityMap<E>,
}

impl<E: MapEntity> UpdateContext<'_, E> {
    /// See [`EntityMap::reserve_id`].
    pub fn reserve_id(&mut self) -> Result<EntityId, EntityMapError> {
        self.map.reserve_id()
    }

    /// See [`EntityMap::add`].
    pub fn add(&mut self, entity: E) -> Result<(), EntityMapError> {
        self.map.add(entity)
    }

    /// Another entity by id; the one being updated is not in the map.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&E> {
        self.map.entity(id)
    }

    /// See [`EntityMap::unique_entity`].
    #[must_use]
    pub fn unique_entity(&self, name: &str) -> Option<&E> {
        self.map.unique_entity(name)
    }

    /// See [`EntityMap::entities_in_rect`].
    pub fn entities_in_rect(&self, rect: RectF, filter: impl FnMut(&E) -> bool) -> Vec<EntityId> {
        self.map.entities_in_rect(rect, filter)
    }

    /// See [`EntityMap::closest_entity`].
    pub fn closest_entity(
        &self,
        center: Vec2,
        radius: f32,
        filter: impl FnMut(&E) -> bool,
    ) -> Option<EntityId> {
        self.map.closest_entity(center, radius, filter)
    }

    /// See [`EntityMap::tile_is_occupied`].
    #[must_use]
    pub fn tile_is_occupied(&self, cell: IVec2, include_ephemeral: bool) -> bool {
        self.map.tile_is_occupied(cell, include_ephemeral)
    }
}

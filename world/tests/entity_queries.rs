use std::collections::HashSet;

use orbitile_core::{IVec2, Line2F, RectF, Vec2, WorldGeometry};
use orbitile_world::{
    EntityId, EntityMap, EntityMapError, EntityType, InteractiveShape, MapEntity,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct Thing {
    id: EntityId,
    kind: EntityType,
    position: Vec2,
    bounds: RectF,
    interactive: InteractiveShape,
    spaces: Vec<IVec2>,
}

impl Thing {
    fn new(id: EntityId, kind: EntityType, x: f32, y: f32) -> Self {
        Self {
            id,
            kind,
            position: Vec2::new(x, y),
            bounds: RectF::new(-1.0, -1.0, 1.0, 1.0),
            interactive: InteractiveShape::None,
            spaces: Vec::new(),
        }
    }
}

impl MapEntity for Thing {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn meta_bound_box(&self) -> RectF {
        self.bounds
    }

    fn entity_type(&self) -> EntityType {
        self.kind
    }

    fn interactive_shape(&self) -> InteractiveShape {
        self.interactive.clone()
    }

    fn tile_spaces(&self) -> Vec<IVec2> {
        self.spaces.clone()
    }
}

fn world() -> EntityMap<Thing> {
    EntityMap::new(WorldGeometry::new(1000, 500), 1, 1000)
}

fn spawn(map: &mut EntityMap<Thing>, kind: EntityType, x: f32, y: f32) -> EntityId {
    let id = map.reserve_id().expect("id space has room");
    map.add(Thing::new(id, kind, x, y)).expect("entity is valid");
    id
}

#[test]
fn removed_ids_are_not_reused_by_the_next_reservation() {
    let mut map = world();
    let first = spawn(&mut map, EntityType::Monster, 5.0, 5.0);
    assert_eq!(first, 1);
    assert!(map.remove(first).is_some());
    assert_eq!(map.reserve_id(), Ok(2));
}

#[test]
fn interactive_ties_go_to_the_nearer_center() {
    let mut map = world();
    let query = Vec2::new(100.0, 100.0);

    let wide = map.reserve_id().expect("free");
    let mut far_center = Thing::new(wide, EntityType::Object, 100.0, 102.0);
    far_center.interactive = InteractiveShape::Rect(RectF::new(-6.0, 0.0, 6.0, 8.0));
    map.add(far_center).expect("valid");

    let narrow = map.reserve_id().expect("free");
    let mut near_center = Thing::new(narrow, EntityType::Object, 100.0, 102.0);
    near_center.interactive = InteractiveShape::Rect(RectF::new(-1.0, 0.0, 1.0, 2.0));
    map.add(near_center).expect("valid");

    assert_eq!(map.interactive_entity_near(query, 5.0), Some(narrow));
    assert_eq!(map.interactive_entity_near(query, 1.0), None);
}

#[test]
fn tile_entities_interact_through_their_spaces() {
    let mut map = world();
    let id = map.reserve_id().expect("free");
    let mut door = Thing::new(id, EntityType::Object, 10.0, 10.0);
    door.bounds = RectF::new(0.0, 0.0, 3.0, 3.0);
    door.spaces = vec![IVec2::new(0, 0), IVec2::new(0, 1), IVec2::new(0, 2)];
    door.interactive = InteractiveShape::TileSpaces(door.spaces.clone());
    map.add(door).expect("valid");

    assert_eq!(map.entities_at_tile(IVec2::new(10, 11), |_| true), vec![id]);
    assert!(map.entities_at_tile(IVec2::new(11, 11), |_| true).is_empty());
    assert!(map.tile_is_occupied(IVec2::new(10, 12), false));
    assert_eq!(map.interactive_entity_near(Vec2::new(13.5, 11.5), 3.0), Some(id));
    assert_eq!(map.interactive_entity_near(Vec2::new(13.5, 11.5), 2.0), None);
}

#[test]
fn queries_wrap_around_the_seam_and_filter_by_type() {
    let mut map = world();
    let edge = spawn(&mut map, EntityType::Npc, 999.5, 50.0);
    let origin = spawn(&mut map, EntityType::Monster, 0.5, 50.0);
    let _far = spawn(&mut map, EntityType::Npc, 500.0, 50.0);

    let around_seam = RectF::new(-3.0, 48.0, 3.0, 52.0);
    assert_eq!(map.entities_in_rect(around_seam, |_| true), vec![edge, origin]);
    assert_eq!(map.entity_query(around_seam, &[EntityType::Npc]), vec![edge]);
    assert_eq!(map.entity_query(around_seam, &[]), vec![edge, origin]);

    assert_eq!(
        map.closest_entity(Vec2::new(1.0, 50.0), 10.0, |thing| thing.kind == EntityType::Npc),
        Some(edge)
    );
    assert_eq!(map.closest_entity(Vec2::new(1.0, 50.0), 10.0, |_| true), Some(origin));

    let line = Line2F::new(Vec2::new(995.0, 50.0), Vec2::new(1003.0, 50.0));
    assert_eq!(map.entities_on_line(line, |_| true), vec![edge, origin]);
}

#[test]
fn oversized_and_empty_boxes_are_rejected() {
    let mut map = world();
    let id = map.reserve_id().expect("free");
    let mut giant = Thing::new(id, EntityType::Vehicle, 0.0, 0.0);
    giant.bounds = RectF::new(0.0, 0.0, 10_001.0, 1.0);
    assert!(matches!(
        map.add(giant.clone()),
        Err(EntityMapError::BoundsTooLarge { .. })
    ));
    giant.bounds = RectF::new(0.0, 0.0, 0.0, 1.0);
    assert_eq!(map.add(giant), Err(EntityMapError::EmptyBounds { id }));
    assert_eq!(map.size(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn reserved_ids_are_never_zero_or_held(
        begin in -8_i32..4,
        span in 2_i32..40,
        script in prop::collection::vec(any::<bool>(), 1..120),
    ) {
        let mut map: EntityMap<Thing> = EntityMap::new(WorldGeometry::new(256, 256), begin, begin + span);
        let mut held: HashSet<EntityId> = HashSet::new();
        for add in script {
            if add {
                match map.reserve_id() {
                    Ok(id) => {
                        prop_assert_ne!(id, 0);
                        prop_assert!(held.insert(id));
                        prop_assert!(id >= begin && id < begin + span);
                        map.add(Thing::new(id, EntityType::ItemDrop, 8.0, 8.0)).expect("reserved");
                    }
                    Err(error) => {
                        let capacity = (begin..begin + span).filter(|id| *id != 0).count();
                        prop_assert_eq!(held.len(), capacity);
                        prop_assert_eq!(
                            error,
                            EntityMapError::IdSpaceExhausted { begin, end: begin + span }
                        );
                    }
                }
            } else if let Some(id) = held.iter().min().copied() {
                prop_assert!(map.remove(id).is_some());
                let _ = held.remove(&id);
            }
            prop_assert_eq!(map.size(), held.len());
        }
        for id in &held {
            prop_assert_eq!(map.entity(*id).map(|thing| thing.id), Some(*id));
        }
    }
}

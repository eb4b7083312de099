use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use worldpart_common::{HitableObject, InteriorId, ObjectRef, Rect, Shape, same_object};
use worldpart_stream::World;

use crate::filter::RelationFilter;

/// Visit every object registered in the parts `rect` touches, once each.
///
/// Outdoors, chunks are visited x outer and y inner, and each chunk's
/// overlapping objects before its contained ones. An interior that cannot
/// be loaded has no objects.
pub(crate) fn visit_candidates(
    world: &mut World,
    rect: &Rect,
    interior: Option<&InteriorId>,
    mut visit: impl FnMut(&ObjectRef) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let mut seen = HashSet::new();
    match interior {
        Some(id) => {
            let Some(interior) = world.interiors_mut().interior(id) else {
                tracing::debug!(interior = %id, "query against unavailable interior");
                return ControlFlow::Continue(());
            };
            for object in interior.contained_objects() {
                if seen.insert(object.id()) {
                    visit(object)?;
                }
            }
        }
        None => {
            for key in world.chunks().keys_in(rect) {
                let Some(chunk) = world.chunks_mut().chunk(key) else {
                    continue;
                };
                for object in chunk.hitable_objects() {
                    if seen.insert(object.id()) {
                        visit(object)?;
                    }
                }
            }
        }
    }
    ControlFlow::Continue(())
}

fn is_hit(object: &ObjectRef, shape: &Shape, bounds: &Rect, origin: Option<&dyn HitableObject>) -> bool {
    if !object.is_hitable() {
        return false;
    }
    if origin.is_some_and(|origin| same_object(object.as_ref(), origin)) {
        return false;
    }
    if object.as_living().is_some_and(|living| living.is_dead()) {
        return false;
    }
    let hit_box = object.hit_box_bounds();
    bounds.intersects(&hit_box) && shape.intersects(&hit_box)
}

/// Every hitable object whose hit box intersects `shape` in the given
/// space, excluding `origin` and dead living entities.
///
/// Circles are matched against their bounding square first, then exactly.
pub fn hit_test(
    world: &mut World,
    shape: impl Into<Shape>,
    interior: Option<&InteriorId>,
    origin: Option<&dyn HitableObject>,
) -> Vec<ObjectRef> {
    world.assert_sim_thread("hit_test");
    let shape = shape.into();
    let bounds = shape.bounding_rect();
    let mut hits = Vec::new();
    let _ = visit_candidates(world, &bounds, interior, |object| {
        if is_hit(object, &shape, &bounds, origin) {
            hits.push(Arc::clone(object));
        }
        ControlFlow::Continue(())
    });
    hits
}

/// [`hit_test`] restricted to living entities `filter` accepts.
pub fn living_hit_test(
    world: &mut World,
    shape: impl Into<Shape>,
    interior: Option<&InteriorId>,
    origin: Option<&dyn HitableObject>,
    filter: RelationFilter,
) -> Vec<ObjectRef> {
    let origin_living = origin.and_then(|origin| origin.as_living());
    let mut hits = hit_test(world, shape, interior, origin);
    hits.retain(|object| {
        object
            .as_living()
            .is_some_and(|living| filter.accepts(origin_living, living))
    });
    hits
}

/// The living entity closest to `origin` (diagonal distance) among those
/// [`living_hit_test`] returns. The first one visited wins ties; entities in
/// another space are never picked.
pub fn nearest_living_target(
    world: &mut World,
    shape: impl Into<Shape>,
    interior: Option<&InteriorId>,
    origin: &dyn HitableObject,
    filter: RelationFilter,
) -> Option<ObjectRef> {
    let origin_position = origin.position();
    let mut closest = None;
    let mut closest_distance = f32::INFINITY;

    for object in living_hit_test(world, shape, interior, Some(origin), filter) {
        let distance = object.position().diagonal_distance_to(&origin_position);
        if distance < closest_distance {
            closest_distance = distance;
            closest = Some(object);
        }
    }
    if let Some(target) = &closest {
        tracing::trace!(target = ?target.id(), distance = closest_distance, "nearest living target");
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TestObject, place, world};
    use worldpart_common::{Circle, Relation};

    fn ids(objects: &[ObjectRef]) -> Vec<worldpart_common::ObjectId> {
        objects.iter().map(|object| object.id()).collect()
    }

    #[test]
    fn hit_test_excludes_origin_dead_and_unhitable() {
        let mut world = world();
        let origin = place(&mut world, TestObject::creature(0, 0, 8, 8));
        let rock = place(&mut world, TestObject::prop(10, 0, 8, 8));
        place(&mut world, TestObject::creature(20, 0, 8, 8).dead());
        place(&mut world, TestObject::prop(30, 0, 8, 8).unhitable());
        place(&mut world, TestObject::prop(200, 200, 8, 8));

        let hits = hit_test(&mut world, Rect::new(0, 0, 40, 8), None, Some(origin.as_ref()));
        assert_eq!(ids(&hits), vec![rock.id()]);
    }

    #[test]
    fn overlapping_object_reported_once() {
        let mut world = world();
        let wall = place(&mut world, TestObject::prop(60, 60, 10, 10));
        let hits = hit_test(&mut world, Rect::new(0, 0, 128, 128), None, None);
        assert_eq!(ids(&hits), vec![wall.id()]);
    }

    #[test]
    fn circle_filters_corner_candidates() {
        let mut world = world();
        place(&mut world, TestObject::prop(4, 4, 1, 1));
        let near = place(&mut world, TestObject::prop(3, 3, 1, 1));

        let hits = hit_test(&mut world, Circle::new(0, 0, 5), None, None);
        assert_eq!(ids(&hits), vec![near.id()]);
    }

    #[test]
    fn interior_queries_see_only_interior_objects() {
        let mut world = world();
        place(&mut world, TestObject::prop(0, 0, 8, 8));
        let inside = place(&mut world, TestObject::prop(0, 0, 8, 8).inside("hall"));
        let hall = InteriorId::new("hall");

        let hits = hit_test(&mut world, Rect::new(0, 0, 16, 16), Some(&hall), None);
        assert_eq!(ids(&hits), vec![inside.id()]);

        let attic = InteriorId::new("attic");
        assert!(hit_test(&mut world, Rect::new(0, 0, 16, 16), Some(&attic), None).is_empty());
    }

    #[test]
    fn living_hit_test_applies_relation() {
        let mut world = world();
        let wolf = TestObject::creature(10, 0, 4, 4);
        let deer = TestObject::creature(20, 0, 4, 4);
        let hunter = TestObject::creature(0, 0, 4, 4).with_relation(wolf.id, Relation::Hostile);
        let wolf = place(&mut world, wolf);
        place(&mut world, deer);
        place(&mut world, TestObject::prop(30, 0, 4, 4));
        let hunter = place(&mut world, hunter);

        let area = Rect::new(0, 0, 64, 8);
        let all = living_hit_test(&mut world, area, None, Some(hunter.as_ref()), RelationFilter::Any);
        assert_eq!(all.len(), 2);

        let hostile = living_hit_test(
            &mut world,
            area,
            None,
            Some(hunter.as_ref()),
            RelationFilter::Relation(Relation::Hostile),
        );
        assert_eq!(ids(&hostile), vec![wolf.id()]);
    }

    #[test]
    fn nearest_target_prefers_closest_then_first() {
        let mut world = world();
        let hunter = place(&mut world, TestObject::creature(0, 0, 4, 4));
        let far = place(&mut world, TestObject::creature(40, 0, 4, 4));
        let near_a = place(&mut world, TestObject::creature(20, 0, 4, 4));
        place(&mut world, TestObject::creature(20, 0, 4, 4));

        let target =
            nearest_living_target(&mut world, Rect::new(0, 0, 64, 8), None, hunter.as_ref(), RelationFilter::Any)
                .unwrap();
        assert_eq!(target.id(), near_a.id());
        assert_ne!(target.id(), far.id());
    }

    #[test]
    fn nearest_target_none_without_candidates() {
        let mut world = world();
        let hunter = place(&mut world, TestObject::creature(0, 0, 4, 4));
        place(&mut world, TestObject::prop(10, 0, 4, 4));
        let target = nearest_living_target(
            &mut world,
            Circle::new(2, 2, 30),
            None,
            hunter.as_ref(),
            RelationFilter::Any,
        );
        assert!(target.is_none());
    }
}

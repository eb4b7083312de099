use worldpart_common::{BlockCoord, HitableObject, Quad, Rect, Segment};
use worldpart_stream::World;

use crate::query::hit_test;

enum SightLine {
    Thin(Segment),
    Thick(Quad),
}

impl SightLine {
    fn crosses(&self, rect: &Rect) -> bool {
        match self {
            SightLine::Thin(segment) => segment.intersects_rect(rect),
            SightLine::Thick(quad) => quad.intersects_rect(rect),
        }
    }
}

/// Whether anything stands between `origin` and `target`.
///
/// The line runs between the two positions; a positive `line_width` widens
/// it into a quad. Hitable objects other than the two ends, and hitable
/// terrain, block it. Ends in different spaces are always blocked.
pub fn is_sight_blocked(
    world: &mut World,
    origin: &dyn HitableObject,
    target: &dyn HitableObject,
    line_width: f32,
) -> bool {
    world.assert_sim_thread("is_sight_blocked");
    let from = origin.position();
    let to = target.position();
    if !from.same_space(&to) {
        return true;
    }

    let segment = Segment::new(from.to_vec2(), to.to_vec2());
    let line = if line_width > 0.0 {
        SightLine::Thick(segment.thicken(line_width))
    } else {
        SightLine::Thin(segment)
    };
    let area = Rect::from_points(from.pixel(), to.pixel()).inflate(line_width.max(0.0).ceil() as i32);
    let interior = from.interior.as_ref();

    let target_id = target.id();
    let obstruction = hit_test(world, area, interior, Some(origin))
        .into_iter()
        .find(|object| object.id() != target_id && line.crosses(&object.hit_box_bounds()));
    if let Some(object) = obstruction {
        tracing::trace!(obstruction = ?object.id(), "sight blocked by object");
        return true;
    }

    let block_size = world.metrics().block_size;
    let (low, high) = area.block_span(block_size);
    for x in low.x..=high.x {
        for y in low.y..=high.y {
            let block = BlockCoord::new(x, y);
            let block_type = world.block_type(block, interior);
            if world.table().is_hitable(block_type) && line.crosses(&block.real_bounds(block_size)) {
                tracing::trace!(?block, "sight blocked by terrain");
                return true;
            }
        }
    }
    false
}

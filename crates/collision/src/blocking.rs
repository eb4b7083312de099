use std::ops::ControlFlow;

use worldpart_common::{BlockCoord, HitableObject, InteriorId, Rect, same_object};
use worldpart_stream::World;

use crate::query::visit_candidates;

/// How thoroughly [`is_blocked`] checks a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCheck {
    /// Precomputed terrain walkability only. Cheap; for AI planning.
    Fast,
    /// Terrain types plus every blocking object. For movement resolution.
    Precise,
}

fn blocks_in(rect: &Rect, block_size: i32) -> impl Iterator<Item = BlockCoord> {
    let (low, high) = rect.block_span(block_size);
    (low.x..=high.x).flat_map(move |x| (low.y..=high.y).map(move |y| BlockCoord::new(x, y)))
}

/// Whether `origin` could not occupy `rect` in its own space.
pub fn is_blocked(world: &mut World, origin: &dyn HitableObject, rect: &Rect, check: BlockCheck) -> bool {
    world.assert_sim_thread("is_blocked");
    let interior = origin.interior();
    let interior = interior.as_ref();

    for block in blocks_in(rect, world.metrics().block_size) {
        let blocked = match check {
            BlockCheck::Fast => !world.is_block_walkable(block, interior),
            BlockCheck::Precise => {
                let block_type = world.block_type(block, interior);
                world.table().is_blocking(block_type)
            }
        };
        if blocked {
            return true;
        }
    }
    if check == BlockCheck::Fast {
        return false;
    }

    visit_candidates(world, rect, interior, |object| {
        let blocks = object.is_blocking()
            && object.is_hitable()
            && !same_object(object.as_ref(), origin)
            && object.blocking_bounds().intersects(rect);
        if blocks {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// Whether any terrain block under `rect` is hitable.
pub fn is_hitable_block_hit(world: &mut World, rect: &Rect, interior: Option<&InteriorId>) -> bool {
    world.assert_sim_thread("is_hitable_block_hit");
    blocks_in(rect, world.metrics().block_size).any(|block| {
        let block_type = world.block_type(block, interior);
        world.table().is_hitable(block_type)
    })
}

use serde::{Deserialize, Serialize};
use worldpart_common::{BlockCoord, InteriorId, WorldPosition};

/// Portal from a block in one space to a block in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLink {
    pub from_block: BlockCoord,
    pub to_block: BlockCoord,
    /// Destination space; `None` leads outside.
    pub to_interior: Option<InteriorId>,
}

impl WorldLink {
    /// Where a traversing entity is placed: horizontal centre of the
    /// destination block, on its bottom pixel row.
    pub fn arrival_position(&self, block_size: i32) -> WorldPosition {
        WorldPosition {
            x: (self.to_block.x * block_size + block_size / 2) as f32,
            y: (self.to_block.y * block_size + block_size - 1) as f32,
            interior: self.to_interior.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_is_bottom_centre_of_block() {
        let link = WorldLink {
            from_block: BlockCoord::new(0, 0),
            to_block: BlockCoord::new(2, -1),
            to_interior: Some("house".into()),
        };
        let pos = link.arrival_position(32);
        assert_eq!((pos.x, pos.y), (80.0, -1.0));
        assert_eq!(pos.interior, Some(InteriorId::new("house")));
    }
}

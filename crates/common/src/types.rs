use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::{BlockCoord, diagonal_distance, euclidean_distance};

/// Identity of a world object. Queries compare objects by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of a bounded interior space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteriorId(pub String);

impl InteriorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InteriorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InteriorId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A real position plus the space it lives in. `interior == None` is the
/// outdoor chunked world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f32,
    pub y: f32,
    pub interior: Option<InteriorId>,
}

impl WorldPosition {
    pub fn outside(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            interior: None,
        }
    }

    pub fn inside(x: f32, y: f32, interior: InteriorId) -> Self {
        Self {
            x,
            y,
            interior: Some(interior),
        }
    }

    pub fn is_outside(&self) -> bool {
        self.interior.is_none()
    }

    pub fn same_space(&self, other: &WorldPosition) -> bool {
        self.interior == other.interior
    }

    pub fn to_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Integer pixel the position falls on.
    pub fn pixel(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn block(&self, block_size: i32) -> BlockCoord {
        BlockCoord::from_real_f32(self.x, self.y, block_size)
    }

    /// Euclidean distance; infinite across spaces.
    pub fn distance_to(&self, other: &WorldPosition) -> f32 {
        if !self.same_space(other) {
            return f32::INFINITY;
        }
        euclidean_distance(self.x, self.y, other.x, other.y)
    }

    /// Octile distance; infinite across spaces.
    pub fn diagonal_distance_to(&self, other: &WorldPosition) -> f32 {
        if !self.same_space(other) {
            return f32::INFINITY;
        }
        diagonal_distance(self.x, self.y, other.x, other.y)
    }
}

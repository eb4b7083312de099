//! Capability surface of the objects the engine stores and queries.
//!
//! The engine never owns concrete object types. It keeps shared handles and
//! asks them for bounds and flags; living entities are reached through
//! [`HitableObject::as_living`], checked once per object per query.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::types::{InteriorId, ObjectId, WorldPosition};

/// Anything placed in the world.
pub trait WorldObject: Send + Sync + fmt::Debug {
    fn id(&self) -> ObjectId;

    fn position(&self) -> WorldPosition;
}

/// An object that takes part in hit detection and movement blocking.
pub trait HitableObject: WorldObject {
    /// Absolute bounds used by hit tests and sight checks.
    fn hit_box_bounds(&self) -> Rect;

    /// Absolute bounds used by movement blocking.
    fn blocking_bounds(&self) -> Rect;

    fn is_hitable(&self) -> bool;

    fn is_blocking(&self) -> bool;

    fn as_living(&self) -> Option<&dyn LivingEntity> {
        None
    }

    fn interior(&self) -> Option<InteriorId> {
        self.position().interior
    }
}

/// Disposition of one living entity towards another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Allied,
    Neutral,
    Hostile,
}

/// Living, aggro-capable entity.
pub trait LivingEntity {
    fn living_id(&self) -> ObjectId;

    fn is_dead(&self) -> bool;

    fn relation_to(&self, other: &dyn LivingEntity) -> Relation;

    /// Threat scalar towards `other`; lower means more hostile.
    fn aggro_towards(&self, other: &dyn LivingEntity) -> i32;
}

pub type ObjectRef = Arc<dyn HitableObject>;
pub type AmbientRef = Arc<dyn WorldObject>;

/// Identity comparison used by every query.
#[inline]
pub fn same_object(a: &dyn HitableObject, b: &dyn HitableObject) -> bool {
    a.id() == b.id()
}

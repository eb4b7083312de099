use std::collections::HashMap;

use worldpart_common::{
    HitableObject, LivingEntity, ObjectId, Rect, Relation, WorldObject, WorldPosition,
};

/// Living demo entity with a square box centred on its position.
#[derive(Debug, Clone)]
pub struct Creature {
    pub id: ObjectId,
    pub name: &'static str,
    pub position: WorldPosition,
    pub size: i32,
    pub life: i32,
    pub relations: HashMap<ObjectId, Relation>,
}

impl Creature {
    pub fn new(name: &'static str, x: f32, y: f32) -> Self {
        Self {
            id: ObjectId::new(),
            name,
            position: WorldPosition::outside(x, y),
            size: 20,
            life: 100,
            relations: HashMap::new(),
        }
    }

    pub fn hostile_to(mut self, other: ObjectId) -> Self {
        self.relations.insert(other, Relation::Hostile);
        self
    }

    fn bounds(&self) -> Rect {
        let (x, y) = self.position.pixel();
        Rect::new(x - self.size / 2, y - self.size / 2, self.size, self.size)
    }
}

impl WorldObject for Creature {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> WorldPosition {
        self.position.clone()
    }
}

impl HitableObject for Creature {
    fn hit_box_bounds(&self) -> Rect {
        self.bounds()
    }

    fn blocking_bounds(&self) -> Rect {
        // Feet only.
        let bounds = self.bounds();
        Rect::new(bounds.x, bounds.bottom() - 4, bounds.width, 5)
    }

    fn is_hitable(&self) -> bool {
        true
    }

    fn is_blocking(&self) -> bool {
        true
    }

    fn as_living(&self) -> Option<&dyn LivingEntity> {
        Some(self)
    }
}

impl LivingEntity for Creature {
    fn living_id(&self) -> ObjectId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.life <= 0
    }

    fn relation_to(&self, other: &dyn LivingEntity) -> Relation {
        self.relations
            .get(&other.living_id())
            .copied()
            .unwrap_or(Relation::Neutral)
    }

    fn aggro_towards(&self, other: &dyn LivingEntity) -> i32 {
        match self.relation_to(other) {
            Relation::Hostile => -50,
            Relation::Neutral => 0,
            Relation::Allied => 50,
        }
    }
}

/// Static obstacle such as a wall or a tree.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: ObjectId,
    pub bounds: Rect,
}

impl Obstacle {
    pub fn new(bounds: Rect) -> Self {
        Self {
            id: ObjectId::new(),
            bounds,
        }
    }
}

impl WorldObject for Obstacle {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> WorldPosition {
        WorldPosition::outside(
            self.bounds.x as f32 + self.bounds.width as f32 / 2.0,
            self.bounds.y as f32 + self.bounds.height as f32 / 2.0,
        )
    }
}

impl HitableObject for Obstacle {
    fn hit_box_bounds(&self) -> Rect {
        self.bounds
    }

    fn blocking_bounds(&self) -> Rect {
        self.bounds
    }

    fn is_hitable(&self) -> bool {
        true
    }

    fn is_blocking(&self) -> bool {
        true
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use worldpart_common::{
    BlockTypeId, BlockTypeTable, HitableObject, InteriorId, LivingEntity, ObjectId, ObjectRef,
    Rect, Relation, WorldConfig, WorldObject, WorldPosition,
};
use worldpart_stream::{FlatTerrain, GeneratedChunks, Interior, InteriorCatalog, World};

pub const BLOCK: i32 = 16;
pub const GRASS: BlockTypeId = BlockTypeId(1);
pub const WATER: BlockTypeId = BlockTypeId(2);

/// Hitable object with optional living state.
#[derive(Debug, Clone)]
pub struct TestObject {
    pub id: ObjectId,
    pub position: WorldPosition,
    pub hit_box: Rect,
    pub blocking_box: Rect,
    pub hitable: bool,
    pub blocking: bool,
    pub living: Option<Vitals>,
}

#[derive(Debug, Clone, Default)]
pub struct Vitals {
    pub dead: bool,
    pub relations: HashMap<ObjectId, Relation>,
    pub aggro: HashMap<ObjectId, i32>,
}

impl TestObject {
    /// Non-living object whose position is the centre of its box.
    pub fn prop(x: i32, y: i32, width: i32, height: i32) -> Self {
        let bounds = Rect::new(x, y, width, height);
        Self {
            id: ObjectId::new(),
            position: WorldPosition::outside(
                x as f32 + width as f32 / 2.0,
                y as f32 + height as f32 / 2.0,
            ),
            hit_box: bounds,
            blocking_box: bounds,
            hitable: true,
            blocking: true,
            living: None,
        }
    }

    pub fn creature(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            living: Some(Vitals::default()),
            ..Self::prop(x, y, width, height)
        }
    }

    pub fn inside(mut self, interior: &str) -> Self {
        self.position.interior = Some(InteriorId::new(interior));
        self
    }

    pub fn passable(mut self) -> Self {
        self.blocking = false;
        self
    }

    pub fn unhitable(mut self) -> Self {
        self.hitable = false;
        self
    }

    pub fn dead(mut self) -> Self {
        if let Some(vitals) = self.living.as_mut() {
            vitals.dead = true;
        }
        self
    }

    pub fn with_relation(mut self, other: ObjectId, relation: Relation) -> Self {
        if let Some(vitals) = self.living.as_mut() {
            vitals.relations.insert(other, relation);
        }
        self
    }

    pub fn with_aggro(mut self, other: ObjectId, aggro: i32) -> Self {
        if let Some(vitals) = self.living.as_mut() {
            vitals.aggro.insert(other, aggro);
        }
        self
    }

    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl WorldObject for TestObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> WorldPosition {
        self.position.clone()
    }
}

impl HitableObject for TestObject {
    fn hit_box_bounds(&self) -> Rect {
        self.hit_box
    }

    fn blocking_bounds(&self) -> Rect {
        self.blocking_box
    }

    fn is_hitable(&self) -> bool {
        self.hitable
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn as_living(&self) -> Option<&dyn LivingEntity> {
        self.living.as_ref().map(|_| self as &dyn LivingEntity)
    }
}

impl LivingEntity for TestObject {
    fn living_id(&self) -> ObjectId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.living.as_ref().is_some_and(|vitals| vitals.dead)
    }

    fn relation_to(&self, other: &dyn LivingEntity) -> Relation {
        self.living
            .as_ref()
            .and_then(|vitals| vitals.relations.get(&other.living_id()).copied())
            .unwrap_or(Relation::Neutral)
    }

    fn aggro_towards(&self, other: &dyn LivingEntity) -> i32 {
        self.living
            .as_ref()
            .and_then(|vitals| vitals.aggro.get(&other.living_id()).copied())
            .unwrap_or(0)
    }
}

/// Grass everywhere, 4x4-block chunks of 16 px blocks, plus an 8x8 grass
/// interior called "hall".
pub fn world() -> World {
    let config = WorldConfig {
        block_size: BLOCK,
        chunk_span: 4,
        gc_interval_ms: 60_000,
        io_workers: 1,
        default_preload_radius: 1,
    };
    let chunks = Arc::new(GeneratedChunks::new(config.chunk_span, FlatTerrain { fill: GRASS }));
    let interiors = Arc::new(
        InteriorCatalog::new().with(Interior::new(InteriorId::new("hall"), 8, 8, GRASS)),
    );
    World::new(config, Arc::new(BlockTypeTable::default()), chunks, interiors).unwrap()
}

/// Register `object` and hand back a shared reference to it.
pub fn place(world: &mut World, object: TestObject) -> ObjectRef {
    let object = object.into_ref();
    world.add_object(Arc::clone(&object)).unwrap();
    object
}

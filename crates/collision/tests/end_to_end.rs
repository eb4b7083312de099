use std::sync::Arc;

use worldpart_collision::{BlockCheck, RelationFilter, hit_test, is_blocked, nearest_living_target};
use worldpart_common::{
    BlockCoord, BlockTypeId, BlockTypeTable, HitableObject, InteriorId, LivingEntity, ObjectId,
    Rect, Relation, WorldConfig, WorldObject, WorldPosition,
};
use worldpart_stream::{FlatTerrain, GeneratedChunks, InteriorCatalog, World};

const BLOCK: i32 = 32;

#[derive(Debug)]
struct Critter {
    id: ObjectId,
    position: WorldPosition,
    size: i32,
}

impl Critter {
    fn at(x: f32, y: f32) -> Arc<Self> {
        Arc::new(Self {
            id: ObjectId::new(),
            position: WorldPosition::outside(x, y),
            size: 8,
        })
    }

    fn bounds(&self) -> Rect {
        let (x, y) = self.position.pixel();
        Rect::new(x - self.size / 2, y - self.size / 2, self.size, self.size)
    }
}

impl WorldObject for Critter {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> WorldPosition {
        self.position.clone()
    }
}

impl HitableObject for Critter {
    fn hit_box_bounds(&self) -> Rect {
        self.bounds()
    }

    fn blocking_bounds(&self) -> Rect {
        self.bounds()
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

    fn interior(&self) -> Option<InteriorId> {
        None
    }
}

impl LivingEntity for Critter {
    fn living_id(&self) -> ObjectId {
        self.id
    }

    fn is_dead(&self) -> bool {
        false
    }

    fn relation_to(&self, _other: &dyn LivingEntity) -> Relation {
        Relation::Hostile
    }

    fn aggro_towards(&self, _other: &dyn LivingEntity) -> i32 {
        0
    }
}

fn world() -> World {
    let config = WorldConfig {
        block_size: BLOCK,
        chunk_span: 8,
        io_workers: 2,
        ..WorldConfig::default()
    };
    World::new(
        config,
        Arc::new(BlockTypeTable::default()),
        Arc::new(GeneratedChunks::new(8, FlatTerrain { fill: BlockTypeId(1) })),
        Arc::new(InteriorCatalog::new()),
    )
    .unwrap()
}

#[test]
fn terrain_edit_toggles_fast_blocking() {
    let mut world = world();
    let walker = Critter::at(4.0, 4.0);
    world.add_object(walker.clone()).unwrap();
    let probe = Rect::new(2 * BLOCK, 2 * BLOCK, 1, 1);

    assert!(world.set_block_type(BlockCoord::new(2, 2), None, BlockTypeId(2)));
    assert!(is_blocked(&mut world, walker.as_ref(), &probe, BlockCheck::Fast));

    assert!(world.set_block_type(BlockCoord::new(2, 2), None, BlockTypeId(1)));
    assert!(!is_blocked(&mut world, walker.as_ref(), &probe, BlockCheck::Fast));
}

#[test]
fn queries_work_across_chunk_borders() {
    let mut world = world();
    let chunk_pixels = world.metrics().chunk_pixel_size() as f32;
    let hunter = Critter::at(chunk_pixels - 20.0, 10.0);
    let prey = Critter::at(chunk_pixels + 20.0, 10.0);
    let straddler = Critter::at(chunk_pixels, 200.0);
    for critter in [&hunter, &prey, &straddler] {
        world.add_object(Arc::clone(critter) as Arc<dyn HitableObject>).unwrap();
    }

    let area = Rect::new(0, 0, 2 * chunk_pixels as i32, 300);
    let hits = hit_test(&mut world, area, None, Some(hunter.as_ref()));
    assert_eq!(hits.len(), 2);

    let target = nearest_living_target(
        &mut world,
        area,
        None,
        hunter.as_ref(),
        RelationFilter::Relation(Relation::Hostile),
    )
    .unwrap();
    assert_eq!(target.id(), prey.id());
}

#[test]
fn queries_off_the_simulation_thread_panic() {
    let world = world();
    let outcome = std::thread::spawn(move || {
        let mut world = world;
        let walker = Critter::at(0.0, 0.0);
        is_blocked(&mut world, walker.as_ref(), &Rect::new(0, 0, 1, 1), BlockCheck::Fast)
    })
    .join();
    assert!(outcome.is_err());
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use worldpart_common::{
    AmbientRef, BlockCoord, BlockTypeId, BlockTypeTable, InteriorId, ObjectId, ObjectRef, Rect,
};

use crate::cache::{GcReport, PartCache, PartError, PartStorage};
use crate::link::WorldLink;
use crate::list::ObjectList;
use crate::observer::Observer;
use crate::worker::WorkerPool;

/// Bounded, non-chunked space such as a house or a dungeon instance.
///
/// Block coordinates are local: `(0, 0)` is the top-left block. Anything
/// outside the dimensions reads as [`BlockTypeId::INVALID`].
#[derive(Debug, Clone)]
pub struct Interior {
    id: InteriorId,
    width: i32,
    height: i32,
    blocks: Vec<BlockTypeId>,
    contained: ObjectList<ObjectRef>,
    ambient: ObjectList<AmbientRef>,
    links: HashMap<u64, WorldLink>,
}

impl Interior {
    pub fn new(id: InteriorId, width: i32, height: i32, fill: BlockTypeId) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            id,
            width: width.max(0),
            height: height.max(0),
            blocks: vec![fill; len],
            contained: ObjectList::new(),
            ambient: ObjectList::new(),
            links: HashMap::new(),
        }
    }

    /// Build from a row-major terrain grid.
    pub fn from_blocks(
        id: InteriorId,
        width: i32,
        height: i32,
        blocks: Vec<BlockTypeId>,
    ) -> Result<Self, PartError> {
        if width < 0 || height < 0 || blocks.len() != (width * height) as usize {
            return Err(PartError::Corrupt {
                key: id.to_string(),
                reason: format!(
                    "{width}x{height} interior cannot hold {} blocks",
                    blocks.len()
                ),
            });
        }
        let mut interior = Self::new(id, width, height, BlockTypeId::NONE);
        interior.blocks = blocks;
        Ok(interior)
    }

    pub fn id(&self) -> &InteriorId {
        &self.id
    }

    /// `(width, height)` in blocks.
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn bounds(&self, block_size: i32) -> Rect {
        Rect::new(0, 0, self.width * block_size, self.height * block_size)
    }

    pub fn blocks(&self) -> &[BlockTypeId] {
        &self.blocks
    }

    pub fn in_bounds(&self, block: BlockCoord) -> bool {
        (0..self.width).contains(&block.x) && (0..self.height).contains(&block.y)
    }

    pub fn block_type(&self, block: BlockCoord) -> BlockTypeId {
        match self.index(block) {
            Some(index) => self.blocks[index],
            None => BlockTypeId::INVALID,
        }
    }

    /// Returns false for blocks outside the dimensions.
    pub fn set_block_type(&mut self, block: BlockCoord, block_type: BlockTypeId) -> bool {
        match self.index(block) {
            Some(index) => {
                self.blocks[index] = block_type;
                true
            }
            None => false,
        }
    }

    /// Terrain-only walkability; out-of-bounds blocks never are.
    pub fn is_block_walkable(&self, block: BlockCoord, table: &BlockTypeTable) -> bool {
        self.in_bounds(block) && !table.is_blocking(self.block_type(block))
    }

    fn index(&self, block: BlockCoord) -> Option<usize> {
        self.in_bounds(block)
            .then(|| (block.y * self.width + block.x) as usize)
    }

    pub fn add_contained_object(&mut self, object: ObjectRef) -> bool {
        self.contained.add(object)
    }

    pub fn remove_contained_object(&mut self, id: ObjectId) -> bool {
        self.contained.remove(id)
    }

    pub fn contained_objects(&self) -> &[ObjectRef] {
        self.contained.as_slice()
    }

    pub fn add_ambient_object(&mut self, object: AmbientRef) -> bool {
        self.ambient.add(object)
    }

    pub fn remove_ambient_object(&mut self, id: ObjectId) -> bool {
        self.ambient.remove(id)
    }

    pub fn ambient_objects(&self) -> &[AmbientRef] {
        self.ambient.as_slice()
    }

    pub fn add_world_link(&mut self, link: WorldLink) -> Option<WorldLink> {
        self.links.insert(link.from_block.pack(), link)
    }

    pub fn remove_world_link(&mut self, from_block: BlockCoord) -> Option<WorldLink> {
        self.links.remove(&from_block.pack())
    }

    pub fn world_link_at(&self, block: BlockCoord) -> Option<&WorldLink> {
        self.links.get(&block.pack())
    }

    pub fn world_links(&self) -> impl Iterator<Item = &WorldLink> {
        self.links.values()
    }

    /// Copy of the terrain and links with every object list left empty.
    pub fn clone_terrain(&self) -> Interior {
        Interior {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            blocks: self.blocks.clone(),
            contained: ObjectList::new(),
            ambient: ObjectList::new(),
            links: self.links.clone(),
        }
    }
}

/// In-memory interior templates, keyed by id. Saving stores the terrain
/// back so a re-entered interior keeps its edits.
#[derive(Debug, Default)]
pub struct InteriorCatalog {
    interiors: Mutex<HashMap<InteriorId, Interior>>,
}

impl InteriorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, interior: Interior) -> Self {
        self.register(interior);
        self
    }

    pub fn register(&self, interior: Interior) {
        let mut interiors = self.lock();
        interiors.insert(interior.id().clone(), interior.clone_terrain());
    }

    pub fn contains(&self, id: &InteriorId) -> bool {
        self.lock().contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<InteriorId, Interior>> {
        self.interiors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartStorage<InteriorId, Interior> for InteriorCatalog {
    fn load(&self, key: &InteriorId) -> Result<Interior, PartError> {
        self.lock()
            .get(key)
            .map(Interior::clone_terrain)
            .ok_or_else(|| PartError::NotFound(key.to_string()))
    }

    fn save(&self, key: &InteriorId, part: &Interior) -> Result<(), PartError> {
        self.lock().insert(key.clone(), part.clone_terrain());
        Ok(())
    }
}

/// Streams interiors in and out as observers enter and leave them.
pub struct InteriorManager {
    cache: PartCache<InteriorId, Interior>,
}

impl InteriorManager {
    pub fn new(
        storage: Arc<dyn PartStorage<InteriorId, Interior>>,
        workers: Arc<WorkerPool>,
        gc_interval: Duration,
    ) -> Self {
        Self {
            cache: PartCache::new("interiors", storage, workers, gc_interval),
        }
    }

    pub fn bind_to_current_thread(&mut self) {
        self.cache.bind_to_current_thread();
    }

    pub fn interior(&mut self, id: &InteriorId) -> Option<&Interior> {
        self.cache.get(id, true)
    }

    pub fn interior_mut(&mut self, id: &InteriorId) -> Option<&mut Interior> {
        self.cache.get_mut(id, true)
    }

    pub fn loaded_interior(&self, id: &InteriorId) -> Option<&Interior> {
        self.cache.peek(id)
    }

    pub fn loaded_interior_mut(&mut self, id: &InteriorId) -> Option<&mut Interior> {
        self.cache.get_mut(id, false)
    }

    pub fn load_async(&mut self, id: InteriorId) -> bool {
        self.cache.load_async(id)
    }

    /// Publish an interior created at runtime, e.g. a fresh dungeon
    /// instance.
    pub fn insert(&mut self, interior: Interior) -> Option<Interior> {
        self.cache.insert(interior.id().clone(), interior)
    }

    /// [`BlockTypeId::INVALID`] when the interior cannot be loaded or the
    /// block is out of bounds.
    pub fn block_type(&mut self, id: &InteriorId, block: BlockCoord) -> BlockTypeId {
        self.interior(id)
            .map_or(BlockTypeId::INVALID, |interior| interior.block_type(block))
    }

    pub fn set_block_type(
        &mut self,
        id: &InteriorId,
        block: BlockCoord,
        block_type: BlockTypeId,
    ) -> bool {
        self.interior_mut(id)
            .is_some_and(|interior| interior.set_block_type(block, block_type))
    }

    pub fn unload(&mut self, id: &InteriorId) -> bool {
        self.cache.unload(id)
    }

    pub fn remove(&mut self, id: &InteriorId) -> bool {
        self.cache.remove(id)
    }

    pub fn save_all(&mut self) -> usize {
        self.cache.save_all()
    }

    pub fn poll(&mut self) -> usize {
        self.cache.poll()
    }

    pub fn flush(&mut self) {
        self.cache.flush();
    }

    pub fn is_loaded(&self, id: &InteriorId) -> bool {
        self.cache.is_loaded(id)
    }

    pub fn has_failed(&self, id: &InteriorId) -> bool {
        self.cache.has_failed(id)
    }

    pub fn forget_failure(&mut self, id: &InteriorId) -> bool {
        self.cache.forget_failure(id)
    }

    pub fn count_loaded(&self) -> usize {
        self.cache.count_loaded()
    }

    pub fn keys(&self) -> HashSet<InteriorId> {
        self.cache.keys()
    }

    /// Advance the GC clock; a sweep evicts every interior no observer
    /// stands in.
    pub fn tick(&mut self, elapsed: Duration, observers: &[Observer]) -> Option<GcReport> {
        self.cache.tick(elapsed, |id, _| {
            !observers.iter().any(|observer| observer.is_inside(id))
        })
    }
}

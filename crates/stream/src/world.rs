use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use worldpart_common::{
    AmbientRef, BlockCoord, BlockTypeId, BlockTypeTable, ChunkKey, GridMetrics, HitableObject,
    InteriorId, ObjectId, ObjectRef, Rect, WorldConfig, WorldPosition,
};

use crate::cache::{GcReport, PartError, PartStorage};
use crate::chunk::Chunk;
use crate::grid::ChunkGrid;
use crate::interior::{Interior, InteriorManager};
use crate::link::WorldLink;
use crate::observer::Observer;
use crate::thread::SimThread;
use crate::worker::WorkerPool;

/// Where [`World::add_object`] registered an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Fully inside one chunk.
    Contained(ChunkKey),
    /// Straddling chunk borders; listed in each of these chunks.
    Overlapping(Vec<ChunkKey>),
    Interior(InteriorId),
}

/// Summary of one [`World::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: u64,
    pub preload_requests: usize,
    pub chunk_gc: Option<GcReport>,
    pub interior_gc: Option<GcReport>,
    pub loaded_chunks: usize,
    pub loaded_interiors: usize,
}

/// The explicit context every query runs against: outdoor chunks, loaded
/// interiors, observers and the terrain table.
pub struct World {
    config: WorldConfig,
    metrics: GridMetrics,
    table: Arc<BlockTypeTable>,
    workers: Arc<WorkerPool>,
    chunks: ChunkGrid,
    interiors: InteriorManager,
    observers: Vec<Observer>,
    /// Where each object was last registered by [`World::add_object`].
    placements: HashMap<ObjectId, Placement>,
    ticks: u64,
    sim: SimThread,
}

impl World {
    /// Build a world bound to the calling thread.
    pub fn new(
        config: WorldConfig,
        table: Arc<BlockTypeTable>,
        chunk_storage: Arc<dyn PartStorage<ChunkKey, Chunk>>,
        interior_storage: Arc<dyn PartStorage<InteriorId, Interior>>,
    ) -> Result<Self, PartError> {
        config.validate()?;
        let metrics = config.metrics();
        let workers = Arc::new(WorkerPool::new(config.io_workers)?);
        let chunks = ChunkGrid::new(
            metrics,
            Arc::clone(&table),
            chunk_storage,
            Arc::clone(&workers),
            config.gc_interval(),
        );
        let interiors =
            InteriorManager::new(interior_storage, Arc::clone(&workers), config.gc_interval());
        tracing::info!(
            block_size = metrics.block_size,
            chunk_span = metrics.chunk_span,
            io_workers = workers.size(),
            "world created"
        );
        Ok(Self {
            config,
            metrics,
            table,
            workers,
            chunks,
            interiors,
            observers: Vec::new(),
            placements: HashMap::new(),
            ticks: 0,
            sim: SimThread::current(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn metrics(&self) -> GridMetrics {
        self.metrics
    }

    pub fn table(&self) -> &BlockTypeTable {
        &self.table
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    pub fn chunks(&self) -> &ChunkGrid {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkGrid {
        &mut self.chunks
    }

    pub fn interiors(&self) -> &InteriorManager {
        &self.interiors
    }

    pub fn interiors_mut(&mut self) -> &mut InteriorManager {
        &mut self.interiors
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Panics unless called on the simulation thread.
    #[track_caller]
    pub fn assert_sim_thread(&self, entry_point: &str) {
        self.sim.assert_current(entry_point);
    }

    /// Hand the world to the calling thread.
    pub fn bind_to_current_thread(&mut self) {
        self.sim = SimThread::current();
        self.chunks.bind_to_current_thread();
        self.interiors.bind_to_current_thread();
    }

    /// Replace the block type table; walkability is rebuilt.
    pub fn set_table(&mut self, table: Arc<BlockTypeTable>) {
        self.table = Arc::clone(&table);
        self.chunks.set_table(table);
    }

    /// Start tracking `id`, or move it if already tracked. A `None` radius
    /// uses the configured default.
    pub fn track_observer(&mut self, id: ObjectId, position: WorldPosition, radius: Option<i32>) {
        let radius = radius.unwrap_or(self.config.default_preload_radius);
        match self.observers.iter_mut().find(|observer| observer.id == id) {
            Some(observer) => {
                observer.position = position;
                observer.preload_radius = radius.max(0);
            }
            None => self.observers.push(Observer::new(id, position, radius)),
        }
    }

    pub fn untrack_observer(&mut self, id: ObjectId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        before != self.observers.len()
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    /// Preload around every observer, apply finished background work and
    /// run the garbage collectors when due.
    pub fn tick(&mut self, elapsed: Duration) -> TickReport {
        self.sim.assert_current("World::tick");
        self.ticks += 1;
        let _span = tracing::info_span!("world_tick", tick = self.ticks).entered();
        let started = Instant::now();

        let mut preload_requests = 0;
        for observer in &self.observers {
            match &observer.position.interior {
                None => {
                    for key in observer.covered_chunks(self.metrics) {
                        if self.chunks.load_async(key) {
                            preload_requests += 1;
                        }
                    }
                }
                Some(id) => {
                    if self.interiors.load_async(id.clone()) {
                        preload_requests += 1;
                    }
                }
            }
        }

        let chunk_gc = self.chunks.tick(elapsed, &self.observers);
        let interior_gc = self.interiors.tick(elapsed, &self.observers);
        let report = TickReport {
            tick: self.ticks,
            preload_requests,
            chunk_gc,
            interior_gc,
            loaded_chunks: self.chunks.count_loaded(),
            loaded_interiors: self.interiors.count_loaded(),
        };
        tracing::trace!(
            preload_requests,
            loaded_chunks = report.loaded_chunks,
            loaded_interiors = report.loaded_interiors,
            elapsed = ?started.elapsed(),
            "world tick"
        );
        report
    }

    /// Terrain under `block` in the given space.
    pub fn block_type(&mut self, block: BlockCoord, interior: Option<&InteriorId>) -> BlockTypeId {
        self.sim.assert_current("World::block_type");
        match interior {
            None => self.chunks.block_type(block),
            Some(id) => self.interiors.block_type(id, block),
        }
    }

    pub fn set_block_type(
        &mut self,
        block: BlockCoord,
        interior: Option<&InteriorId>,
        block_type: BlockTypeId,
    ) -> bool {
        self.sim.assert_current("World::set_block_type");
        match interior {
            None => self.chunks.set_block_type(block, block_type),
            Some(id) => self.interiors.set_block_type(id, block, block_type),
        }
    }

    /// Terrain-only walkability, as used by fast blocking checks.
    pub fn is_block_walkable(&mut self, block: BlockCoord, interior: Option<&InteriorId>) -> bool {
        match interior {
            None => self.chunks.is_block_walkable(block),
            Some(id) => self
                .interiors
                .interior(id)
                .is_some_and(|interior| interior.is_block_walkable(block, &self.table)),
        }
    }

    /// The link whose source block `position` stands on, if any.
    pub fn world_link_at(&mut self, position: &WorldPosition) -> Option<WorldLink> {
        self.sim.assert_current("World::world_link_at");
        let block = position.block(self.metrics.block_size);
        match &position.interior {
            None => self
                .chunks
                .chunk(block.chunk(self.metrics.chunk_span))?
                .world_link_at(block)
                .cloned(),
            Some(id) => self.interiors.interior(id)?.world_link_at(block).cloned(),
        }
    }

    /// Register `object` in the space its position names, loading the
    /// parts it lands in. An object registered before is first taken out
    /// of its previous placement, so this also moves it.
    pub fn add_object(&mut self, object: ObjectRef) -> Result<Placement, PartError> {
        self.sim.assert_current("World::add_object");
        let id = object.id();
        if let Some(previous) = self.placements.remove(&id) {
            self.unregister(id, &previous);
        }
        let placement = self.register(object)?;
        self.placements.insert(id, placement.clone());
        Ok(placement)
    }

    /// Unregister `object` from the resident parts it was placed in by
    /// [`World::add_object`], wherever it stands now.
    pub fn remove_object(&mut self, object: &dyn HitableObject) -> bool {
        self.sim.assert_current("World::remove_object");
        let id = object.id();
        match self.placements.remove(&id) {
            Some(placement) => self.unregister(id, &placement),
            None => false,
        }
    }

    /// Where `id` was last registered.
    pub fn placement(&self, id: ObjectId) -> Option<&Placement> {
        self.placements.get(&id)
    }

    fn register(&mut self, object: ObjectRef) -> Result<Placement, PartError> {
        if let Some(id) = object.interior() {
            let interior = self
                .interiors
                .interior_mut(&id)
                .ok_or_else(|| PartError::Unavailable(id.to_string()))?;
            interior.add_contained_object(object);
            return Ok(Placement::Interior(id));
        }

        let keys = self.chunks.keys_in(&object_bounds(object.as_ref()));
        for key in &keys {
            if self.chunks.chunk(*key).is_none() {
                return Err(PartError::Unavailable(format!("{key:?}")));
            }
        }
        if let [key] = keys.as_slice() {
            if let Some(chunk) = self.chunks.loaded_chunk_mut(*key) {
                chunk.add_contained_object(object);
            }
            return Ok(Placement::Contained(*key));
        }
        for key in &keys {
            if let Some(chunk) = self.chunks.loaded_chunk_mut(*key) {
                chunk.add_overlapping_object(Arc::clone(&object));
            }
        }
        tracing::trace!(id = ?object.id(), chunks = keys.len(), "overlapping object added");
        Ok(Placement::Overlapping(keys))
    }

    fn unregister(&mut self, id: ObjectId, placement: &Placement) -> bool {
        match placement {
            Placement::Interior(interior) => self
                .interiors
                .loaded_interior_mut(interior)
                .is_some_and(|interior| interior.remove_contained_object(id)),
            Placement::Contained(key) => self
                .chunks
                .loaded_chunk_mut(*key)
                .is_some_and(|chunk| chunk.remove_contained_object(id)),
            Placement::Overlapping(keys) => {
                let mut removed = false;
                for key in keys {
                    if let Some(chunk) = self.chunks.loaded_chunk_mut(*key) {
                        removed |= chunk.remove_overlapping_object(id);
                    }
                }
                removed
            }
        }
    }

    pub fn add_ambient_object(&mut self, object: AmbientRef) -> Result<(), PartError> {
        self.sim.assert_current("World::add_ambient_object");
        let position = object.position();
        let added = match &position.interior {
            None => {
                let key = self.position_chunk(&position);
                self.chunks
                    .chunk_mut(key)
                    .ok_or_else(|| PartError::Unavailable(format!("{key:?}")))?
                    .add_ambient_object(object)
            }
            Some(id) => self
                .interiors
                .interior_mut(id)
                .ok_or_else(|| PartError::Unavailable(id.to_string()))?
                .add_ambient_object(object),
        };
        if !added {
            tracing::trace!("ambient object already registered");
        }
        Ok(())
    }

    pub fn remove_ambient_object(&mut self, id: ObjectId, position: &WorldPosition) -> bool {
        self.sim.assert_current("World::remove_ambient_object");
        match &position.interior {
            None => {
                let key = self.position_chunk(position);
                self.chunks
                    .loaded_chunk_mut(key)
                    .is_some_and(|chunk| chunk.remove_ambient_object(id))
            }
            Some(interior) => self
                .interiors
                .loaded_interior_mut(interior)
                .is_some_and(|interior| interior.remove_ambient_object(id)),
        }
    }

    /// Synchronously persist every resident part. Returns the number of
    /// parts written.
    pub fn save_all(&mut self) -> usize {
        self.sim.assert_current("World::save_all");
        let saved = self.chunks.save_all() + self.interiors.save_all();
        tracing::info!(saved, "world saved");
        saved
    }

    fn position_chunk(&self, position: &WorldPosition) -> ChunkKey {
        position
            .block(self.metrics.block_size)
            .chunk(self.metrics.chunk_span)
    }
}

fn object_bounds(object: &dyn HitableObject) -> Rect {
    Rect::union(object.hit_box_bounds(), object.blocking_bounds())
}

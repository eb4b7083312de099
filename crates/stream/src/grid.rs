use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use worldpart_common::{BlockCoord, BlockTypeId, BlockTypeTable, ChunkKey, GridMetrics, Rect};

use crate::cache::{GcReport, PartCache, PartStorage};
use crate::chunk::Chunk;
use crate::observer::Observer;
use crate::walkable::WalkableGrid;
use crate::worker::WorkerPool;

/// Unbounded outdoor world, streamed chunk by chunk.
///
/// Terrain edits go through the grid so the walkability grid never drifts
/// from the chunk contents.
pub struct ChunkGrid {
    metrics: GridMetrics,
    table: Arc<BlockTypeTable>,
    cache: PartCache<ChunkKey, Chunk>,
    walkable: WalkableGrid,
}

impl ChunkGrid {
    pub fn new(
        metrics: GridMetrics,
        table: Arc<BlockTypeTable>,
        storage: Arc<dyn PartStorage<ChunkKey, Chunk>>,
        workers: Arc<WorkerPool>,
        gc_interval: Duration,
    ) -> Self {
        Self {
            metrics,
            table,
            cache: PartCache::new("chunks", storage, workers, gc_interval),
            walkable: WalkableGrid::new(metrics.chunk_span),
        }
    }

    pub fn metrics(&self) -> GridMetrics {
        self.metrics
    }

    pub fn table(&self) -> &BlockTypeTable {
        &self.table
    }

    pub fn bind_to_current_thread(&mut self) {
        self.cache.bind_to_current_thread();
    }

    /// Resident chunk, loading it synchronously when absent.
    pub fn chunk(&mut self, key: ChunkKey) -> Option<&Chunk> {
        self.cache.get(&key, true)
    }

    pub fn chunk_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        self.cache.get_mut(&key, true)
    }

    /// Resident chunk, never loading.
    pub fn loaded_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.cache.peek(&key)
    }

    pub fn loaded_chunk_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        self.cache.get_mut(&key, false)
    }

    pub fn load_async(&mut self, key: ChunkKey) -> bool {
        self.cache.load_async(key)
    }

    /// Chunks touched by `rect`, x outer and y inner.
    pub fn keys_in(&self, rect: &Rect) -> Vec<ChunkKey> {
        let (low, high) = rect.chunk_span(self.metrics.chunk_pixel_size());
        let mut keys = Vec::new();
        for x in low.x..=high.x {
            for y in low.y..=high.y {
                keys.push(ChunkKey::new(x, y));
            }
        }
        keys
    }

    /// Terrain under `block`; [`BlockTypeId::INVALID`] when its chunk
    /// cannot be loaded.
    pub fn block_type(&mut self, block: BlockCoord) -> BlockTypeId {
        let key = block.chunk(self.metrics.chunk_span);
        self.chunk(key)
            .map_or(BlockTypeId::INVALID, |chunk| chunk.block_type(block))
    }

    /// Change the terrain under `block`. Returns false when its chunk
    /// cannot be loaded.
    pub fn set_block_type(&mut self, block: BlockCoord, block_type: BlockTypeId) -> bool {
        let key = block.chunk(self.metrics.chunk_span);
        let Some(chunk) = self.cache.get_mut(&key, true) else {
            return false;
        };
        chunk.set_block_type(block, block_type);
        self.walkable
            .set_block(block, !self.table.is_blocking(block_type));
        tracing::trace!(?block, ?block_type, "block type changed");
        true
    }

    /// Terrain-only walkability. Blocks of unavailable chunks are not
    /// walkable.
    pub fn is_block_walkable(&mut self, block: BlockCoord) -> bool {
        if let Some(walkable) = self.walkable.is_block_walkable(block) {
            return walkable;
        }
        let key = block.chunk(self.metrics.chunk_span);
        let Some(chunk) = self.cache.get(&key, true) else {
            return false;
        };
        self.walkable.refresh_chunk(chunk, &self.table);
        self.walkable.is_block_walkable(block).unwrap_or(false)
    }

    /// Recompute walkability of every resident chunk, e.g. after the block
    /// type table changed.
    pub fn rebuild_walkability(&mut self) {
        self.walkable.clear();
        for (_, chunk) in self.cache.iter() {
            self.walkable.refresh_chunk(chunk, &self.table);
        }
        tracing::debug!(chunks = self.walkable.chunk_count(), "walkability rebuilt");
    }

    /// Replace the block type table and rebuild walkability.
    pub fn set_table(&mut self, table: Arc<BlockTypeTable>) {
        self.table = table;
        self.rebuild_walkability();
    }

    pub fn unload(&mut self, key: ChunkKey) -> bool {
        self.walkable.forget_chunk(key);
        self.cache.unload(&key)
    }

    pub fn remove(&mut self, key: ChunkKey) -> bool {
        self.walkable.forget_chunk(key);
        self.cache.remove(&key)
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

    pub fn is_loaded(&self, key: ChunkKey) -> bool {
        self.cache.is_loaded(&key)
    }

    pub fn is_pending(&self, key: ChunkKey) -> bool {
        self.cache.is_pending(&key)
    }

    pub fn has_failed(&self, key: ChunkKey) -> bool {
        self.cache.has_failed(&key)
    }

    pub fn forget_failure(&mut self, key: ChunkKey) -> bool {
        self.cache.forget_failure(&key)
    }

    pub fn count_loaded(&self) -> usize {
        self.cache.count_loaded()
    }

    pub fn keys(&self) -> HashSet<ChunkKey> {
        self.cache.keys()
    }

    /// Advance the GC clock; a sweep evicts every chunk no outdoor observer
    /// covers.
    pub fn tick(&mut self, elapsed: Duration, observers: &[Observer]) -> Option<GcReport> {
        let metrics = self.metrics;
        let report = self.cache.tick(elapsed, |key, _| {
            !observers
                .iter()
                .any(|observer| observer.covers_chunk(*key, metrics))
        })?;
        let cache = &self.cache;
        self.walkable.retain(|key| cache.is_loaded(&key));
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{FlatTerrain, GeneratedChunks};
    use worldpart_common::{ObjectId, WorldPosition};

    const METRICS: GridMetrics = GridMetrics {
        block_size: 8,
        chunk_span: 4,
    };

    fn grid(gc_interval: Duration) -> ChunkGrid {
        let storage = Arc::new(GeneratedChunks::new(
            METRICS.chunk_span,
            FlatTerrain {
                fill: BlockTypeId(1),
            },
        ));
        let workers = Arc::new(WorkerPool::new(1).unwrap());
        ChunkGrid::new(
            METRICS,
            Arc::new(BlockTypeTable::default()),
            storage,
            workers,
            gc_interval,
        )
    }

    #[test]
    fn block_type_loads_owning_chunk() {
        let mut grid = grid(Duration::from_secs(1));
        assert_eq!(grid.block_type(BlockCoord::new(-1, -1)), BlockTypeId(1));
        assert!(grid.is_loaded(ChunkKey::new(-1, -1)));
        assert_eq!(grid.count_loaded(), 1);
    }

    #[test]
    fn set_block_type_updates_walkability() {
        let mut grid = grid(Duration::from_secs(1));
        let block = BlockCoord::new(2, 2);
        assert!(grid.is_block_walkable(block));

        assert!(grid.set_block_type(block, BlockTypeId(2)));
        assert!(!grid.is_block_walkable(block));
        assert_eq!(grid.block_type(block), BlockTypeId(2));

        assert!(grid.set_block_type(block, BlockTypeId(1)));
        assert!(grid.is_block_walkable(block));
    }

    #[test]
    fn keys_in_orders_x_outer() {
        let grid = grid(Duration::from_secs(1));
        let keys = grid.keys_in(&Rect::new(-1, 0, 40, 1));
        assert_eq!(
            keys,
            vec![
                ChunkKey::new(-1, 0),
                ChunkKey::new(0, 0),
                ChunkKey::new(1, 0)
            ]
        );
    }

    #[test]
    fn keys_in_inverted_rect_is_empty() {
        let grid = grid(Duration::from_secs(1));
        let inverted = Rect::new(0, 0, -1_000_000_000, -1_000_000_000);
        assert!(grid.keys_in(&inverted).is_empty());
    }

    #[test]
    fn gc_evicts_chunks_out_of_observer_range() {
        let mut grid = grid(Duration::from_millis(10));
        let observer = Observer::new(ObjectId::new(), WorldPosition::outside(1.0, 1.0), 1);
        grid.chunk(ChunkKey::new(0, 0));
        grid.chunk(ChunkKey::new(1, 1));
        grid.chunk(ChunkKey::new(5, 0));
        assert!(grid.is_block_walkable(BlockCoord::new(20, 0)));

        assert!(grid.tick(Duration::from_millis(5), std::slice::from_ref(&observer)).is_none());
        let report = grid
            .tick(Duration::from_millis(10), std::slice::from_ref(&observer))
            .unwrap();
        assert_eq!(report.evicted, 1);
        assert!(grid.is_loaded(ChunkKey::new(1, 1)));
        assert!(!grid.is_loaded(ChunkKey::new(5, 0)));
    }
}

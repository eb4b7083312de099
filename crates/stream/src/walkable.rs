use std::collections::HashMap;

use worldpart_common::{BlockCoord, BlockTypeTable, ChunkKey};

use crate::chunk::Chunk;

/// Precomputed terrain-only walkability of resident chunks, keyed by the
/// packed chunk key. Cheap to consult for AI planning and pathfinding.
#[derive(Debug, Clone)]
pub struct WalkableGrid {
    span: i32,
    chunks: HashMap<u64, Vec<bool>>,
}

impl WalkableGrid {
    pub fn new(span: i32) -> Self {
        Self {
            span,
            chunks: HashMap::new(),
        }
    }

    /// Recompute one chunk from its terrain.
    pub fn refresh_chunk(&mut self, chunk: &Chunk, table: &BlockTypeTable) {
        let cells = chunk
            .blocks()
            .iter()
            .map(|block_type| !table.is_blocking(*block_type))
            .collect();
        self.chunks.insert(chunk.key().pack(), cells);
    }

    /// Update a single block. Ignored when its chunk is not tracked.
    pub fn set_block(&mut self, block: BlockCoord, walkable: bool) {
        let index = self.index(block);
        if let Some(cells) = self.chunks.get_mut(&block.chunk(self.span).pack()) {
            cells[index] = walkable;
        }
    }

    pub fn forget_chunk(&mut self, key: ChunkKey) -> bool {
        self.chunks.remove(&key.pack()).is_some()
    }

    /// Keep only chunks `keep` approves.
    pub fn retain(&mut self, mut keep: impl FnMut(ChunkKey) -> bool) {
        self.chunks.retain(|packed, _| keep(ChunkKey::unpack(*packed)));
    }

    pub fn is_tracked(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key.pack())
    }

    /// `None` when the block's chunk is not tracked.
    pub fn is_block_walkable(&self, block: BlockCoord) -> Option<bool> {
        self.chunks
            .get(&block.chunk(self.span).pack())
            .map(|cells| cells[self.index(block)])
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    fn index(&self, block: BlockCoord) -> usize {
        let (x, y) = block.local_offset(self.span);
        y * self.span as usize + x
    }
}

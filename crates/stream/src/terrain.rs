use worldpart_common::{BlockTypeId, ChunkKey};

use crate::cache::{PartError, PartStorage};
use crate::chunk::Chunk;

/// Synthesizes terrain for chunks that have never been stored.
pub trait TerrainGenerator: Send + Sync + 'static {
    fn generate(&self, key: ChunkKey, span: i32) -> Chunk;
}

/// Every block of every chunk has the same type.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    pub fill: BlockTypeId,
}

impl TerrainGenerator for FlatTerrain {
    fn generate(&self, key: ChunkKey, span: i32) -> Chunk {
        Chunk::new(key, span, self.fill)
    }
}

/// Chunk storage with nothing behind it: chunks are generated on load and
/// discarded on save.
pub struct GeneratedChunks<G> {
    span: i32,
    generator: G,
}

impl<G: TerrainGenerator> GeneratedChunks<G> {
    pub fn new(span: i32, generator: G) -> Self {
        Self { span, generator }
    }
}

impl<G: TerrainGenerator> PartStorage<ChunkKey, Chunk> for GeneratedChunks<G> {
    fn load(&self, key: &ChunkKey) -> Result<Chunk, PartError> {
        Ok(self.generator.generate(*key, self.span))
    }

    fn save(&self, key: &ChunkKey, _chunk: &Chunk) -> Result<(), PartError> {
        tracing::trace!(?key, "generated chunk not persisted");
        Ok(())
    }
}

use std::sync::Arc;

use worldpart_common::{ChunkKey, InteriorId};
use worldpart_stream::{Chunk, Interior, PartError, PartStorage, TerrainGenerator};

use crate::store::{PartStore, StoreError};

/// Chunk storage backed by a [`PartStore`]; chunks never written before
/// come from the terrain generator.
pub struct StoredChunks<G> {
    store: Arc<PartStore>,
    generator: G,
}

impl<G: TerrainGenerator> StoredChunks<G> {
    pub fn new(store: Arc<PartStore>, generator: G) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &PartStore {
        &self.store
    }
}

impl<G: TerrainGenerator> PartStorage<ChunkKey, Chunk> for StoredChunks<G> {
    fn load(&self, key: &ChunkKey) -> Result<Chunk, PartError> {
        match self.store.read_chunk(*key)? {
            Some(chunk) => Ok(chunk),
            None => {
                tracing::trace!(?key, "chunk not stored, generating");
                Ok(self.generator.generate(*key, self.store.meta().chunk_span))
            }
        }
    }

    fn save(&self, _key: &ChunkKey, chunk: &Chunk) -> Result<(), PartError> {
        Ok(self.store.write_chunk(chunk)?)
    }
}

/// Interior storage backed by a [`PartStore`]. Missing interiors are an
/// error.
pub struct StoredInteriors {
    store: Arc<PartStore>,
}

impl StoredInteriors {
    pub fn new(store: Arc<PartStore>) -> Self {
        Self { store }
    }
}

impl PartStorage<InteriorId, Interior> for StoredInteriors {
    fn load(&self, key: &InteriorId) -> Result<Interior, PartError> {
        self.store
            .read_interior(key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()).into())
    }

    fn save(&self, _key: &InteriorId, interior: &Interior) -> Result<(), PartError> {
        Ok(self.store.write_interior(interior)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldpart_common::{BlockCoord, BlockTypeId};
    use worldpart_stream::FlatTerrain;

    fn store(path: &std::path::Path) -> Arc<PartStore> {
        Arc::new(PartStore::open(path, 4).unwrap())
    }

    #[test]
    fn missing_chunk_is_generated_then_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let chunks = StoredChunks::new(store(tmp.path()), FlatTerrain { fill: BlockTypeId(1) });
        let key = ChunkKey::new(2, -2);

        let chunk = chunks.load(&key).unwrap();
        assert_eq!(chunk.block_type(BlockCoord::new(8, -8)), BlockTypeId(1));
        assert!(!chunks.store().has_chunk(key));

        let mut edited = Chunk::new(key, 4, BlockTypeId(2));
        edited.add_world_link(worldpart_stream::WorldLink {
            from_block: BlockCoord::new(8, -8),
            to_block: BlockCoord::new(0, 0),
            to_interior: None,
        });
        chunks.save(&key, &edited).unwrap();
        let reloaded = chunks.load(&key).unwrap();
        assert_eq!(reloaded.block_type(BlockCoord::new(9, -7)), BlockTypeId(2));
        assert!(reloaded.world_link_at(BlockCoord::new(8, -8)).is_some());
    }

    #[test]
    fn missing_interior_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let interiors = StoredInteriors::new(store(tmp.path()));
        assert!(matches!(
            interiors.load(&InteriorId::new("crypt")),
            Err(PartError::NotFound(_))
        ));

        let crypt = Interior::new(InteriorId::new("crypt"), 5, 5, BlockTypeId(1));
        interiors.save(crypt.id(), &crypt).unwrap();
        assert_eq!(interiors.load(&InteriorId::new("crypt")).unwrap().dimensions(), (5, 5));
    }
}

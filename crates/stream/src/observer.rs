use serde::{Deserialize, Serialize};
use worldpart_common::{ChunkKey, GridMetrics, InteriorId, ObjectId, WorldPosition};

/// Something that keeps the world around it resident, usually a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub id: ObjectId,
    pub position: WorldPosition,
    /// Chebyshev radius, in chunks, kept loaded around the observer.
    pub preload_radius: i32,
}

impl Observer {
    pub fn new(id: ObjectId, position: WorldPosition, preload_radius: i32) -> Self {
        Self {
            id,
            position,
            preload_radius: preload_radius.max(0),
        }
    }

    /// Chunk the observer stands in, `None` while inside an interior.
    pub fn chunk(&self, metrics: GridMetrics) -> Option<ChunkKey> {
        self.position
            .is_outside()
            .then(|| self.position.block(metrics.block_size).chunk(metrics.chunk_span))
    }

    pub fn covers_chunk(&self, key: ChunkKey, metrics: GridMetrics) -> bool {
        self.chunk(metrics)
            .is_some_and(|center| center.chunk_distance(key) <= self.preload_radius)
    }

    /// Every chunk within the preload radius, row by row.
    pub fn covered_chunks(&self, metrics: GridMetrics) -> impl Iterator<Item = ChunkKey> + '_ {
        let radius = self.preload_radius;
        self.chunk(metrics).into_iter().flat_map(move |center| {
            (-radius..=radius).flat_map(move |dy| {
                (-radius..=radius).map(move |dx| ChunkKey::new(center.x + dx, center.y + dy))
            })
        })
    }

    pub fn is_inside(&self, interior: &InteriorId) -> bool {
        self.position.interior.as_ref() == Some(interior)
    }
}

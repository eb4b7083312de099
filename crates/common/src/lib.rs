//! Shared vocabulary for the worldpart engine: coordinates, bounded regions,
//! world positions, object capabilities, terrain types and configuration.
//!
//! # Invariants
//! - Real-to-block and block-to-chunk conversion floors toward negative
//!   infinity, so addressing is continuous across the origin.
//! - `Rect` bounds are inclusive on all four edges.
//! - Positions in different spaces are infinitely far apart.

pub mod config;
pub mod coords;
pub mod geometry;
pub mod object;
pub mod terrain;
pub mod types;

pub use config::{ConfigError, GridMetrics, WorldConfig};
pub use coords::{
    BlockCoord, ChunkKey, diagonal_distance, euclidean_distance, pack_coordinates,
    unpack_coordinates, within_chunk_offset,
};
pub use geometry::{Circle, Quad, Rect, Segment, Shape};
pub use object::{
    AmbientRef, HitableObject, LivingEntity, ObjectRef, Relation, WorldObject, same_object,
};
pub use terrain::{BlockType, BlockTypeId, BlockTypeTable};
pub use types::{InteriorId, ObjectId, WorldPosition};

//! Streaming: part cache, outdoor chunk grid, interiors and world links.
//!
//! # Invariants
//! - At most one background load is in flight per key.
//! - Saves of one key land in order, and a load of a key waits for its
//!   save in flight.
//! - Resident parts are owned and mutated only by the simulation thread;
//!   background workers see nothing but their key and their own part.
//! - An object is listed in exactly the chunks its bounds touch, at most
//!   once per list.
//! - Terrain edits keep the walkability grid in sync.

mod cache;
mod chunk;
mod grid;
mod interior;
mod link;
mod list;
mod observer;
mod terrain;
mod thread;
mod walkable;
mod worker;
mod world;

pub use cache::{GcReport, PartCache, PartError, PartStorage};
pub use chunk::Chunk;
pub use grid::ChunkGrid;
pub use interior::{Interior, InteriorCatalog, InteriorManager};
pub use link::WorldLink;
pub use list::{Identified, ObjectList};
pub use observer::Observer;
pub use terrain::{FlatTerrain, GeneratedChunks, TerrainGenerator};
pub use thread::SimThread;
pub use walkable::WalkableGrid;
pub use worker::WorkerPool;
pub use world::{Placement, TickReport, World};

//! Collision queries over the streamed world.
//!
//! Every query takes the [`World`](worldpart_stream::World) it runs against
//! and must be called on the simulation thread. Parts a query touches are
//! loaded on demand.
//!
//! # Invariants
//! - The origin object is never part of a result.
//! - An object is reported at most once per query, however many chunks
//!   list it.
//! - Dead living entities are never hit.
//! - Terrain outside an interior, or in a part that cannot be loaded,
//!   blocks and stops sight.

mod blocking;
mod filter;
mod query;
mod sight;

#[cfg(test)]
mod fixtures;

pub use blocking::{BlockCheck, is_blocked, is_hitable_block_hit};
pub use filter::RelationFilter;
pub use query::{hit_test, living_hit_test, nearest_living_target};
pub use sight::is_sight_blocked;

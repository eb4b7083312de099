//! Persistence: file-backed chunk and interior storage.
//!
//! # Invariants
//! - Part files are content-verified: a body whose sha256 does not match
//!   its envelope is rejected, never half-loaded.
//! - A store only opens with the schema version and chunk span it was
//!   created with.
//! - Objects are never persisted, only terrain and world links.

mod storage;
mod store;

pub use storage::{StoredChunks, StoredInteriors};
pub use store::{PartStore, StoreError, StoreMeta};

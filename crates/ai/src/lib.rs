//! AI decision plumbing: rate competing candidate behaviors each tick, keep
//! the winner running across ticks, and wait on paths from an external
//! pathfinder.
//!
//! # Invariants
//! - The first candidate to reach the maximum score wins ties.
//! - A running behavior is only replaced when the winning identifier
//!   changes.

mod behavior;
mod path;
mod rater;

pub use behavior::{ActiveTask, Behavior, Status, Tick};
pub use path::{PathFinder, PathSender, PendingPath};
pub use rater::{RatedCandidate, TaskRater};

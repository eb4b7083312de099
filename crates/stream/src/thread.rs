use std::thread::{self, ThreadId};

/// Identity of the single simulation thread allowed to touch world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimThread {
    owner: ThreadId,
}

impl SimThread {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics when called from any other thread. This is a programming
    /// error, not a recoverable condition.
    #[track_caller]
    pub fn assert_current(&self, entry_point: &str) {
        assert!(
            self.is_current(),
            "{entry_point} called off the simulation thread"
        );
    }
}

use std::time::Duration;

use crate::rater::TaskRater;

/// One step of the simulation loop as seen by AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub number: u64,
    pub elapsed: Duration,
}

impl Tick {
    pub fn new(number: u64, elapsed: Duration) -> Self {
        Self { number, elapsed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Success,
    Failure,
}

/// A behavior-tree node.
pub trait Behavior {
    fn update(&mut self, tick: &Tick) -> Status;

    fn reset(&mut self) {}
}

impl<B: Behavior + ?Sized> Behavior for Box<B> {
    fn update(&mut self, tick: &Tick) -> Status {
        (**self).update(tick)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Holds the behavior picked by a [`TaskRater`] across ticks.
///
/// The behavior instance survives as long as the winning identifier stays
/// the same, whatever its score does. It is only updated while running.
pub struct ActiveTask<B> {
    identifier: Option<String>,
    behavior: Option<B>,
    status: Status,
}

impl<B> Default for ActiveTask<B> {
    fn default() -> Self {
        Self {
            identifier: None,
            behavior: None,
            status: Status::Failure,
        }
    }
}

impl<B: Behavior> ActiveTask<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn behavior(&self) -> Option<&B> {
        self.behavior.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Adopt this tick's winner and advance it. Returns `None` and drops the
    /// held behavior when nothing was rated.
    pub fn select(&mut self, rater: TaskRater<B>, tick: &Tick) -> Option<Status> {
        let Some(winner) = rater.into_highest_ranked() else {
            self.clear();
            return None;
        };

        if self.identifier.as_deref() != Some(winner.identifier()) || self.behavior.is_none() {
            tracing::debug!(
                from = self.identifier.as_deref().unwrap_or("-"),
                to = winner.identifier(),
                score = winner.score(),
                "active task switched"
            );
            self.identifier = Some(winner.identifier().to_owned());
            self.behavior = Some(winner.instantiate(tick));
            self.status = Status::Running;
        }

        if self.status == Status::Running {
            if let Some(behavior) = self.behavior.as_mut() {
                self.status = behavior.update(tick);
            }
        }
        Some(self.status)
    }

    pub fn clear(&mut self) {
        self.identifier = None;
        self.behavior = None;
        self.status = Status::Failure;
    }
}

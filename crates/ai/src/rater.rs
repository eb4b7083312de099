use std::fmt;

use crate::behavior::Tick;

type Factory<B> = Box<dyn FnOnce(&Tick) -> B>;

/// One scored option for the current tick.
pub struct RatedCandidate<B> {
    identifier: String,
    factory: Factory<B>,
    score: f64,
}

impl<B> RatedCandidate<B> {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Build the behavior this candidate stands for.
    pub fn instantiate(self, tick: &Tick) -> B {
        (self.factory)(tick)
    }
}

impl<B> fmt::Debug for RatedCandidate<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RatedCandidate")
            .field("identifier", &self.identifier)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

/// Keeps the best of the candidates offered during one tick.
pub struct TaskRater<B> {
    best: Option<RatedCandidate<B>>,
    offered: usize,
}

impl<B> Default for TaskRater<B> {
    fn default() -> Self {
        Self {
            best: None,
            offered: 0,
        }
    }
}

impl<B> TaskRater<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate. It only takes the lead with a strictly higher
    /// score, so earlier candidates win ties. NaN scores are ignored.
    /// Returns whether the candidate leads now.
    pub fn add_candidate(
        &mut self,
        identifier: impl Into<String>,
        factory: impl FnOnce(&Tick) -> B + 'static,
        score: f64,
    ) -> bool {
        let identifier = identifier.into();
        if score.is_nan() {
            tracing::trace!(%identifier, "candidate with NaN score ignored");
            return false;
        }
        self.offered += 1;
        if self.best.as_ref().is_some_and(|best| score <= best.score) {
            return false;
        }
        self.best = Some(RatedCandidate {
            identifier,
            factory: Box::new(factory),
            score,
        });
        true
    }

    pub fn highest_ranked(&self) -> Option<&RatedCandidate<B>> {
        self.best.as_ref()
    }

    pub fn into_highest_ranked(self) -> Option<RatedCandidate<B>> {
        self.best
    }

    /// Candidates offered so far, NaN scores excluded.
    pub fn offered(&self) -> usize {
        self.offered
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }

    pub fn clear(&mut self) {
        self.best = None;
        self.offered = 0;
    }
}

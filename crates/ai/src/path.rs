use std::sync::mpsc;
use std::task::Poll;

use worldpart_common::BlockCoord;

/// An external pathfinder. Searches run elsewhere; callers only wait on
/// the result.
pub trait PathFinder: Send + Sync {
    fn find_path(&self, start: BlockCoord, goal: BlockCoord) -> PendingPath;
}

/// Completion side of a [`PendingPath`], handed to the search.
#[derive(Debug)]
pub struct PathSender {
    tx: mpsc::SyncSender<Option<Vec<BlockCoord>>>,
}

impl PathSender {
    /// Deliver the path, or `None` when the goal is unreachable.
    pub fn complete(self, path: Option<Vec<BlockCoord>>) {
        if self.tx.send(path).is_err() {
            tracing::trace!("path completed after the request was dropped");
        }
    }
}

#[derive(Debug)]
enum PathState {
    Waiting(mpsc::Receiver<Option<Vec<BlockCoord>>>),
    Taken,
}

/// A path search in flight.
///
/// A search that goes away without completing reads as unreachable.
#[derive(Debug)]
pub struct PendingPath {
    state: PathState,
}

impl PendingPath {
    pub fn channel() -> (PathSender, PendingPath) {
        let (tx, rx) = mpsc::sync_channel(1);
        (
            PathSender { tx },
            PendingPath {
                state: PathState::Waiting(rx),
            },
        )
    }

    /// An already finished search.
    pub fn ready(path: Option<Vec<BlockCoord>>) -> Self {
        let (sender, pending) = Self::channel();
        sender.complete(path);
        pending
    }

    /// Non-blocking. Yields the result once; later polls see `Ready(None)`.
    pub fn poll(&mut self) -> Poll<Option<Vec<BlockCoord>>> {
        let PathState::Waiting(rx) = &self.state else {
            return Poll::Ready(None);
        };
        match rx.try_recv() {
            Ok(path) => {
                self.state = PathState::Taken;
                Poll::Ready(path)
            }
            Err(mpsc::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.state = PathState::Taken;
                Poll::Ready(None)
            }
        }
    }

    /// Block until the search finishes.
    pub fn wait(self) -> Option<Vec<BlockCoord>> {
        match self.state {
            PathState::Waiting(rx) => rx.recv().ok().flatten(),
            PathState::Taken => None,
        }
    }
}

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};

use crate::cache::PartError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of background threads for part load and save jobs.
///
/// Jobs are fire-and-forget; they report back through channels they
/// capture. Dropping the pool finishes every queued job and joins the threads.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, PartError> {
        if size == 0 {
            return Err(PartError::Worker("worker pool needs at least one thread".into()));
        }
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("worldpart-io-{index}"))
                .spawn(move || worker_loop(index, &receiver))
                .map_err(|err| {
                    PartError::Worker(format!("failed to spawn io worker {index}: {err}"))
                })?;
            workers.push(handle);
        }

        tracing::debug!(size, "worker pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F>(&self, job: F) -> Result<(), PartError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| PartError::Worker("worker pool is shut down".into()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| PartError::Worker("worker pool channel closed".into()))
    }
}

fn worker_loop(index: usize, receiver: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        let next = match receiver.lock() {
            Ok(rx) => rx.recv(),
            Err(poisoned) => poisoned.into_inner().recv(),
        };
        let Ok(job) = next else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(worker = index, "background job panicked");
        }
    }
    tracing::trace!(worker = index, "io worker exiting");
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if let Err(err) = handle.join() {
                tracing::error!("io worker thread panicked: {err:?}");
            }
        }
    }
}

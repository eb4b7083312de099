//! Generic key to part streaming cache.
//!
//! Parts live in a plain map owned by the simulation thread. Loads and
//! saves run on a [`WorkerPool`]; each job owns its key (and, for saves, the
//! evicted part) and reports back over the cache's result channel, which the
//! simulation thread drains in `poll`, `tick` and blocking `get` calls.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crate::thread::SimThread;
use crate::worker::WorkerPool;

/// Errors surfaced by part storage and the background workers.
#[derive(Debug, thiserror::Error)]
pub enum PartError {
    #[error("part {0} not found in storage")]
    NotFound(String),
    #[error("part {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("part {0} is unavailable")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("worker error: {0}")]
    Worker(String),
    #[error("background job for {0} panicked")]
    Panicked(String),
    #[error("invalid world configuration: {0}")]
    Config(#[from] worldpart_common::ConfigError),
}

impl PartError {
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Load and save hooks, run off the simulation thread.
pub trait PartStorage<K, P>: Send + Sync + 'static {
    fn load(&self, key: &K) -> Result<P, PartError>;

    fn save(&self, key: &K, part: &P) -> Result<(), PartError>;
}

type PersistPredicate<K, P> = Box<dyn Fn(&K, &P) -> bool + Send>;
type UnloadHook<K, P> = Box<dyn FnMut(&K, &P) + Send>;

/// Outcome of one garbage-collect sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    pub evicted: usize,
    pub remaining: usize,
    pub elapsed: Duration,
}

enum JobResult<K, P> {
    Loaded {
        key: K,
        result: Result<P, PartError>,
    },
    Saved {
        key: K,
        result: Result<(), PartError>,
    },
}

/// Where a key's background load stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    /// A worker owns the load.
    Running,
    /// Queued until the key's save in flight lands.
    AfterSave,
    /// A worker owns a load that predates a save of newer data; its result
    /// is dropped, and `reload` queues a fresh load once it lands.
    Stale { reload: bool },
    /// Load failed; stays until `forget_failure`.
    Failed,
}

/// Streaming cache with at most one in-flight load per key.
///
/// Saves of one key run one at a time, and a load of a key whose save is
/// in flight waits for that save, so a reload always sees the latest
/// evicted copy.
pub struct PartCache<K, P> {
    name: &'static str,
    storage: Arc<dyn PartStorage<K, P>>,
    workers: Arc<WorkerPool>,
    should_persist: PersistPredicate<K, P>,
    on_unload: UnloadHook<K, P>,
    resident: HashMap<K, P>,
    pending: HashMap<K, LoadState>,
    /// Keys with a save in flight, each with the newest part evicted since.
    saving: HashMap<K, Option<P>>,
    results_tx: mpsc::Sender<JobResult<K, P>>,
    results_rx: mpsc::Receiver<JobResult<K, P>>,
    gc_interval: Duration,
    since_gc: Duration,
    sim: SimThread,
}

impl<K, P> PartCache<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    P: Send + 'static,
{
    /// Create a cache bound to the calling thread. Every part is persisted
    /// on eviction until [`PartCache::with_persist_predicate`] says otherwise.
    pub fn new(
        name: &'static str,
        storage: Arc<dyn PartStorage<K, P>>,
        workers: Arc<WorkerPool>,
        gc_interval: Duration,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            name,
            storage,
            workers,
            should_persist: Box::new(|_, _| true),
            on_unload: Box::new(|_, _| {}),
            resident: HashMap::new(),
            pending: HashMap::new(),
            saving: HashMap::new(),
            results_tx,
            results_rx,
            gc_interval,
            since_gc: Duration::ZERO,
            sim: SimThread::current(),
        }
    }

    pub fn with_persist_predicate(
        mut self,
        predicate: impl Fn(&K, &P) -> bool + Send + 'static,
    ) -> Self {
        self.should_persist = Box::new(predicate);
        self
    }

    pub fn with_unload_hook(mut self, hook: impl FnMut(&K, &P) + Send + 'static) -> Self {
        self.on_unload = Box::new(hook);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Re-bind the cache to the calling thread, e.g. after handing the world
    /// to a dedicated simulation thread.
    pub fn bind_to_current_thread(&mut self) {
        self.sim = SimThread::current();
    }

    /// Resident part for `key`. When absent and `load_if_absent` is set,
    /// starts or joins the single in-flight load and blocks until it lands.
    pub fn get(&mut self, key: &K, load_if_absent: bool) -> Option<&P> {
        self.sim.assert_current("PartCache::get");
        if load_if_absent {
            self.ensure_loaded(key);
        }
        self.resident.get(key)
    }

    pub fn get_mut(&mut self, key: &K, load_if_absent: bool) -> Option<&mut P> {
        self.sim.assert_current("PartCache::get_mut");
        if load_if_absent {
            self.ensure_loaded(key);
        }
        self.resident.get_mut(key)
    }

    /// Resident part without loading or draining results.
    pub fn peek(&self, key: &K) -> Option<&P> {
        self.resident.get(key)
    }

    /// Queue a background load unless one is pending or the part is
    /// resident. Returns whether a load was queued.
    pub fn load_async(&mut self, key: K) -> bool {
        self.sim.assert_current("PartCache::load_async");
        self.request_load(key)
    }

    /// Publish a part built on the simulation thread.
    pub fn insert(&mut self, key: K, part: P) -> Option<P> {
        self.sim.assert_current("PartCache::insert");
        if matches!(
            self.pending.get(&key),
            Some(LoadState::AfterSave | LoadState::Failed)
        ) {
            self.pending.remove(&key);
        }
        self.resident.insert(key, part)
    }

    pub fn is_loaded(&self, key: &K) -> bool {
        self.resident.contains_key(key)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn has_failed(&self, key: &K) -> bool {
        self.pending.get(key) == Some(&LoadState::Failed)
    }

    /// Clear a recorded load failure so the key may be requested again.
    /// Loads still owned by a worker are left alone.
    pub fn forget_failure(&mut self, key: &K) -> bool {
        self.sim.assert_current("PartCache::forget_failure");
        if !self.has_failed(key) {
            return false;
        }
        self.pending.remove(key);
        true
    }

    pub fn count_loaded(&self) -> usize {
        self.resident.len()
    }

    pub fn keys(&self) -> HashSet<K> {
        self.resident.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &P)> {
        self.resident.iter()
    }

    /// Evict `key`, run the unload hook and schedule an async save if the
    /// persistence predicate approves.
    pub fn unload(&mut self, key: &K) -> bool {
        self.sim.assert_current("PartCache::unload");
        let Some(part) = self.evict(key) else {
            return false;
        };
        if (self.should_persist)(key, &part) {
            if self.pending.get(key) == Some(&LoadState::Running) {
                self.pending.insert(key.clone(), LoadState::Stale { reload: false });
            }
            self.save_async(key.clone(), part);
        }
        true
    }

    /// Evict `key` without persisting it. A load already running for it
    /// still publishes its result.
    pub fn remove(&mut self, key: &K) -> bool {
        self.sim.assert_current("PartCache::remove");
        self.evict(key).is_some()
    }

    /// Wait for saves in flight, then persist every resident part the
    /// predicate approves, synchronously. Returns the number of parts written.
    pub fn save_all(&mut self) -> usize {
        self.sim.assert_current("PartCache::save_all");
        self.flush();
        let mut saved = 0;
        for (key, part) in &self.resident {
            if !(self.should_persist)(key, part) {
                continue;
            }
            match self.storage.save(key, part) {
                Ok(()) => saved += 1,
                Err(err) => {
                    tracing::error!(cache = self.name, ?key, %err, "failed to save part");
                }
            }
        }
        tracing::info!(cache = self.name, saved, "saved all resident parts");
        saved
    }

    /// Apply every finished background job without blocking.
    pub fn poll(&mut self) -> usize {
        self.sim.assert_current("PartCache::poll");
        let mut applied = 0;
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply(result);
            applied += 1;
        }
        applied
    }

    /// Block until every scheduled save has reported back.
    pub fn flush(&mut self) {
        self.sim.assert_current("PartCache::flush");
        while !self.saving.is_empty() {
            match self.results_rx.recv() {
                Ok(result) => self.apply(result),
                Err(_) => break,
            }
        }
    }

    /// Advance the garbage-collect clock; once past the interval, evict
    /// every resident part `should_evict` approves.
    pub fn tick(
        &mut self,
        elapsed: Duration,
        should_evict: impl FnMut(&K, &P) -> bool,
    ) -> Option<GcReport> {
        self.sim.assert_current("PartCache::tick");
        self.poll();

        self.since_gc += elapsed;
        if self.since_gc <= self.gc_interval {
            return None;
        }
        self.since_gc = Duration::ZERO;
        Some(self.garbage_collect(should_evict))
    }

    fn garbage_collect(&mut self, mut should_evict: impl FnMut(&K, &P) -> bool) -> GcReport {
        let _span = tracing::info_span!("part_gc", cache = self.name).entered();
        let started = Instant::now();

        let doomed: Vec<K> = self
            .resident
            .iter()
            .filter(|(key, part)| should_evict(*key, *part))
            .map(|(key, _)| key.clone())
            .collect();
        let evicted = doomed.iter().filter(|key| self.unload(*key)).count();

        let report = GcReport {
            evicted,
            remaining: self.resident.len(),
            elapsed: started.elapsed(),
        };
        if evicted > 0 {
            tracing::info!(
                evicted,
                remaining = report.remaining,
                elapsed = ?report.elapsed,
                "garbage collector unloaded parts"
            );
        }
        report
    }

    fn evict(&mut self, key: &K) -> Option<P> {
        let part = self.resident.remove(key)?;
        (self.on_unload)(key, &part);
        tracing::debug!(cache = self.name, ?key, "part unloaded");
        Some(part)
    }

    fn ensure_loaded(&mut self, key: &K) {
        if self.resident.contains_key(key) {
            return;
        }
        self.poll();
        if self.resident.contains_key(key) || self.has_failed(key) {
            return;
        }
        self.request_load(key.clone());
        while !self.resident.contains_key(key)
            && !self.has_failed(key)
            && self.pending.contains_key(key)
        {
            match self.results_rx.recv() {
                Ok(result) => self.apply(result),
                Err(_) => return,
            }
        }
    }

    fn request_load(&mut self, key: K) -> bool {
        if self.resident.contains_key(&key) {
            return false;
        }
        match self.pending.get(&key).copied() {
            None if self.saving.contains_key(&key) => {
                tracing::debug!(cache = self.name, ?key, "part load waits for its save");
                self.pending.insert(key, LoadState::AfterSave);
                true
            }
            None => self.spawn_load(key),
            Some(LoadState::Stale { reload }) => {
                self.pending.insert(key, LoadState::Stale { reload: true });
                !reload
            }
            Some(_) => false,
        }
    }

    fn spawn_load(&mut self, key: K) -> bool {
        let storage = Arc::clone(&self.storage);
        let tx = self.results_tx.clone();
        let job_key = key.clone();
        let submitted = self.workers.execute(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| storage.load(&job_key)))
                .unwrap_or_else(|_| Err(PartError::Panicked(format!("{job_key:?}"))));
            let _ = tx.send(JobResult::Loaded {
                key: job_key,
                result,
            });
        });

        match submitted {
            Ok(()) => {
                tracing::debug!(cache = self.name, ?key, "part load scheduled");
                self.pending.insert(key, LoadState::Running);
                true
            }
            Err(err) => {
                tracing::error!(cache = self.name, ?key, %err, "could not schedule part load");
                self.pending.insert(key, LoadState::Failed);
                false
            }
        }
    }

    fn save_async(&mut self, key: K, part: P) {
        if let Some(queued) = self.saving.get_mut(&key) {
            tracing::debug!(cache = self.name, ?key, "part save queued behind the one in flight");
            *queued = Some(part);
            return;
        }
        self.spawn_save(key, part);
    }

    fn spawn_save(&mut self, key: K, part: P) -> bool {
        let storage = Arc::clone(&self.storage);
        let tx = self.results_tx.clone();
        let job_key = key.clone();
        let submitted = self.workers.execute(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| storage.save(&job_key, &part)))
                .unwrap_or_else(|_| Err(PartError::Panicked(format!("{job_key:?}"))));
            let _ = tx.send(JobResult::Saved {
                key: job_key,
                result,
            });
        });

        match submitted {
            Ok(()) => {
                self.saving.insert(key, None);
                true
            }
            Err(err) => {
                tracing::error!(cache = self.name, ?key, %err, "could not schedule part save");
                false
            }
        }
    }

    fn apply(&mut self, result: JobResult<K, P>) {
        match result {
            JobResult::Loaded { key, result } => {
                if let Some(LoadState::Stale { reload }) = self.pending.remove(&key) {
                    tracing::debug!(cache = self.name, ?key, "stale load discarded");
                    if reload {
                        self.request_load(key);
                    }
                    return;
                }
                match result {
                    Ok(_) if self.resident.contains_key(&key) => {
                        tracing::warn!(cache = self.name, ?key, "late load discarded, part already resident");
                    }
                    Ok(part) => {
                        tracing::debug!(cache = self.name, ?key, "part loaded");
                        self.resident.insert(key, part);
                    }
                    Err(err) => {
                        tracing::error!(cache = self.name, ?key, %err, "part load failed");
                        if !self.resident.contains_key(&key) {
                            self.pending.insert(key, LoadState::Failed);
                        }
                    }
                }
            }
            JobResult::Saved { key, result } => {
                match result {
                    Ok(()) => tracing::trace!(cache = self.name, ?key, "part saved"),
                    Err(err) => {
                        tracing::error!(cache = self.name, ?key, %err, "part save failed")
                    }
                }
                let next_save = match self.saving.remove(&key).flatten() {
                    Some(part) => self.spawn_save(key.clone(), part),
                    None => false,
                };
                if !next_save && self.pending.get(&key) == Some(&LoadState::AfterSave) {
                    self.spawn_load(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct CountingStorage {
        loads: AtomicUsize,
        saves: Mutex<Vec<(u32, String)>>,
        load_delay: Duration,
    }

    impl PartStorage<u32, String> for CountingStorage {
        fn load(&self, key: &u32) -> Result<String, PartError> {
            thread::sleep(self.load_delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            if *key == 404 {
                return Err(PartError::NotFound(key.to_string()));
            }
            Ok(format!("part-{key}"))
        }

        fn save(&self, key: &u32, part: &String) -> Result<(), PartError> {
            self.saves.lock().unwrap().push((*key, part.clone()));
            Ok(())
        }
    }

    /// Remembers the last saved copy of each part; unsaved parts load as
    /// "fresh". Both hooks sleep for `delay`.
    #[derive(Default)]
    struct MemoryStorage {
        parts: Mutex<HashMap<u32, String>>,
        saved: Mutex<Vec<String>>,
        loads: AtomicUsize,
        delay: Duration,
    }

    impl PartStorage<u32, String> for MemoryStorage {
        fn load(&self, key: &u32) -> Result<String, PartError> {
            thread::sleep(self.delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            let parts = self.parts.lock().unwrap();
            Ok(parts.get(key).cloned().unwrap_or_else(|| "fresh".to_string()))
        }

        fn save(&self, key: &u32, part: &String) -> Result<(), PartError> {
            thread::sleep(self.delay);
            self.parts.lock().unwrap().insert(*key, part.clone());
            self.saved.lock().unwrap().push(part.clone());
            Ok(())
        }
    }

    fn memory_storage(delay_ms: u64) -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage {
            delay: Duration::from_millis(delay_ms),
            ..MemoryStorage::default()
        })
    }

    fn cache_with<S: PartStorage<u32, String>>(storage: &Arc<S>) -> PartCache<u32, String> {
        let workers = Arc::new(WorkerPool::new(2).unwrap());
        let storage: Arc<dyn PartStorage<u32, String>> = storage.clone();
        PartCache::new("test", storage, workers, Duration::from_millis(100))
    }

    fn poll_until(
        cache: &mut PartCache<u32, String>,
        done: impl Fn(&PartCache<u32, String>) -> bool,
    ) {
        for _ in 0..200 {
            cache.poll();
            if done(cache) {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("background job did not finish in time");
    }

    fn slow_storage() -> Arc<CountingStorage> {
        Arc::new(CountingStorage {
            load_delay: Duration::from_millis(20),
            ..CountingStorage::default()
        })
    }

    #[test]
    fn duplicate_load_async_runs_one_load() {
        let storage = slow_storage();
        let mut cache = cache_with(&storage);

        assert!(cache.load_async(7));
        assert!(!cache.load_async(7));
        assert!(cache.is_pending(&7));

        assert_eq!(cache.get(&7, true).map(String::as_str), Some("part-7"));
        assert_eq!(storage.loads.load(Ordering::SeqCst), 1);
        assert!(!cache.load_async(7));
    }

    #[test]
    fn get_joins_pending_load() {
        let storage = slow_storage();
        let mut cache = cache_with(&storage);
        cache.load_async(1);
        cache.load_async(2);
        assert!(cache.get(&2, true).is_some());
        assert!(cache.get(&1, true).is_some());
        assert_eq!(storage.loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.count_loaded(), 2);
        assert_eq!(cache.keys(), HashSet::from([1, 2]));
    }

    #[test]
    fn get_without_load_on_absent_key_is_none() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage);
        assert!(cache.get(&3, false).is_none());
        assert_eq!(storage.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unload_saves_once_when_persisted() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage);
        cache.get(&5, true);

        assert!(cache.unload(&5));
        assert!(!cache.is_loaded(&5));
        assert!(!cache.unload(&5));
        cache.flush();

        let saves = storage.saves.lock().unwrap();
        assert_eq!(saves.as_slice(), &[(5, "part-5".to_string())]);
    }

    #[test]
    fn unload_skips_save_when_predicate_refuses() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage).with_persist_predicate(|key, _| *key != 9);
        cache.get(&9, true);
        assert!(cache.unload(&9));
        cache.flush();
        assert!(storage.saves.lock().unwrap().is_empty());
    }

    #[test]
    fn remove_never_persists_but_runs_hook() {
        let storage = Arc::new(CountingStorage::default());
        let unloaded = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&unloaded);
        let mut cache = cache_with(&storage).with_unload_hook(move |_, _| {
            hook_count.fetch_add(1, Ordering::SeqCst);
        });
        cache.get(&4, true);
        assert!(cache.remove(&4));
        assert!(!cache.remove(&4));
        cache.flush();
        assert!(storage.saves.lock().unwrap().is_empty());
        assert_eq!(unloaded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_stays_absent_and_pending() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage);
        assert!(cache.get(&404, true).is_none());
        assert!(cache.has_failed(&404));
        assert!(!cache.load_async(404));
        // No retry on a second blocking get.
        assert!(cache.get(&404, true).is_none());
        assert_eq!(storage.loads.load(Ordering::SeqCst), 1);

        assert!(cache.forget_failure(&404));
        assert!(cache.load_async(404));
    }

    #[test]
    fn tick_collects_only_after_interval() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage);
        for key in 0..4 {
            cache.get(&key, true);
        }

        assert!(cache.tick(Duration::from_millis(60), |_, _| true).is_none());
        let report = cache
            .tick(Duration::from_millis(60), |key, _| key % 2 == 0)
            .expect("interval crossed");
        assert_eq!(report.evicted, 2);
        assert_eq!(report.remaining, 2);
        assert_eq!(cache.keys(), HashSet::from([1, 3]));

        // Clock restarts after a sweep.
        assert!(cache.tick(Duration::from_millis(60), |_, _| true).is_none());
        cache.flush();
        assert_eq!(storage.saves.lock().unwrap().len(), 2);
    }

    #[test]
    fn late_load_after_remove_is_published_once() {
        let storage = slow_storage();
        let mut cache = cache_with(&storage);
        assert!(cache.load_async(11));
        cache.insert(11, "local".to_string());
        assert!(cache.remove(&11));

        // The worker still owns the first load, so no second one starts.
        assert!(cache.is_pending(&11));
        assert!(!cache.load_async(11));

        poll_until(&mut cache, |c| c.is_loaded(&11));
        assert_eq!(cache.get(&11, false).map(String::as_str), Some("part-11"));
        assert_eq!(storage.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reload_after_unload_sees_the_saved_edit() {
        let storage = memory_storage(100);
        let mut cache = cache_with(&storage);
        *cache.get_mut(&1, true).unwrap() = "edited".to_string();

        assert!(cache.unload(&1));
        assert_eq!(cache.get(&1, true).map(String::as_str), Some("edited"));
        assert_eq!(storage.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn load_started_before_a_save_is_replaced() {
        let storage = memory_storage(30);
        let mut cache = cache_with(&storage);
        assert!(cache.load_async(2));
        cache.insert(2, "edited".to_string());
        assert!(cache.unload(&2));

        // The running load may have read the old copy; it is dropped and
        // a fresh one follows the save.
        assert!(cache.load_async(2));
        assert!(!cache.load_async(2));
        assert_eq!(cache.get(&2, true).map(String::as_str), Some("edited"));
        assert_eq!(storage.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn saves_of_one_key_land_in_order() {
        let storage = memory_storage(50);
        let mut cache = cache_with(&storage);
        for edit in ["a", "b", "c"] {
            cache.insert(3, edit.to_string());
            assert!(cache.unload(&3));
        }
        cache.flush();

        // "b" was superseded while "a" was still being written.
        assert_eq!(*storage.saved.lock().unwrap(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(cache.get(&3, true).map(String::as_str), Some("c"));
    }

    #[test]
    fn save_all_waits_for_eviction_saves() {
        let storage = memory_storage(50);
        let mut cache = cache_with(&storage);
        cache.insert(4, "old".to_string());
        assert!(cache.unload(&4));
        cache.insert(4, "new".to_string());

        assert_eq!(cache.save_all(), 1);
        assert_eq!(*storage.saved.lock().unwrap(), vec!["old".to_string(), "new".to_string()]);
    }

    #[test]
    fn late_load_for_resident_key_is_dropped() {
        let storage = slow_storage();
        let mut cache = cache_with(&storage);
        assert!(cache.load_async(12));
        cache.insert(12, "local".to_string());

        poll_until(&mut cache, |c| storage.loads.load(Ordering::SeqCst) == 1 && !c.is_pending(&12));
        assert_eq!(cache.get(&12, false).map(String::as_str), Some("local"));
    }

    #[test]
    fn save_all_respects_predicate() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage).with_persist_predicate(|key, _| *key < 2);
        for key in 0..3 {
            cache.get(&key, true);
        }
        assert_eq!(cache.save_all(), 2);
        assert_eq!(storage.saves.lock().unwrap().len(), 2);
        assert_eq!(cache.count_loaded(), 3);
    }

    #[test]
    fn calls_from_another_thread_panic() {
        let storage = Arc::new(CountingStorage::default());
        let mut cache = cache_with(&storage);
        cache.get(&1, true);
        let result = thread::spawn(move || {
            cache.unload(&1);
        })
        .join();
        assert!(result.is_err());
    }

    #[test]
    fn poll_and_save_all_from_another_thread_panic() {
        let storage = Arc::new(CountingStorage::default());
        let cache = cache_with(&storage);
        let cache = Arc::new(Mutex::new(cache));

        let polling = Arc::clone(&cache);
        let result = thread::spawn(move || {
            polling.lock().unwrap().poll();
        })
        .join();
        assert!(result.is_err());

        let saving = Arc::clone(&cache);
        let result = thread::spawn(move || {
            saving.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).save_all();
        })
        .join();
        assert!(result.is_err());
    }
}

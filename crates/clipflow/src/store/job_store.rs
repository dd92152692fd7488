//! In-memory job registry with write-through persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EngineError, Result};
use crate::job::{FailureKind, Job, JobFailure, JobId, JobStatus};

use super::persistence::{PersistenceAdapter, JOBS_KEY};

// ─── Lock helpers ───────────────────────────────────────────────────────────

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job store lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job store lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job entry lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Jobs by id plus their display order (newest first).
#[derive(Default)]
struct Registry {
    entries: HashMap<JobId, Arc<Mutex<Job>>>,
    order: Vec<JobId>,
}

impl Registry {
    fn entry(&self, job_id: &str) -> Option<Arc<Mutex<Job>>> {
        self.entries.get(job_id).cloned()
    }

    fn snapshots(&self) -> Vec<Job> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| lock(entry).clone())
            .collect()
    }
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Authoritative collection of jobs.
///
/// The registry lock only guards the map and ordering; each job sits behind
/// its own mutex so updates to different jobs proceed independently while
/// updates to one job are serialized. Every successful mutation writes the
/// whole collection through the [`PersistenceAdapter`].
pub struct JobStore {
    registry: RwLock<Registry>,
    selected: RwLock<Option<JobId>>,
    persistence: Arc<PersistenceAdapter>,
    /// Serializes persistence writes so the newest collection lands last.
    persist_lock: Mutex<()>,
}

impl JobStore {
    /// Creates an empty store.
    pub fn new(persistence: Arc<PersistenceAdapter>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            selected: RwLock::new(None),
            persistence,
            persist_lock: Mutex::new(()),
        }
    }

    /// Restores the job collection persisted under the `jobs` key.
    ///
    /// Records that fail to decode are dropped individually. Jobs persisted
    /// while `running` belonged to a process that is gone; they are marked
    /// failed with [`FailureKind::Interrupted`].
    pub fn load(persistence: Arc<PersistenceAdapter>) -> Self {
        let raw: Vec<serde_json::Value> = persistence.load(JOBS_KEY);
        let store = Self::new(persistence);

        let mut interrupted = 0;
        {
            let mut registry = write(&store.registry);
            for value in raw {
                let mut job: Job = match serde_json::from_value(value) {
                    Ok(job) => job,
                    Err(e) => {
                        log::warn!("Skipping unreadable persisted job: {}", e);
                        continue;
                    }
                };
                if registry.entries.contains_key(&job.id) {
                    log::warn!("Skipping duplicate persisted job {}", job.id);
                    continue;
                }
                if job.status == JobStatus::Running {
                    let stage = job.current_stage().map(|(_, s)| s.name.clone());
                    job.fail(JobFailure {
                        kind: FailureKind::Interrupted,
                        message: "process exited while the job was running".to_string(),
                        stage,
                    });
                    interrupted += 1;
                }
                registry.order.push(job.id.clone());
                registry
                    .entries
                    .insert(job.id.clone(), Arc::new(Mutex::new(job)));
            }
            log::info!("Loaded {} jobs from storage", registry.order.len());
        }

        if interrupted > 0 {
            log::warn!("Marked {} interrupted jobs as failed", interrupted);
            store.persist();
        }

        store
    }

    /// Registers a new job at the front of the listing.
    pub fn insert(&self, job: Job) -> Result<()> {
        {
            let mut registry = write(&self.registry);
            if registry.entries.contains_key(&job.id) {
                return Err(EngineError::InvalidInput(format!(
                    "duplicate job id {}",
                    job.id
                )));
            }
            registry.order.insert(0, job.id.clone());
            registry
                .entries
                .insert(job.id.clone(), Arc::new(Mutex::new(job)));
        }
        self.persist();
        Ok(())
    }

    /// Returns a snapshot of one job.
    pub fn get(&self, job_id: &str) -> Result<Job> {
        let entry = read(&self.registry)
            .entry(job_id)
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))?;
        let job = lock(&entry).clone();
        Ok(job)
    }

    /// Atomically applies `mutator` to one job and returns the new snapshot.
    ///
    /// If the mutator fails, the job is restored to its prior state and
    /// nothing is persisted.
    pub fn update<F>(&self, job_id: &str, mutator: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let entry = read(&self.registry)
            .entry(job_id)
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))?;

        let snapshot = {
            let mut job = lock(&entry);
            let before = job.clone();
            if let Err(e) = mutator(&mut job) {
                *job = before;
                return Err(e);
            }
            job.clone()
        };

        self.persist();
        Ok(snapshot)
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        read(&self.registry).snapshots()
    }

    /// The explicitly selected job, falling back to the newest job.
    pub fn selected(&self) -> Option<Job> {
        let registry = read(&self.registry);
        let selected = read(&self.selected).clone();
        selected
            .and_then(|id| registry.entry(&id))
            .or_else(|| registry.order.first().and_then(|id| registry.entry(id)))
            .map(|entry| lock(&entry).clone())
    }

    /// Marks a job as the selected one.
    pub fn select(&self, job_id: &str) -> Result<()> {
        if !read(&self.registry).entries.contains_key(job_id) {
            return Err(EngineError::NotFound(job_id.to_string()));
        }
        *write(&self.selected) = Some(job_id.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        read(&self.registry).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the full collection. Failures are logged; the in-memory state
    /// stays authoritative.
    fn persist(&self) {
        let _guard = lock(&self.persist_lock);
        let jobs = self.list();
        if let Err(e) = self.persistence.save(JOBS_KEY, &jobs) {
            log::error!("Failed to persist job collection: {}", e);
        }
    }
}

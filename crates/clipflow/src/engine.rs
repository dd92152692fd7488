//! Engine facade owning the stores, the scheduler and the event channel.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::config::{validate_config, EngineConfig};
use crate::db::{Database, KeyValueStore, MemoryStore};
use crate::error::Result;
use crate::job::{Job, JobFactory, JobId};
use crate::scheduler::{
    OutputSynthesizer, PlaceholderOutputs, RunHandle, SchedulerOptions, SimulatedExecutor,
    StageExecutor, StageScheduler,
};
use crate::store::{JobStore, PersistenceAdapter, Settings, SettingsStore};

/// Entry point for submitting and observing jobs.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Engine {
    factory: Arc<JobFactory>,
    jobs: Arc<JobStore>,
    settings: Arc<SettingsStore>,
    scheduler: StageScheduler,
    events: JobEventBroadcaster,
}

impl Engine {
    /// Opens the SQLite database named by the config and restores state.
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let database = Database::open(&config.resolved_database_path())?;
        Self::with_backend(config, Arc::new(database))
    }

    /// Engine whose state lives only in memory.
    pub fn in_memory(config: &EngineConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(MemoryStore::new()))
    }

    /// Engine over any key-value backend, using the simulated executor.
    pub fn with_backend(config: &EngineConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let executor = SimulatedExecutor::new(config.tick_units, config.time_unit());
        Self::with_parts(
            config,
            backend,
            Arc::new(executor),
            Arc::new(PlaceholderOutputs),
        )
    }

    pub fn with_parts(
        config: &EngineConfig,
        backend: Arc<dyn KeyValueStore>,
        executor: Arc<dyn StageExecutor>,
        outputs: Arc<dyn OutputSynthesizer>,
    ) -> Result<Self> {
        validate_config(config)?;

        let persistence = Arc::new(PersistenceAdapter::new(backend));
        let jobs = Arc::new(JobStore::load(Arc::clone(&persistence)));
        let settings = Arc::new(SettingsStore::load(persistence));
        let events = JobEventBroadcaster::new(config.event_capacity);
        let scheduler = StageScheduler::new(
            Arc::clone(&jobs),
            Arc::clone(&settings),
            executor,
            outputs,
            events.clone(),
            SchedulerOptions {
                run_timeout: config.run_timeout(),
                failure_policies: config.failure_policies.clone(),
            },
        );

        log::info!("Engine ready with {} stored jobs", jobs.len());

        Ok(Self {
            factory: Arc::new(JobFactory::new()),
            jobs,
            settings,
            scheduler,
            events,
        })
    }

    /// Creates and registers an idle job for `prompt`.
    pub fn submit_prompt(&self, prompt: &str) -> Result<JobId> {
        let job = self.factory.create(prompt)?;
        let id = job.id.clone();
        self.jobs.insert(job.clone())?;
        self.events.send(JobEvent::Updated(job));
        log::info!("Submitted job {}", id);
        Ok(id)
    }

    /// Creates, registers, selects and starts a job in one step.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit_and_run(&self, prompt: &str, dry_run: bool) -> Result<RunHandle> {
        let id = self.submit_prompt(prompt)?;
        self.jobs.select(&id)?;
        self.scheduler.start(&id, dry_run)
    }

    /// Starts an existing idle job.
    pub fn start(&self, job_id: &str, dry_run: bool) -> Result<RunHandle> {
        self.scheduler.start(job_id, dry_run)
    }

    pub fn cancel(&self, job_id: &str) -> Result<()> {
        self.scheduler.cancel(job_id)
    }

    /// Cancels all active runs, e.g. on shutdown.
    pub fn cancel_all(&self) {
        self.scheduler.cancel_all();
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job> {
        self.jobs.get(job_id)
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.jobs.list()
    }

    pub fn selected_job(&self) -> Option<Job> {
        self.jobs.selected()
    }

    pub fn select_job(&self, job_id: &str) -> Result<()> {
        self.jobs.select(job_id)
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.scheduler.is_running(job_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn update_settings<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        self.settings.update(f)
    }
}

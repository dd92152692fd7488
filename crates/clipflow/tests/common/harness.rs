//! Test harness for isolated engine instances.
//!
//! Each `TestHarness` owns a temporary directory holding the SQLite file, so
//! engines can be dropped and reopened against the same state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::sync::broadcast;

use clipflow::{Database, Engine, EngineConfig, JobEvent, KeyValueStore, RunOutcome};

/// Test harness providing an isolated database for integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Path of the SQLite file inside `temp_dir`.
    pub database_path: PathBuf,
    /// Config used when opening engines.
    pub config: EngineConfig,
}

impl TestHarness {
    /// Harness with default engine settings.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Harness with a custom config; the database path is always redirected
    /// into the temp directory.
    pub fn with_config(mut config: EngineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let database_path = temp_dir.path().join("data").join("clipflow.db");
        config.database_path = Some(database_path.clone());

        Self {
            temp_dir,
            database_path,
            config,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens an engine on the harness database.
    pub fn engine(&self) -> Engine {
        Engine::open(&self.config).expect("Failed to open engine")
    }

    /// Direct handle on the database for seeding or inspecting raw values.
    pub fn database(&self) -> Database {
        Database::open(&self.database_path).expect("Failed to open database")
    }

    /// Writes a raw value under `key`, bypassing the engine.
    pub fn seed_raw(&self, key: &str, value: &str) {
        self.database()
            .put(key, value)
            .expect("Failed to seed raw value");
    }

    /// Reads the raw value under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.database().get(key).expect("Failed to read raw value")
    }
}

/// Receives events until the run of `job_id` finishes. Returns every
/// snapshot seen for that job along with the outcome.
pub async fn collect_until_finished(
    rx: &mut broadcast::Receiver<JobEvent>,
    job_id: &str,
) -> (Vec<clipflow::Job>, RunOutcome) {
    let mut snapshots = Vec::new();
    loop {
        match rx.recv().await.expect("event stream closed") {
            event if event.job_id() != job_id => {}
            JobEvent::Updated(job) => snapshots.push(job),
            JobEvent::Finished(outcome) => return (snapshots, outcome),
        }
    }
}

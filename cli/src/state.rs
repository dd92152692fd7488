//! Application state for the command-line front end.

use std::path::PathBuf;

use anyhow::Context;
use clipflow::{Engine, EngineConfig};

/// Everything a command needs, built once at startup.
pub struct AppState {
    pub engine: Engine,
    pub config: EngineConfig,
    /// Emit JSON envelopes instead of human-readable text.
    pub json: bool,
}

impl AppState {
    pub fn new(config: EngineConfig, json: bool) -> anyhow::Result<Self> {
        let database = config.resolved_database_path();
        let engine = Engine::open(&config)
            .with_context(|| format!("failed to open database at {}", database.display()))?;

        Ok(Self {
            engine,
            config,
            json,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.resolved_database_path()
    }
}

/// Loads the engine config from `path`, or defaults when none is given.
pub fn load_engine_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => clipflow::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

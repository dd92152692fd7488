use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::FailurePolicies;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite file holding persisted state. `None` means the default
    /// location under the user's home directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Simulated time units advanced per scheduler tick.
    #[serde(default = "default_tick_units")]
    pub tick_units: f64,
    /// Wall-clock milliseconds per simulated time unit.
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,
    /// Capacity of the job event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
    #[serde(default)]
    pub failure_policies: FailurePolicies,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_tick_units() -> f64 {
    0.5
}

fn default_time_unit_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            tick_units: default_tick_units(),
            time_unit_ms: default_time_unit_ms(),
            event_capacity: default_event_capacity(),
            run_timeout_secs: None,
            failure_policies: FailurePolicies::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Configured database path, or the default one. Falls back to the
    /// working directory when no home directory is known.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| PathBuf::from("clipflow.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

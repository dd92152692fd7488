pub mod broadcast;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod job;
pub mod logging;
pub mod progress;
pub mod scheduler;
pub mod store;

pub use broadcast::{JobEvent, JobEventBroadcaster};
pub use config::{load_config, load_config_from_str, EngineConfig, LoggingConfig};
pub use db::{Database, DatabaseError, KeyValueStore, MemoryStore};
pub use engine::Engine;
pub use error::{ConfigError, EngineError, Result};
pub use job::{
    FailureKind, Job, JobFactory, JobFailure, JobId, JobOutput, JobStatus, Stage, StageStatus,
};
pub use logging::init_logging;
pub use progress::Progress;
pub use scheduler::{
    FailurePolicy, OutputSynthesizer, RunHandle, RunOutcome, SimulatedExecutor, StageExecutor,
    StageFailure, StageScheduler,
};
pub use store::{JobStore, PersistenceAdapter, Settings, SettingsStore};

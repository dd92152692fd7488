//! Job and settings state with durable write-through.

mod job_store;
mod persistence;
mod settings_store;

pub use job_store::JobStore;
pub use persistence::{PersistenceAdapter, JOBS_KEY, SETTINGS_KEY};
pub use settings_store::{
    Settings, SettingsStore, DEFAULT_DAYS, DEFAULT_SLOTS, DEFAULT_SUB_LANGS,
};

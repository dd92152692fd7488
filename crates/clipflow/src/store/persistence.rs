//! Typed access to the durable key-value layer.
//!
//! Reads never fail: a missing key, an unreadable backend or a value that is
//! not valid JSON for the requested type all yield `T::default()` and a
//! warning in the log.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::{DatabaseError, KeyValueStore, MemoryStore};

/// Key under which the job collection is stored.
pub const JOBS_KEY: &str = "jobs";
/// Key under which the settings record is stored.
pub const SETTINGS_KEY: &str = "settings";

/// JSON codec over a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistenceAdapter {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Adapter over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Loads and decodes the value under `key`, substituting the default
    /// for missing or corrupt data.
    pub fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                log::warn!(
                    "Failed to read persisted state under key '{}', using empty default: {}",
                    key,
                    e
                );
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "Corrupt persisted state under key '{}', using empty default: {}",
                    key,
                    e
                );
                T::default()
            }
        }
    }

    /// Encodes `value` as JSON and stores it under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), DatabaseError>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|source| DatabaseError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.put(key, &raw)
    }
}

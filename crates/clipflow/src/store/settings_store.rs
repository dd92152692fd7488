//! Branding and scheduling settings.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::persistence::{PersistenceAdapter, SETTINGS_KEY};

pub const DEFAULT_SUB_LANGS: &str = "Arabic, French";
pub const DEFAULT_SLOTS: &str = "09:00, 13:00, 18:00";
pub const DEFAULT_DAYS: &str = "Mon-Sun";

/// Flat settings record. Every field is optional and read only as a
/// passive parameter by the job pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Logo asset reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Comma-separated subtitle languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_langs: Option<String>,
    /// Comma-separated posting times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<String>,
    /// Posting day range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<String>,
    /// Nasheed audio asset reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nasheed: Option<String>,
    /// Sound-effects asset reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfx: Option<String>,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Settings {
    pub fn sub_langs_or_default(&self) -> &str {
        non_blank(&self.sub_langs).unwrap_or(DEFAULT_SUB_LANGS)
    }

    pub fn slots_or_default(&self) -> &str {
        non_blank(&self.slots).unwrap_or(DEFAULT_SLOTS)
    }

    pub fn days_or_default(&self) -> &str {
        non_blank(&self.days).unwrap_or(DEFAULT_DAYS)
    }

    /// Subtitle languages as a list, e.g. `["Arabic", "French"]`.
    pub fn subtitle_languages(&self) -> Vec<String> {
        split_list(self.sub_langs_or_default())
    }

    /// Posting slots as a list, e.g. `["09:00", "13:00", "18:00"]`.
    pub fn schedule_slots(&self) -> Vec<String> {
        split_list(self.slots_or_default())
    }
}

/// Last-write-wins holder for [`Settings`], persisted under `settings`.
pub struct SettingsStore {
    persistence: Arc<PersistenceAdapter>,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Empty settings that persist through `persistence`.
    pub fn new(persistence: Arc<PersistenceAdapter>) -> Self {
        Self {
            persistence,
            current: RwLock::new(Settings::default()),
        }
    }

    /// Restores settings, falling back to an empty record on corrupt data.
    pub fn load(persistence: Arc<PersistenceAdapter>) -> Self {
        let settings: Settings = persistence.load(SETTINGS_KEY);
        Self {
            persistence,
            current: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> Settings {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner().clone()
            }
        }
    }

    /// Applies `f` to the current record and persists the result.
    ///
    /// The in-memory value only changes once the write has succeeded.
    pub fn update<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Settings lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut next = guard.clone();
        f(&mut next);
        self.persistence.save(SETTINGS_KEY, &next)?;
        *guard = next.clone();
        log::debug!("Settings updated");
        Ok(next)
    }
}

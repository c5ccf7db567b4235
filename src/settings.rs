//! Persisted engine settings: the per-device volume table and the hearback
//! level.
//!
//! The engine owns the semantics (defaults, when to write); a
//! [`SettingsStore`] owns the bytes. Loading is best-effort: a missing or
//! unreadable record falls back to defaults rather than failing startup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Hearback level applied when the feature first becomes available.
pub const DEFAULT_HEARBACK_VOLUME: u32 = 70;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Device name -> volume percent. Unlisted devices default to 100.
    pub device_volumes: HashMap<String, u32>,
    pub hearback_volume: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_volumes: HashMap::new(),
            hearback_volume: DEFAULT_HEARBACK_VOLUME,
        }
    }
}

impl Settings {
    pub fn device_volume(&self, name: &str) -> u32 {
        self.device_volumes.get(name).copied().unwrap_or(100)
    }
}

/// Storage boundary for the settings record. Read once at engine
/// construction, rewritten after every volume-affecting mutation.
pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Settings persisted as JSON at a fixed path.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!(
                    "Settings file {} is invalid ({}), using defaults",
                    self.path.display(),
                    e
                );
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let data = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

/// In-memory store for tests and for embedding without persistence.
#[derive(Default)]
pub struct MemoryStore {
    settings: RefCell<Settings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: Settings) -> Self {
        Self {
            settings: RefCell::new(settings),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Settings {
        self.settings.borrow().clone()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.borrow_mut() = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_unlisted_device_defaults_to_full_volume() {
        let settings = Settings::default();
        assert_eq!(settings.device_volume("anything"), 100);
        assert_eq!(settings.hearback_volume, DEFAULT_HEARBACK_VOLUME);
    }

    #[test]
    fn test_json_store_round_trip() {
        let path = std::env::temp_dir().join(format!("lichen_settings_{}.json", Uuid::new_v4()));
        let store = JsonSettingsStore::new(&path);

        let mut settings = Settings::default();
        settings.device_volumes.insert("alpha".to_string(), 40);
        settings.hearback_volume = 55;
        store.save(&settings).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.device_volume("alpha"), 40);
        assert_eq!(loaded.hearback_volume, 55);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_or_invalid_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("lichen_settings_{}.json", Uuid::new_v4()));
        let store = JsonSettingsStore::new(&path);
        assert_eq!(store.load().hearback_volume, DEFAULT_HEARBACK_VOLUME);

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(store.load().hearback_volume, DEFAULT_HEARBACK_VOLUME);
        std::fs::remove_file(&path).ok();
    }
}

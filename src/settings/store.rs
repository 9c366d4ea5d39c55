use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{WatchError, WatchResult};
use crate::settings::model::{PersistedSettings, SETTINGS_KEY, parse_settings_text, settings_to_text};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> WatchResult<()>;
}

/// Keeps every key as a member of a single pretty-printed JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> WatchResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(WatchError::PersistenceUnavailable(format!(
                    "unable to read {}: {err}",
                    self.path.display()
                )));
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(WatchError::PersistenceUnavailable(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(err) => Err(WatchError::PersistenceUnavailable(format!(
                "invalid JSON in {}: {err}",
                self.path.display()
            ))),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>> {
        let object = self.read_object()?;
        Ok(object.get(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }

    /// Refuses to write over a file it cannot read back as an object.
    fn set(&mut self, key: &str, value: &str) -> WatchResult<()> {
        let mut object = self.read_object()?;
        let parsed =
            serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
        object.insert(key.to_string(), parsed);
        let text = serde_json::to_string_pretty(&Value::Object(object)).map_err(|err| {
            WatchError::PersistenceUnavailable(format!("unable to encode store: {err}"))
        })?;
        fs::write(&self.path, format!("{text}\n")).map_err(|err| {
            WatchError::PersistenceUnavailable(format!(
                "unable to write {}: {err}",
                self.path.display()
            ))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> WatchResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> WatchResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store failures and unreadable records both fall back to defaults.
pub fn load_settings(store: &dyn KeyValueStore) -> PersistedSettings {
    let raw = match store.get(SETTINGS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("no saved settings, using defaults");
            return PersistedSettings::default();
        }
        Err(err) => {
            warn!(error = %err, "settings store unavailable, using defaults");
            return PersistedSettings::default();
        }
    };
    match parse_settings_text(&raw) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "saved settings unreadable, using defaults");
            PersistedSettings::default()
        }
    }
}

pub fn save_settings(store: &mut dyn KeyValueStore, settings: &PersistedSettings) -> WatchResult<()> {
    let text = settings_to_text(settings)
        .map_err(|err| WatchError::PersistenceUnavailable(format!("{err:#}")))?;
    store.set(SETTINGS_KEY, &text)
}

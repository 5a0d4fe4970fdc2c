//! Preference store implementations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tokio::sync::broadcast;

use super::error::PreferenceError;
use super::PreferenceSource;

/// Buffer size for change notifications.
const CHANGE_CAPACITY: usize = 64;

/// In-memory preference store.
///
/// Values are lost when the process exits. Useful for tests and for hosts
/// that persist settings elsewhere and push them in with [`set`].
///
/// [`set`]: PreferenceSource::set
#[derive(Debug)]
pub struct MemoryPreferences {
    values: RwLock<BTreeMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryPreferences {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            values: RwLock::new(BTreeMap::new()),
            changes,
        }
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceSource for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let changed = {
            let mut values = self
                .values
                .write()
                .map_err(|e| PreferenceError::Lock(e.to_string()))?;
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        };

        if changed {
            // No subscribers is fine.
            let _ = self.changes.send(key.to_string());
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

/// Preference store persisted as a flat JSON object.
///
/// The whole file is rewritten on every change. Writes go to a sibling
/// temporary file first and are then renamed into place.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl FilePreferences {
    /// Opens the preference file at `path`, starting empty if it does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, PreferenceError> {
        let values = if path.exists() {
            let contents = fs::read_to_string(path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
            changes,
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PreferenceSource for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        {
            let mut values = self
                .values
                .write()
                .map_err(|e| PreferenceError::Lock(e.to_string()))?;
            if values.get(key).map(String::as_str) == Some(value) {
                return Ok(());
            }
            let mut updated = values.clone();
            updated.insert(key.to_string(), value.to_string());
            self.persist(&updated)?;
            *values = updated;
        }

        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}

//! Persisted key/value state: auth token, user profile and play history.

use crate::error::{CoreError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

const LOG_TARGET: &str = "melodia::store";

/// Auth cookie forwarded to the music API
pub const AUTH_TOKEN_KEY: &str = "music_cookie";

/// Cached user profile JSON
pub const USER_PROFILE_KEY: &str = "user_info";

/// Play history JSON array, newest first
pub const PLAY_HISTORY_KEY: &str = "play_history";

/// Simple string key/value store
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if the value cannot be persisted.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Store backed by a pretty-printed JSON object on disk.
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `~/.config/melodia/state.json`
    #[must_use]
    pub fn open_default() -> Self {
        Self::open(crate::paths::state_path())
    }

    /// Open a store file. A missing or unreadable file starts empty.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let values = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(values) => {
                        info!(target: LOG_TARGET, "Loaded state from {}", path.display());
                        values
                    }
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Failed to parse state file, starting empty: {e}");
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    warn!(target: LOG_TARGET, "Failed to read state file, starting empty: {e}");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content).map_err(|e| CoreError::StorageError {
            reason: format!("failed to write {}: {e}", self.path.display()),
        })
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

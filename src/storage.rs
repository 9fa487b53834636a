//! Per-workspace key/value state persisted as a JSON object.

use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

/// Key of the selected locale.
pub const CURRENT_LANGUAGE_KEY: &str = "curlanguage";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} is not a JSON object: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Abstraction over where the selected locale is kept.
pub trait StateStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// JSON file store, e.g. `<workspace>/.thymeleaf-i18n/state.json`.
#[derive(Debug, Clone)]
pub struct WorkspaceStateStorage {
    path: PathBuf,
}

impl WorkspaceStateStorage {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Read { path: self.path.display().to_string(), source });
            }
        };

        serde_json::from_str(&content)
            .map_err(|source| StorageError::Parse { path: self.path.display().to_string(), source })
    }
}

impl StateStore for WorkspaceStateStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // 壊れたファイルは上書きする
        let mut state = self.load().unwrap_or_else(|error| {
            tracing::warn!(%error, "Discarding unreadable state file");
            Map::new()
        });
        state.insert(key.to_string(), Value::String(value.to_string()));

        let write_error = |source: std::io::Error| StorageError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(state)).map_err(|source| {
            StorageError::Parse { path: self.path.display().to_string(), source }
        })?;
        std::fs::write(&self.path, content).map_err(write_error)?;

        tracing::debug!(path = %self.path.display(), key, value, "State saved");
        Ok(())
    }
}

/// In-memory store used when no workspace root is known.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: std::sync::Mutex<Map<String, Value>>,
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(values.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }
}

//! Config store implementations — JSON file and in-memory.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{ConfigError, ConfigStore, NodeConfig, StoredConfig, NODE_COUNT};

/// File-backed store using pretty-printed JSON.
///
/// A missing file means no cached configuration; a corrupt file is
/// treated the same way (with a warning) so a bad cache can never block
/// session start.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredConfig>, ConfigError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached configuration");
                return Ok(None);
            }
            Err(err) => return Err(ConfigError::ReadFailed(err.to_string())),
        };

        match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "cached configuration is corrupt, ignoring");
                Ok(None)
            }
        }
    }

    fn save(&self, nodes: &[NodeConfig; NODE_COUNT]) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed(e.to_string()))?;
        }
        let stored = StoredConfig::Normalized {
            nodes: nodes.to_vec(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| ConfigError::WriteFailed(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| ConfigError::WriteFailed(e.to_string()))
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<StoredConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a configuration.
    pub fn with_config(stored: StoredConfig) -> Self {
        Self {
            inner: Mutex::new(Some(stored)),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredConfig>, ConfigError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| ConfigError::ReadFailed("store poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, nodes: &[NodeConfig; NODE_COUNT]) -> Result<(), ConfigError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| ConfigError::WriteFailed("store poisoned".to_string()))?;
        *guard = Some(StoredConfig::Normalized {
            nodes: nodes.to_vec(),
        });
        Ok(())
    }
}

//! Client-local session identifier
//!
//! One identifier per installation, created lazily the first time it is
//! asked for and persisted through a [`LocalStorage`] backend. Every request
//! carries it so the server can correlate the conversation.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StorageError;

/// Storage key holding the session identifier.
pub const SESSION_KEY: &str = "chat_session";

/// Opaque per-installation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value storage capability that survives restarts
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local storage. Nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object of string entries in a single file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/quill/storage.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quill").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StorageError::Format {
            path: self.path.clone(),
            source,
        })
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());

        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&entries).map_err(|source| {
            StorageError::Format {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(io_err)
    }
}

/// Hands out the installation's session identifier.
///
/// Storage failures never surface: the manager logs them and settles on an
/// identifier that lives only as long as this process.
pub struct SessionManager {
    storage: Box<dyn LocalStorage>,
    cached: OnceLock<SessionId>,
}

impl SessionManager {
    pub fn new(storage: impl LocalStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            cached: OnceLock::new(),
        }
    }

    pub fn get_or_create_session_id(&self) -> SessionId {
        self.cached.get_or_init(|| self.load_or_create()).clone()
    }

    fn load_or_create(&self) -> SessionId {
        match self.storage.get(SESSION_KEY) {
            Ok(Some(stored)) if !stored.trim().is_empty() => {
                debug!(session_id = %stored, "Loaded stored session id");
                return SessionId::from(stored);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Session storage unreadable; using an in-memory session id");
                return SessionId::generate();
            }
        }

        let id = SessionId::generate();
        match self.storage.set(SESSION_KEY, id.as_str()) {
            Ok(()) => info!(session_id = %id, "Created new session id"),
            Err(e) => {
                warn!(error = %e, "Could not persist session id; it will not survive a restart")
            }
        }
        id
    }
}

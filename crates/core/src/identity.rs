//! Stable client identity and its persistence.
//!
//! The identity is an opaque v4 UUID string that addresses the client's
//! logical channel on the server. It is generated once, persisted, and
//! reused across process restarts until a caller adopts a different one.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no platform data directory available for the identity store")]
    NoDataDir,
}

/// Persistence boundary for the client identity.
///
/// Implementations must survive process restarts. [`MemoryIdentityStore`]
/// intentionally does not; it exists for tests and ephemeral sessions.
pub trait IdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError>;
    fn save(&mut self, identity: &str) -> Result<(), IdentityError>;
}

/// Identity stored as a single line in a file under the platform data dir.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default store location, e.g. `~/.local/share/inklet/identity` on Linux.
    pub fn default_path() -> Result<PathBuf, IdentityError> {
        let dirs = crate::project_dirs().ok_or(IdentityError::NoDataDir)?;
        Ok(dirs.data_dir().join("identity"))
    }

    pub fn at_default_path() -> Result<Self, IdentityError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let identity = contents.trim();
                if identity.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(identity.to_owned()))
                }
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&mut self, identity: &str) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, identity)?;
        Ok(())
    }
}

/// Shared in-memory store. Clones observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(slot.clone())
    }

    fn save(&mut self, identity: &str) -> Result<(), IdentityError> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(identity.to_owned());
        Ok(())
    }
}

/// Resolve-or-create front for the persisted identity.
#[derive(Debug)]
pub struct IdentityProvider<S: IdentityStore = FileIdentityStore> {
    store: S,
    cached: Option<String>,
}

impl IdentityProvider<FileIdentityStore> {
    pub fn from_default_store() -> Result<Self, IdentityError> {
        Ok(Self::new(FileIdentityStore::at_default_path()?))
    }
}

impl<S: IdentityStore> IdentityProvider<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cached: None,
        }
    }

    /// The persisted identity, creating and persisting a fresh one on first
    /// use.
    pub fn get(&mut self) -> Result<String, IdentityError> {
        if let Some(identity) = &self.cached {
            return Ok(identity.clone());
        }

        if let Some(identity) = self.store.load()? {
            self.cached = Some(identity.clone());
            return Ok(identity);
        }

        let identity = new_identity();
        debug!(%identity, "generated fresh client identity");
        self.store.save(&identity)?;
        self.cached = Some(identity.clone());
        Ok(identity)
    }

    /// Adopt a caller-chosen identity, persisting it immediately.
    pub fn set(&mut self, identity: &str) -> Result<(), IdentityError> {
        self.store.save(identity)?;
        self.cached = Some(identity.to_owned());
        Ok(())
    }
}

/// A random version-4 UUID string.
pub fn new_identity() -> String {
    Uuid::new_v4().to_string()
}

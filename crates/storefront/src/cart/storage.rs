//! Durable key-value slots for carts and order snapshots.
//!
//! A slot holds one JSON document under a string key. [`FileStorage`] keeps
//! one file per key below a data directory; [`MemoryStorage`] is for tests
//! and throwaway sessions.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Slot key for carts. The server appends `.<visitor uuid>`.
pub const CART_STORAGE_KEY: &str = "appleNation.cart.v1";

/// Slot key for the last placed order.
pub const ORDER_STORAGE_KEY: &str = "appleNation.lastOrder";

/// Errors from storage slots.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key contains characters that cannot name a slot.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Reading or writing the backing store failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The in-memory store was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A durable string slot store.
pub trait SlotStorage: Send + Sync + fmt::Debug {
    /// Read a slot. A slot that was never written is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing store fails.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the slot's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing store fails.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a slot. Deleting a missing slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backing store fails.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Build the per-visitor cart slot key.
#[must_use]
pub fn cart_slot_key(visitor: &str) -> String {
    format!("{CART_STORAGE_KEY}.{visitor}")
}

/// Check that `key` can name a slot: non-empty, no leading dot, and only
/// ASCII letters, digits, `.`, `_` and `-`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] otherwise.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

// =============================================================================
// ScopedStorage
// =============================================================================

/// A view of another store where every key gets a `.{scope}` suffix.
///
/// The server gives each visitor one, so fixed slot names like
/// [`ORDER_STORAGE_KEY`] stay per-visitor.
#[derive(Debug, Clone)]
pub struct ScopedStorage {
    inner: Arc<dyn SlotStorage>,
    scope: String,
}

impl ScopedStorage {
    #[must_use]
    pub fn new(inner: Arc<dyn SlotStorage>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{key}.{}", self.scope)
    }
}

impl SlotStorage for ScopedStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(&self.scoped(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.write(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(&self.scoped(key))
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// One `{key}.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for slot files, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SlotStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write then rename so a crash never leaves a half-written slot.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// Slots kept in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key(CART_STORAGE_KEY).is_ok());
        assert!(validate_key(ORDER_STORAGE_KEY).is_ok());
        assert!(validate_key(&cart_slot_key("2b1f-44aa")).is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("slots")).unwrap();

        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), None);

        storage.write(CART_STORAGE_KEY, "[]").unwrap();
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("slots/appleNation.cart.v1.json").exists());

        storage.remove(CART_STORAGE_KEY).unwrap();
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), None);
        storage.remove(CART_STORAGE_KEY).unwrap();
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.write("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_scoped_storage_suffixes_keys() {
        let shared: Arc<dyn SlotStorage> = Arc::new(MemoryStorage::new());
        let alice = ScopedStorage::new(Arc::clone(&shared), "alice");
        let bob = ScopedStorage::new(Arc::clone(&shared), "bob");

        alice.write(CART_STORAGE_KEY, "[1]").unwrap();
        assert_eq!(bob.read(CART_STORAGE_KEY).unwrap(), None);
        assert_eq!(
            shared.read(&cart_slot_key("alice")).unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.write(ORDER_STORAGE_KEY, "{}").unwrap();
        assert_eq!(storage.read(ORDER_STORAGE_KEY).unwrap().as_deref(), Some("{}"));
        storage.remove(ORDER_STORAGE_KEY).unwrap();
        assert_eq!(storage.read(ORDER_STORAGE_KEY).unwrap(), None);
    }
}

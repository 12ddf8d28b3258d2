//! Durable slots for the serialized cart.
//!
//! The ledger treats persistence as a single slot holding the whole line
//! set: read once at startup, rewritten whole on every mutation. The JSON
//! layout matches what the original browser client kept in local storage,
//! so existing cart files keep loading.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cart::{CartError, CartLine};

/// A durable slot for the cart's line set.
pub trait CartStorage: Send + Sync {
    /// Read the persisted lines. An empty slot is an empty cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] on read failure and
    /// [`CartError::Corrupt`] when the slot holds undecodable content.
    fn load(&self) -> Result<Vec<CartLine>, CartError>;

    /// Replace the persisted lines.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] on write failure.
    fn save(&self, lines: &[CartLine]) -> Result<(), CartError>;
}

/// Cart file on disk, written atomically (write to a sidecar, then rename).
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage backed by the given file path. The file and its parent
    /// directories are created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cart file yet, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Sidecar-then-rename, so a crash mid-write cannot truncate the cart.
        let sidecar = self.path.with_extension("json.tmp");
        std::fs::write(&sidecar, serde_json::to_vec(lines)?)?;
        std::fs::rename(&sidecar, &self.path)?;
        Ok(())
    }
}

/// In-process storage for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    lines: Arc<Mutex<Vec<CartLine>>>,
}

impl MemoryStorage {
    /// Empty in-memory slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last saved lines, for assertions.
    #[must_use]
    pub fn persisted(&self) -> Vec<CartLine> {
        self.lines.lock().clone()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self.lines.lock().clone())
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        *self.lines.lock() = lines.to_vec();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use warung_core::{Price, ProductId};

    use super::*;

    fn sample_line() -> CartLine {
        CartLine {
            product_id: ProductId::new("p1"),
            name: "Sambal Terasi".to_owned(),
            price: Price::parse("25000").unwrap(),
            image: String::new(),
            quantity: 2,
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("cart.json"));

        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("cart.json"));

        storage.save(&[sample_line()]).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, vec![sample_line()]);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("state/deep/cart.json"));

        storage.save(&[sample_line()]).unwrap();
        assert_eq!(storage.load().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_file_reports_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, CartError::Corrupt(_)));
    }

    #[test]
    fn test_save_leaves_no_sidecar_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        JsonFileStorage::new(&path).save(&[sample_line()]).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("cart.json.tmp").exists());
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.save(&[sample_line()]).unwrap();

        assert_eq!(storage.load().unwrap(), vec![sample_line()]);
        assert_eq!(storage.persisted().len(), 1);
    }
}

//! Persistence for the vault state.
//!
//! The whole [`VaultState`] lives under a single key and is rewritten in full
//! after every mutation. There is no schema version: a blob that does not
//! parse is discarded and the seed takes its place.

use crate::error::{Result, RollSafeError};
use crate::models::VaultState;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Key under which the vault blob is stored.
pub const VAULT_KEY: &str = "rollsafe.vault";

/// Keyed blob storage.
pub trait StorageBackend {
    /// Read the blob stored under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`.
    fn write(&mut self, key: &str, blob: &str) -> Result<()>;
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            RollSafeError::StorageUnavailable(format!("{}: {e}", dir.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)) {
                warn!(dir = %dir.display(), error = %e, "could not restrict data directory permissions");
            }
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RollSafeError::StorageUnavailable(e.to_string())),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| RollSafeError::CorruptState(e.to_string()))
    }

    fn write(&mut self, key: &str, blob: &str) -> Result<()> {
        let path = self.path_for(key);

        // Write next to the target and rename so readers never see half a file
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(blob.as_bytes())?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(&path).map_err(|e| RollSafeError::Io(e.error))?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `blob` under `key`.
    pub fn with_blob(key: &str, blob: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut blobs) = storage.blobs.lock() {
            blobs.insert(key.to_string(), blob.to_string());
        }
        storage
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().ok()?.get(key).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| RollSafeError::StorageUnavailable("memory storage poisoned".to_string()))?;
        Ok(blobs.get(key).cloned())
    }

    fn write(&mut self, key: &str, blob: &str) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| RollSafeError::StorageUnavailable("memory storage poisoned".to_string()))?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Parse a persisted blob, enforcing the state invariants.
pub fn decode_state(blob: &str) -> Result<VaultState> {
    let mut state: VaultState =
        serde_json::from_str(blob).map_err(|e| RollSafeError::CorruptState(e.to_string()))?;
    if state.normalize() {
        debug!("normalized persisted vault state");
    }
    Ok(state)
}

/// Serialize a state for persistence.
pub fn encode_state(state: &VaultState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Owner of the single vault state.
///
/// The state is loaded once when the store is opened. `save`, `mutate` and
/// `try_mutate` are the only ways to change it.
pub struct VaultStore {
    backend: Option<Box<dyn StorageBackend>>,
    state: VaultState,
}

impl VaultStore {
    /// Open a store on `backend`, loading the persisted state.
    ///
    /// If the backend cannot be read the store runs detached, so nothing
    /// overwrites data that could not be loaded.
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        match Self::read_state(backend.as_ref()) {
            Ok(state) => Self {
                backend: Some(backend),
                state,
            },
            Err(e) => {
                warn!(error = %e, "vault storage could not be read, running without persistence");
                Self::detached()
            }
        }
    }

    /// A store with no persistence: seed state, writes are dropped.
    pub fn detached() -> Self {
        Self {
            backend: None,
            state: VaultState::seed(),
        }
    }

    /// Read the persisted state, falling back to the seed.
    ///
    /// Never fails: a missing blob, unreadable storage or corrupt data all
    /// produce the seed state.
    pub fn load(backend: &dyn StorageBackend) -> VaultState {
        Self::read_state(backend).unwrap_or_else(|e| {
            warn!(error = %e, "vault storage could not be read, using defaults");
            VaultState::seed()
        })
    }

    /// Corrupt data yields the seed; only a failing backend is an error.
    fn read_state(backend: &dyn StorageBackend) -> Result<VaultState> {
        let blob = match backend.read(VAULT_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("no stored vault found, starting from defaults");
                return Ok(VaultState::seed());
            }
            Err(RollSafeError::CorruptState(e)) => {
                warn!(error = %e, "discarding unreadable vault data, using defaults");
                return Ok(VaultState::seed());
            }
            Err(e) => return Err(e),
        };

        match decode_state(&blob) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(error = %e, "discarding unreadable vault data, using defaults");
                Ok(VaultState::seed())
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> &VaultState {
        &self.state
    }

    /// Whether writes reach a backend.
    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Replace the state and persist it. Persistence failures are logged only.
    pub fn save(&mut self, state: VaultState) {
        self.state = state;
        self.persist();
    }

    /// Apply `f` to a copy of the state, then persist and return the result.
    pub fn mutate<F>(&mut self, f: F) -> &VaultState
    where
        F: FnOnce(&mut VaultState),
    {
        let mut next = self.state.clone();
        f(&mut next);
        self.save(next);
        &self.state
    }

    /// Like [`mutate`](Self::mutate), but `f` may fail. On failure the copy is
    /// dropped and nothing is written.
    pub fn try_mutate<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut VaultState) -> Result<T>,
    {
        let mut next = self.state.clone();
        let value = f(&mut next)?;
        self.save(next);
        Ok(value)
    }

    fn persist(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            debug!("storage unavailable, state not persisted");
            return;
        };

        let result = encode_state(&self.state).and_then(|blob| backend.write(VAULT_KEY, &blob));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist vault state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_storage_yields_seed() {
        let storage = MemoryStorage::new();
        let store = VaultStore::open(Box::new(storage.clone()));
        assert_eq!(store.state(), &VaultState::seed());
        // Loading alone does not write
        assert!(storage.get(VAULT_KEY).is_none());
    }

    #[test]
    fn test_corrupt_blob_yields_seed() {
        for blob in ["", "{", "null", "[]", "{\"documents\": 5}", "\u{0}garbage"] {
            let storage = MemoryStorage::with_blob(VAULT_KEY, blob);
            assert_eq!(VaultStore::load(&storage), VaultState::seed(), "blob {blob:?}");
        }
    }

    #[test]
    fn test_mutate_persists() {
        let storage = MemoryStorage::new();
        let mut store = VaultStore::open(Box::new(storage.clone()));

        store.mutate(|s| {
            s.allowlist.remove("cdl");
        });

        let reloaded = VaultStore::load(&storage);
        assert!(!reloaded.is_allowlisted("cdl"));
        assert_eq!(&reloaded, store.state());
    }

    #[test]
    fn test_failed_try_mutate_writes_nothing() {
        let storage = MemoryStorage::new();
        let mut store = VaultStore::open(Box::new(storage.clone()));

        let result: Result<()> = store.try_mutate(|s| {
            s.documents.clear();
            Err(RollSafeError::WrongPin)
        });

        assert!(result.is_err());
        assert_eq!(store.state().documents.len(), 4);
        assert!(storage.get(VAULT_KEY).is_none());
    }

    #[test]
    fn test_detached_store_keeps_state_in_memory() {
        let mut store = VaultStore::detached();
        assert!(!store.is_persistent());
        store.mutate(|s| s.inspection_unlocked = false);
        assert_eq!(store.state().documents.len(), 4);
    }

    /// Backend whose reads always fail; records attempted writes.
    #[derive(Default, Clone)]
    struct Unreadable {
        writes: Arc<Mutex<Vec<String>>>,
    }

    impl StorageBackend for Unreadable {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(RollSafeError::StorageUnavailable("device not ready".to_string()))
        }

        fn write(&mut self, key: &str, _blob: &str) -> Result<()> {
            self.writes.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_backend_is_never_written() {
        let backend = Unreadable::default();
        let mut store = VaultStore::open(Box::new(backend.clone()));

        assert!(!store.is_persistent());
        assert_eq!(store.state(), &VaultState::seed());

        store.mutate(|s| {
            s.allowlist.remove("cdl");
        });
        assert!(!store.state().is_allowlisted("cdl"));
        assert!(backend.writes.lock().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let vault_dir = dir.path().join("vault");
        let mut storage = FileStorage::open(&vault_dir).unwrap();
        storage.write(VAULT_KEY, "{}").unwrap();

        let dir_mode = fs::metadata(&vault_dir).unwrap().permissions().mode();
        let file_mode = fs::metadata(storage.path_for(VAULT_KEY))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn test_load_normalizes_allowlist() {
        let mut state = VaultState::seed();
        state.allowlist.insert("ghost".to_string());
        state.inspection_unlocked = true;
        let blob = serde_json::to_string(&state).unwrap();

        let loaded = VaultStore::load(&MemoryStorage::with_blob(VAULT_KEY, &blob));
        assert!(!loaded.allowlist.contains("ghost"));
        assert!(!loaded.inspection_unlocked);
    }
}

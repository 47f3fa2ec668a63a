//! services/client/src/adapters/store.rs
//!
//! Credential store adapter implementing the `CredentialStore` port.
//!
//! `FileCredentialStore` keeps the values in a small JSON object on disk so the
//! signed-in identity survives a restart.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;
use zyndle_core::ports::{CredentialStore, PortError, PortResult};

/// Default credential file name inside the data directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

//=========================================================================================
// File-backed Store
//=========================================================================================

/// Plaintext JSON file, written atomically and restricted to the owner on Unix.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<data_dir>/credentials.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) -> PortResult<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(PortError::Storage(e.to_string())),
        };
        match serde_json::from_str(&content) {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Credential file is unreadable; starting empty.");
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> PortResult<()> {
        let storage = |e: std::io::Error| PortError::Storage(e.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(storage)?;
        }
        let json =
            serde_json::to_string_pretty(values).map_err(|e| PortError::Storage(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        // A leftover from an interrupted write may carry looser permissions.
        match std::fs::remove_file(&tmp_path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(storage(e)),
            _ => {}
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path).map_err(storage)?;
        file.write_all(json.as_bytes()).map_err(storage)?;
        file.sync_all().map_err(storage)?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(storage)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let _guard = self.guard();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.guard();
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let _guard = self.guard();
        let mut values = self.load()?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(&values)
    }
}

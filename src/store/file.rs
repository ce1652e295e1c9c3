//! Credential persistence using local JSON storage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing::debug;
use zeroize::Zeroize;

use super::CredentialStore;
use crate::error::StoreError;
use crate::secure::SecureString;

/// Credentials file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Stores credentials in a JSON file.
///
/// Every call reads or rewrites the whole file; the store keeps nothing in memory.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform config directory.
    ///
    /// Returns `~/Library/Application Support/no.soderlind.azure-oauth2/credentials.json` on macOS.
    pub fn default_location() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("no", "soderlind", "azure-oauth2").ok_or_else(|| {
            StoreError::Read("Could not determine config directory".to_string())
        })?;
        Ok(Self::new(dirs.config_dir().join(CREDENTIALS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let mut content =
            fs::read_to_string(&self.path).map_err(|e| StoreError::Read(e.to_string()))?;
        let parsed = serde_json::from_str(&content).map_err(|e| StoreError::Read(e.to_string()));
        content.zeroize();
        parsed
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let mut content =
            serde_json::to_string_pretty(values).map_err(|e| StoreError::Write(e.to_string()))?;
        let written = write_private(&self.path, &content);
        content.zeroize();
        written.map_err(|e| StoreError::Write(e.to_string()))?;

        debug!("Saved credentials to {:?}", self.path);
        Ok(())
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
        wrap: fn(String) -> StoreError,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|e| wrap(e.to_string()))?;
        let mut values = self.load()?;
        change(&mut values);
        let result = self.save(&values);
        values.values_mut().for_each(Zeroize::zeroize);
        result
    }
}

#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<SecureString>, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        let mut values = self.load()?;
        let value = values.remove(key).map(SecureString::from);
        values.values_mut().for_each(Zeroize::zeroize);
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(
            |values| {
                values.insert(key.to_string(), value.to_string());
            },
            StoreError::Write,
        )
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.update(
            |values| {
                values.remove(key);
            },
            StoreError::Delete,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;

    #[test]
    fn test_default_location() {
        let store = FileStore::default_location().unwrap();
        assert!(store.path().ends_with(CREDENTIALS_FILE));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join(CREDENTIALS_FILE));
        assert!(store.get(keys::REFRESH_TOKEN).unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CREDENTIALS_FILE);
        let store = FileStore::new(&path);

        store.set(keys::REFRESH_TOKEN, "rt").unwrap();
        store.set(keys::ACCESS_TOKEN, "at").unwrap();

        // A second handle sees the same data
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.require(keys::REFRESH_TOKEN).unwrap().as_str(), "rt");
        assert_eq!(reopened.require(keys::ACCESS_TOKEN).unwrap().as_str(), "at");

        reopened.delete(keys::ACCESS_TOKEN).unwrap();
        assert!(store.get(keys::ACCESS_TOKEN).unwrap().is_none());
        assert!(store.get(keys::REFRESH_TOKEN).unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);
        FileStore::new(&path).set(keys::CLIENT_SECRET, "s").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CREDENTIALS_FILE);
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get(keys::CLIENT_ID), Err(StoreError::Read(_))));
    }
}

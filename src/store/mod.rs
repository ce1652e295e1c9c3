//! Credential storage.
//!
//! The OAuth2 client never persists anything itself. Hosts inject a [`CredentialStore`]
//! to supply the client id and secret and to keep the tokens they receive.

mod file;
#[cfg(target_os = "macos")]
mod keychain;

pub use file::FileStore;
#[cfg(target_os = "macos")]
pub use keychain::KeychainStore;

use crate::error::StoreError;
use crate::secure::SecureString;
use std::collections::HashMap;
use std::sync::RwLock;

/// Well-known keys.
pub mod keys {
    pub const CLIENT_ID: &str = "AZURE_AD_CONSUMER_KEY";
    pub const CLIENT_SECRET: &str = "AZURE_AD_CONSUMER_SECRET";
    /// Bearer token obtained through the client credentials grant.
    pub const BEARER_TOKEN: &str = "AZURE_AD_BEARER_TOKEN";
    pub const ACCESS_TOKEN: &str = "AZURE_AD_ACCESS_TOKEN";
    pub const REFRESH_TOKEN: &str = "AZURE_AD_REFRESH_TOKEN";
    /// RFC 3339 expiry of the stored access token.
    pub const TOKEN_EXPIRY: &str = "AZURE_AD_TOKEN_EXPIRY";
    pub const AUTHORIZATION_CODE: &str = "AZURE_AD_AUTHORIZATION_CODE";

    /// Keys removed on sign-out. Client credentials are left in place.
    pub const SESSION: &[&str] = &[
        BEARER_TOKEN,
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        TOKEN_EXPIRY,
        AUTHORIZATION_CODE,
    ];
}

/// Key-value storage for secrets and tokens.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SecureString>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Like [`get`](Self::get), but a missing key is an error.
    fn require(&self, key: &str) -> Result<SecureString, StoreError> {
        self.get(key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// In-process store, for tests and short-lived hosts.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, SecureString>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<SecureString>, StoreError> {
        let values = self
            .values
            .read()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        values.insert(key.to_string(), SecureString::new(value));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .write()
            .map_err(|e| StoreError::Delete(e.to_string()))?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(keys::ACCESS_TOKEN).unwrap().is_none());

        store.set(keys::ACCESS_TOKEN, "at").unwrap();
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().unwrap().as_str(), "at");

        store.set(keys::ACCESS_TOKEN, "at2").unwrap();
        assert_eq!(store.require(keys::ACCESS_TOKEN).unwrap().as_str(), "at2");

        store.delete(keys::ACCESS_TOKEN).unwrap();
        store.delete(keys::ACCESS_TOKEN).unwrap();
        assert!(matches!(
            store.require(keys::ACCESS_TOKEN),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_stores_are_isolated() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.set(keys::CLIENT_ID, "tenant-a").unwrap();
        assert!(b.get(keys::CLIENT_ID).unwrap().is_none());
    }
}

//! macOS Keychain integration for secure credential storage.

use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};

use super::CredentialStore;
use crate::error::StoreError;
use crate::secure::SecureString;

/// Default Keychain service identifier.
pub const DEFAULT_SERVICE: &str = "no.soderlind.azure-oauth2";

/// errSecItemNotFound
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

/// Stores each key as a generic password under one Keychain service.
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl CredentialStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<SecureString>, StoreError> {
        match get_generic_password(&self.service, key) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(|s| Some(SecureString::from(s)))
                .map_err(|e| StoreError::Read(e.to_string())),
            Err(e) if is_not_found_error(&e) => Ok(None),
            Err(e) => Err(StoreError::Read(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        set_generic_password(&self.service, key, value.as_bytes())
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match delete_generic_password(&self.service, key) {
            Ok(()) => Ok(()),
            Err(e) if is_not_found_error(&e) => Ok(()),
            Err(e) => Err(StoreError::Delete(e.to_string())),
        }
    }
}

fn is_not_found_error(error: &security_framework::base::Error) -> bool {
    error.code() == ERR_SEC_ITEM_NOT_FOUND
}

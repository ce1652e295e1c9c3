//! Anti-forgery state nonce and the authorization code it protects.

use crate::secure::{constant_time_eq, SecureString};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Number of random bytes in a state nonce.
const STATE_BYTES: usize = 32;

/// Single-use `state` nonce for one authorization attempt.
///
/// Not `Clone`: verifying the provider's response takes it by value, so a nonce
/// can never be checked twice.
pub struct AuthorizationState(SecureString);

impl AuthorizationState {
    /// Generate a fresh, unguessable nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; STATE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(SecureString::new(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// The value to send as the `state` parameter.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Compare the provider's echoed `state` without short-circuiting.
    pub fn matches(&self, returned: &str) -> bool {
        !returned.is_empty() && constant_time_eq(self.0.as_str().as_bytes(), returned.as_bytes())
    }
}

impl std::fmt::Debug for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthorizationState([REDACTED])")
    }
}

#[cfg(test)]
impl AuthorizationState {
    pub(crate) fn from_value(value: &str) -> Self {
        Self(SecureString::new(value))
    }
}

/// Short-lived code issued by the provider after consent, exchanged once for tokens.
#[derive(Debug)]
pub struct AuthorizationCode(SecureString);

impl AuthorizationCode {
    pub(crate) fn new(code: impl Into<String>) -> Self {
        Self(SecureString::new(code))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

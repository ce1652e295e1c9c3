//! App-only bearer token acquisition backed by a credential store.
//!
//! Reads the client credentials from the store, and fetches a token with the client
//! credentials grant only when none is stored yet or a refresh is forced.

use crate::auth::OAuth2Client;
use crate::error::AuthError;
use crate::secure::SecureString;
use crate::store::{keys, CredentialStore};
use tracing::{debug, info};

/// Outcome of [`ensure_bearer_token`].
#[derive(Debug)]
pub enum BearerToken {
    /// A token was already stored and no refresh was forced.
    Cached(SecureString),
    /// A new token was fetched and stored.
    Fetched(SecureString),
}

impl BearerToken {
    pub fn token(&self) -> &SecureString {
        match self {
            Self::Cached(token) | Self::Fetched(token) => token,
        }
    }

    pub fn was_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Return the stored bearer token, fetching and storing a new one if needed.
pub async fn ensure_bearer_token(
    client: &OAuth2Client,
    store: &dyn CredentialStore,
    force: bool,
) -> Result<BearerToken, AuthError> {
    if !force {
        if let Some(token) = store.get(keys::BEARER_TOKEN)? {
            if !token.is_empty() {
                debug!("Using stored bearer token");
                return Ok(BearerToken::Cached(token));
            }
        }
    }

    let response = client.client_credentials_token().await?;
    store.set(keys::BEARER_TOKEN, response.access_token.as_str())?;
    info!("Stored new bearer token");

    Ok(BearerToken::Fetched(response.access_token.clone()))
}

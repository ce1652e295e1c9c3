//! Configuration loading and management.
//!
//! [`Config`] is the host configuration, loaded from the embedded config.toml with
//! environment variable overrides. [`ClientConfig`] is the immutable set of credentials
//! an [`OAuth2Client`](crate::auth::OAuth2Client) is built from.

use crate::auth::endpoints::{
    Endpoints, AUTHORIZATION_URL_TEMPLATE, DEFAULT_TENANT, TOKEN_URL_TEMPLATE,
};
use crate::auth::transport::TransportOptions;
use crate::error::{AuthError, StoreError};
use crate::secure::SecureString;
use crate::store::{keys, CredentialStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Characters that would change the meaning of a resolved endpoint URL.
const FORBIDDEN_TENANT_CHARS: &[char] = &['/', '?', '#', '{', '}', ' '];

/// Credentials and endpoint settings for one client. Immutable once built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    client_id: String,
    client_secret: SecureString,
    redirect_uri: Url,
    scope: Option<String>,
    tenant: String,
    authorization_url_template: String,
    token_url_template: String,
    require_admin_consent: bool,
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<SecureString>,
        redirect_uri: &str,
    ) -> Result<Self, AuthError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() {
            return Err(AuthError::Config("client_id must not be empty".into()));
        }
        if client_secret.is_empty() {
            return Err(AuthError::Config("client_secret must not be empty".into()));
        }
        let redirect_uri = Url::parse(redirect_uri)
            .map_err(|e| AuthError::Config(format!("redirect_uri is not an absolute URL: {}", e)))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            scope: None,
            tenant: DEFAULT_TENANT.to_string(),
            authorization_url_template: AUTHORIZATION_URL_TEMPLATE.to_string(),
            token_url_template: TOKEN_URL_TEMPLATE.to_string(),
            require_admin_consent: true,
        })
    }

    /// Read `client_id` and `client_secret` from a credential store.
    pub fn from_store(store: &dyn CredentialStore, redirect_uri: &str) -> Result<Self, AuthError> {
        let client_id = store
            .get(keys::CLIENT_ID)?
            .ok_or_else(|| StoreError::NotFound(keys::CLIENT_ID.to_string()))?;
        let client_secret = store
            .get(keys::CLIENT_SECRET)?
            .ok_or_else(|| StoreError::NotFound(keys::CLIENT_SECRET.to_string()))?;

        Self::new(client_id.as_str(), client_secret, redirect_uri)
    }

    /// Set the space-delimited scope list. Empty scopes are dropped.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        self.scope = (!scope.trim().is_empty()).then_some(scope);
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Result<Self, AuthError> {
        let tenant = tenant.into();
        if tenant.is_empty() || tenant.contains(FORBIDDEN_TENANT_CHARS) {
            return Err(AuthError::Config(format!("invalid tenant: {:?}", tenant)));
        }
        self.tenant = tenant;
        Ok(self)
    }

    /// Point the client at a different authority, e.g. a sovereign cloud or a test server.
    pub fn with_templates(
        mut self,
        authorization_url_template: impl Into<String>,
        token_url_template: impl Into<String>,
    ) -> Self {
        self.authorization_url_template = authorization_url_template.into();
        self.token_url_template = token_url_template.into();
        self
    }

    /// Whether the authorization response must carry `admin_consent=true`. On by default.
    pub fn with_admin_consent(mut self, required: bool) -> Self {
        self.require_admin_consent = required;
        self
    }

    pub fn requires_admin_consent(&self) -> bool {
        self.require_admin_consent
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecureString {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from_templates(
            &self.authorization_url_template,
            &self.token_url_template,
            &self.tenant,
        )
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Usually supplied through `AZURE_CLIENT_SECRET` or the credential store.
    #[serde(default)]
    pub client_secret: Option<SecureString>,
    pub tenant: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_authorization_template")]
    pub authorization_url_template: String,
    #[serde(default = "default_token_template")]
    pub token_url_template: String,
    #[serde(default = "default_true")]
    pub require_admin_consent: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_authorization_template() -> String {
    AUTHORIZATION_URL_TEMPLATE.to_string()
}

fn default_token_template() -> String {
    TOKEN_URL_TEMPLATE.to_string()
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_toml(CONFIG_TOML)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = env::var("AZURE_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }

        if let Ok(client_secret) = env::var("AZURE_CLIENT_SECRET") {
            self.oauth.client_secret = Some(SecureString::new(client_secret));
        }

        if let Ok(tenant) = env::var("AZURE_TENANT_ID") {
            self.oauth.tenant = tenant;
        }

        if let Ok(redirect_uri) = env::var("AZURE_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }

        if let Ok(scope) = env::var("AZURE_SCOPE") {
            self.oauth.scope = Some(scope);
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() || self.oauth.client_id == "YOUR_AZURE_AD_CLIENT_ID" {
            anyhow::bail!(
                "Azure AD client_id not configured. Set AZURE_CLIENT_ID environment variable \
                 or update config.toml"
            );
        }

        if self.oauth.tenant.is_empty() || self.oauth.tenant == "YOUR_TENANT_ID" {
            anyhow::bail!(
                "Azure AD tenant not configured. Set AZURE_TENANT_ID environment variable \
                 or update config.toml"
            );
        }

        Ok(())
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: Duration::from_secs(self.http.timeout_seconds),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_seconds),
            danger_accept_invalid_certs: self.http.danger_accept_invalid_certs,
        }
    }

    /// Build the client configuration. The secret comes from the environment or
    /// config first, then from the credential store.
    pub fn client_config(&self, store: &dyn CredentialStore) -> Result<ClientConfig, AuthError> {
        let client_secret = match &self.oauth.client_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => store
                .get(keys::CLIENT_SECRET)?
                .ok_or_else(|| StoreError::NotFound(keys::CLIENT_SECRET.to_string()))?,
        };

        let mut client = ClientConfig::new(
            self.oauth.client_id.as_str(),
            client_secret,
            &self.oauth.redirect_uri,
        )?
        .with_tenant(self.oauth.tenant.as_str())?
        .with_templates(
            self.oauth.authorization_url_template.as_str(),
            self.oauth.token_url_template.as_str(),
        )
        .with_admin_consent(self.oauth.require_admin_consent);
        if let Some(scope) = &self.oauth.scope {
            client = client.with_scope(scope.as_str());
        }
        Ok(client)
    }
}

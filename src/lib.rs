//! OAuth2 authorization code client for Azure AD.
//!
//! ```no_run
//! use azure_oauth2::auth::{OAuth2Client, TransportOptions};
//! use azure_oauth2::config::ClientConfig;
//!
//! # async fn run() -> Result<(), azure_oauth2::error::AuthError> {
//! let config = ClientConfig::new("client-id", "client-secret", "https://example.com/callback")?
//!     .with_tenant("contoso")?
//!     .with_scope("https://management.azure.com/.default offline_access");
//! let client = OAuth2Client::with_http(config, &TransportOptions::default())?;
//!
//! let code = client.get_authorization_code().await?;
//! let token = client.get_access_token(code.as_str()).await?;
//! if let Some(refresh_token) = &token.refresh_token {
//!     let _renewed = client.refresh_access_token(refresh_token.as_str()).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod auth;
pub mod bearer;
pub mod config;
pub mod error;
pub mod secure;
pub mod store;

pub use auth::{OAuth2Client, TokenResponse};
pub use config::ClientConfig;
pub use error::AuthError;

//! Azure AD OAuth2 authentication.
//!
//! Provides the authorization code flow (authorization request, code exchange, and
//! token refresh) plus the client credentials grant, over a pluggable transport.

pub mod client;
pub mod endpoints;
pub mod request;
pub mod state;
pub mod token;
pub mod transport;
pub mod validator;

#[cfg(test)]
mod tests;

pub use client::OAuth2Client;
pub use endpoints::{resolve, Endpoints};
pub use state::{AuthorizationCode, AuthorizationState};
pub use token::TokenResponse;
pub use transport::{HttpTransport, RawResponse, Transport, TransportOptions};

//! Error types for the OAuth2 client.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.
//! Low-level failures (`TransportError`, `ParseError`, `ValidationError`, `ProviderError`) are
//! collected into a `FlowError`, and `AuthError` records which client operation produced it.

use thiserror::Error;

/// Failure of the underlying HTTP exchange. Never retried by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// The provider's response body could not be understood.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Response body is empty")]
    EmptyBody,

    #[error("Response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Checks on the authorization response that did not pass.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("State validation failed (possible CSRF attack)")]
    StateMismatch,

    #[error("Consent was not granted")]
    ConsentDenied,

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Missing refresh token")]
    MissingRefreshToken,
}

/// Structured error returned by the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.description.as_deref().unwrap_or(&self.error))]
pub struct ProviderError {
    /// OAuth2 error code, e.g. `invalid_grant`.
    pub error: String,
    /// Human-readable `error_description`, when the provider sent one.
    pub description: Option<String>,
    /// HTTP status of the response carrying the error.
    pub status: u16,
}

impl ProviderError {
    /// True when the grant itself was rejected and only a new sign-in can recover.
    /// Throttling and outages are not, so stored tokens should survive them.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self.error.as_str(), "invalid_grant" | "interaction_required")
    }
}

/// Any failure along the request pipeline.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors surfaced by the public client operations.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth2 authorization failed: {0}")]
    Authentication(#[source] FlowError),

    #[error("Token exchange failed: {0}")]
    TokenExchange(#[source] FlowError),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(#[source] FlowError),

    #[error("Client credentials grant failed: {0}")]
    ClientCredentials(#[source] FlowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// The pipeline failure behind an operation error, if any.
    pub fn flow_error(&self) -> Option<&FlowError> {
        match self {
            Self::Authentication(e)
            | Self::TokenExchange(e)
            | Self::TokenRefresh(e)
            | Self::ClientCredentials(e) => Some(e),
            Self::Config(_) | Self::Store(_) => None,
        }
    }

    /// The provider's structured error, if the failure came from the provider.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self.flow_error() {
            Some(FlowError::Provider(e)) => Some(e),
            _ => None,
        }
    }

    /// The transport failure, if the request never produced a response.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self.flow_error() {
            Some(FlowError::Transport(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_state_mismatch(&self) -> bool {
        matches!(
            self.flow_error(),
            Some(FlowError::Validation(ValidationError::StateMismatch))
        )
    }

    /// Returns a user-friendly message for display.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Authentication(FlowError::Validation(ValidationError::StateMismatch)) => {
                "Security error. Please try signing in again."
            }
            Self::Authentication(FlowError::Validation(ValidationError::ConsentDenied)) => {
                "Consent was not granted for this application."
            }
            Self::TokenRefresh(FlowError::Provider(e)) if e.is_session_invalid() => {
                "Session expired. Please sign in again."
            }
            Self::Authentication(FlowError::Transport(_))
            | Self::TokenExchange(FlowError::Transport(_))
            | Self::TokenRefresh(FlowError::Transport(_))
            | Self::ClientCredentials(FlowError::Transport(_)) => {
                "Network error. Check your connection."
            }
            Self::Authentication(_) => "Sign-in failed. Please try again.",
            Self::Config(_) => "Configuration error. Please check settings.",
            Self::Store(StoreError::NotFound(_)) => "No saved session found.",
            _ => "An error occurred. Please try again.",
        }
    }

    /// Returns true if the caller should discard its tokens and start a new authorization.
    pub fn requires_sign_in(&self) -> bool {
        match self {
            Self::TokenRefresh(FlowError::Provider(e)) => e.is_session_invalid(),
            Self::TokenRefresh(FlowError::Validation(ValidationError::MissingRefreshToken)) => true,
            _ => false,
        }
    }
}

/// Credential storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No value stored for {0}")]
    NotFound(String),

    #[error("Failed to read credential store: {0}")]
    Read(String),

    #[error("Failed to write credential store: {0}")]
    Write(String),

    #[error("Failed to delete from credential store: {0}")]
    Delete(String),
}

//! HTTP transport abstraction.
//!
//! The client only talks to the network through [`Transport`], so tests can substitute
//! canned responses. [`HttpTransport`] is the production implementation on top of reqwest.

use crate::auth::request::{Method, OAuthRequest};
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single request. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OAuthRequest) -> Result<RawResponse, TransportError>;
}

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Skip TLS certificate validation.
    ///
    /// Only for local testing against self-signed endpoints. Never enable this in
    /// production: it allows anyone on the network path to read the client secret
    /// and issued tokens.
    pub danger_accept_invalid_certs: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: HTTP_TIMEOUT,
            connect_timeout: HTTP_CONNECT_TIMEOUT,
            danger_accept_invalid_certs: false,
        }
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        if options.danger_accept_invalid_certs {
            warn!("TLS certificate validation is DISABLED; use only for local testing");
        }

        let http_client = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(options.danger_accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OAuthRequest) -> Result<RawResponse, TransportError> {
        let url = request
            .target_url()
            .map_err(|e| TransportError::Request(format!("Invalid URL: {}", e)))?;

        let mut builder = match request.method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url).body(request.encoded_body()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!("{} {} -> HTTP {}", request.method.as_str(), request.url, status);

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

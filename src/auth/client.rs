//! OAuth2 client for the Azure AD authorization code flow.
//!
//! The flow moves through typed stages: an [`AuthorizationState`] is created per
//! attempt, a successful check turns it into an [`AuthorizationCode`], the code is
//! exchanged for a [`TokenResponse`], and later refresh calls produce fresh
//! `TokenResponse`s. The client itself stores neither codes nor tokens.

use crate::auth::endpoints::Endpoints;
use crate::auth::request::{self, fields, Fields, Method, OAuthRequest};
use crate::auth::state::{AuthorizationCode, AuthorizationState};
use crate::auth::token::TokenResponse;
use crate::auth::transport::{HttpTransport, RawResponse, Transport, TransportOptions};
use crate::auth::validator;
use crate::config::ClientConfig;
use crate::error::{AuthError, FlowError, ParseError, ProviderError, TransportError, ValidationError};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// The grant types this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    /// Authorization request (`response_type=code`).
    Authorization,
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
}

impl Grant {
    fn name(self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }

    fn method(self) -> Method {
        match self {
            Self::Authorization => Method::Get,
            _ => Method::Post,
        }
    }
}

/// OAuth2 client for Azure AD authentication.
pub struct OAuth2Client {
    config: ClientConfig,
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    deadline: Option<Duration>,
}

impl OAuth2Client {
    /// Create a client that sends requests through `transport`.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let endpoints = config.endpoints();
        Self {
            config,
            endpoints,
            transport,
            deadline: None,
        }
    }

    /// Create a client backed by [`HttpTransport`].
    pub fn with_http(config: ClientConfig, options: &TransportOptions) -> Result<Self, AuthError> {
        let transport =
            HttpTransport::new(options).map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Fail any single request that takes longer than `deadline` with a timeout.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Request an authorization code from the provider.
    ///
    /// A fresh `state` nonce is generated for the attempt and consumed by the
    /// response check, so it is gone once this returns, whatever the outcome.
    pub async fn get_authorization_code(&self) -> Result<AuthorizationCode, AuthError> {
        let state = AuthorizationState::generate();
        let extra = fields([("response_type", "code"), ("state", state.as_str())]);

        let parsed = self
            .request(Grant::Authorization, extra)
            .await
            .map_err(AuthError::Authentication)?;

        let code = self
            .verify(&parsed, state)
            .map_err(|e| AuthError::Authentication(e.into()))?;

        info!("Authorization code received");
        Ok(code)
    }

    /// Exchange an authorization code for tokens.
    pub async fn get_access_token(&self, authorization_code: &str) -> Result<TokenResponse, AuthError> {
        if authorization_code.is_empty() {
            return Err(AuthError::TokenExchange(ValidationError::MissingCode.into()));
        }

        let extra = fields([
            ("code", authorization_code),
            ("grant_type", "authorization_code"),
        ]);
        let token = self
            .request_token(Grant::AuthorizationCode, extra)
            .await
            .map_err(AuthError::TokenExchange)?;

        match token.expires_in {
            Some(seconds) => info!("Token exchange succeeded, expires in {}s", seconds),
            None => info!("Token exchange succeeded"),
        }
        Ok(token)
    }

    /// Refresh an access token using a refresh token.
    ///
    /// The response may not carry a new refresh token; callers keep the old one then.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::TokenRefresh(ValidationError::MissingRefreshToken.into()));
        }

        let extra = fields([
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]);
        let token = self
            .request_token(Grant::RefreshToken, extra)
            .await
            .map_err(AuthError::TokenRefresh)?;

        match token.expires_in {
            Some(seconds) => info!("Token refreshed, expires in {}s", seconds),
            None => info!("Token refreshed"),
        }
        Ok(token)
    }

    /// Acquire an app-only token with the client credentials grant.
    ///
    /// Credentials travel in an HTTP Basic `Authorization` header.
    pub async fn client_credentials_token(&self) -> Result<TokenResponse, AuthError> {
        let extra = fields([("grant_type", "client_credentials")]);
        let token = self
            .request_token(Grant::ClientCredentials, extra)
            .await
            .map_err(AuthError::ClientCredentials)?;

        info!("Client credentials token acquired");
        Ok(token)
    }

    /// Generate the authorization URL for browser-based sign-in.
    ///
    /// Returns the URL and the state nonce that [`complete_authorization`](Self::complete_authorization)
    /// checks the redirect against.
    pub fn authorization_url(&self) -> Result<(Url, AuthorizationState), AuthError> {
        let state = AuthorizationState::generate();
        let extra = fields([("response_type", "code"), ("state", state.as_str())]);
        let url = self
            .build_request(Grant::Authorization, extra)
            .target_url()
            .map_err(|e| AuthError::Config(format!("Invalid authorization endpoint: {}", e)))?;
        Ok((url, state))
    }

    /// Check the redirect the browser landed on and extract the authorization code.
    pub fn complete_authorization(
        &self,
        callback_url: &str,
        state: AuthorizationState,
    ) -> Result<AuthorizationCode, AuthError> {
        let url = Url::parse(callback_url).map_err(|e| {
            AuthError::Authentication(
                ParseError::UnexpectedShape(format!("invalid callback URL: {}", e)).into(),
            )
        })?;

        let params: Map<String, Value> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        let parsed = Value::Object(params);

        validator::check_provider_error(200, &parsed)
            .map_err(|e| AuthError::Authentication(e.into()))?;

        let code = self
            .verify(&parsed, state)
            .map_err(|e| AuthError::Authentication(e.into()))?;

        info!("Authorization code received from redirect");
        Ok(code)
    }

    fn verify(
        &self,
        parsed: &Value,
        state: AuthorizationState,
    ) -> Result<AuthorizationCode, ValidationError> {
        if self.config.requires_admin_consent() {
            validator::verify_state(parsed, state)
        } else {
            validator::verify_state_only(parsed, state)
        }
    }

    fn base_fields(&self, grant: Grant) -> Fields {
        let mut base = Fields::new();
        if let Some(scope) = self.config.scope() {
            base.insert("scope".to_string(), scope.to_string());
        }
        if grant == Grant::ClientCredentials {
            return base;
        }

        base.insert("client_id".to_string(), self.config.client_id().to_string());
        base.insert(
            "redirect_uri".to_string(),
            self.config.redirect_uri().to_string(),
        );
        // The authorization request ends up in a URL, so the secret stays out of it
        if grant != Grant::Authorization {
            base.insert(
                "client_secret".to_string(),
                self.config.client_secret().as_str().to_string(),
            );
        }
        base
    }

    fn build_request(&self, grant: Grant, extra: Fields) -> OAuthRequest {
        let endpoint = match grant {
            Grant::Authorization => &self.endpoints.authorization_url,
            _ => &self.endpoints.token_url,
        };
        let built = request::build(grant.method(), endpoint, self.base_fields(grant), extra);

        match grant {
            Grant::ClientCredentials => built.with_basic_auth(
                self.config.client_id(),
                self.config.client_secret().as_str(),
            ),
            _ => built,
        }
    }

    /// The single request path every grant goes through.
    async fn request(&self, grant: Grant, extra: Fields) -> Result<Value, FlowError> {
        let request = self.build_request(grant, extra);
        debug!(
            "Sending {} request: {} {}",
            grant.name(),
            request.method.as_str(),
            request.url
        );

        let result = self.send(&request).await.map_err(FlowError::from).and_then(|response| {
            let parsed = parse_response(&response)?;
            validator::check_provider_error(response.status, &parsed)?;
            Ok(parsed)
        });

        if let Err(e) = &result {
            error!("OAuth2 {} request failed: {}", grant.name(), e);
        }
        result
    }

    async fn request_token(&self, grant: Grant, extra: Fields) -> Result<TokenResponse, FlowError> {
        let parsed = self.request(grant, extra).await?;
        serde_json::from_value(parsed)
            .map_err(|e| ParseError::UnexpectedShape(format!("token response: {}", e)).into())
    }

    async fn send(&self, request: &OAuthRequest) -> Result<RawResponse, TransportError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.transport.send(request))
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => self.transport.send(request).await,
        }
    }
}

/// An error status with an unreadable body is still the provider's error.
fn parse_response(response: &RawResponse) -> Result<Value, FlowError> {
    match validator::parse(response) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !response.is_success() => Err(ProviderError {
            error: format!("http_{}", response.status),
            description: None,
            status: response.status,
        }
        .into()),
        Err(e) => Err(e.into()),
    }
}

//! OAuth2 request assembly.
//!
//! Every grant type goes through [`build`]: client-level base fields are merged with
//! grant-specific extra fields, and the result carries everything a transport needs
//! to put the request on the wire.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::BTreeMap;
use url::{form_urlencoded, Url};
use zeroize::Zeroize;

/// Content type of every OAuth2 request body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Field names whose values must never appear in debug output.
const SENSITIVE_FIELDS: &[&str] = &[
    "client_secret",
    "code",
    "refresh_token",
    "access_token",
    "state",
];

/// Header names whose values must never appear in debug output.
const SENSITIVE_HEADERS: &[&str] = &["authorization"];

/// Request parameters, keyed by field name.
pub type Fields = BTreeMap<String, String>;

/// HTTP method of an OAuth2 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A fully-formed request, ready to hand to a transport.
pub struct OAuthRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub fields: Fields,
}

/// Merge `base_fields` with `extra_fields` into a request for `endpoint`.
///
/// On a key collision the value from `extra_fields` wins.
pub fn build(method: Method, endpoint: &str, base_fields: Fields, extra_fields: Fields) -> OAuthRequest {
    let mut fields = base_fields;
    fields.extend(extra_fields);

    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string());

    OAuthRequest {
        method,
        url: endpoint.to_string(),
        headers,
        fields,
    }
}

/// Build a `Fields` map from string pairs.
pub fn fields<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl OAuthRequest {
    /// Add an HTTP Basic `Authorization` header for `client_id:client_secret`.
    pub fn with_basic_auth(mut self, client_id: &str, client_secret: &str) -> Self {
        let mut credential = format!("{}:{}", client_id, client_secret);
        let encoded = STANDARD.encode(credential.as_bytes());
        credential.zeroize();
        self.headers
            .insert("Authorization".to_string(), format!("Basic {}", encoded));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The URL to send to. GET requests carry their fields in the query string.
    pub fn target_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url)?;
        if self.method == Method::Get && !self.fields.is_empty() {
            url.query_pairs_mut().extend_pairs(self.fields.iter());
        }
        Ok(url)
    }

    /// The form-encoded body. Empty for GET requests.
    pub fn encoded_body(&self) -> String {
        match self.method {
            Method::Get => String::new(),
            Method::Post => form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.fields.iter())
                .finish(),
        }
    }
}

impl Drop for OAuthRequest {
    fn drop(&mut self) {
        for value in self.fields.values_mut() {
            value.zeroize();
        }
        for value in self.headers.values_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for OAuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |sensitive: &[&str], key: &str, value: &str| -> String {
            if sensitive.iter().any(|s| s.eq_ignore_ascii_case(key)) {
                "[REDACTED]".to_string()
            } else {
                value.to_string()
            }
        };
        let headers: BTreeMap<&str, String> = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), redact(SENSITIVE_HEADERS, k, v)))
            .collect();
        let fields: BTreeMap<&str, String> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), redact(SENSITIVE_FIELDS, k, v)))
            .collect();

        f.debug_struct("OAuthRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("fields", &fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Fields {
        fields([
            ("client_id", "client-123"),
            ("client_secret", "s3cret"),
            ("redirect_uri", "http://localhost:28491/callback"),
            ("scope", "openid offline_access"),
        ])
    }

    #[test]
    fn test_extra_fields_override_base() {
        let mut base = base();
        base.insert("grant_type".to_string(), "authorization_code".to_string());

        let request = build(
            Method::Post,
            "https://login.microsoftonline.com/common/oauth2/token",
            base,
            fields([("refresh_token", "rt"), ("grant_type", "refresh_token")]),
        );

        assert_eq!(request.field("grant_type"), Some("refresh_token"));
        assert_eq!(request.field("refresh_token"), Some("rt"));
        assert_eq!(request.field("client_id"), Some("client-123"));
    }

    #[test]
    fn test_content_type_is_form() {
        let request = build(Method::Post, "https://example.com/token", base(), Fields::new());
        assert_eq!(request.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(request.method.as_str(), "POST");
    }

    #[test]
    fn test_post_body_is_form_encoded() {
        let request = build(
            Method::Post,
            "https://example.com/token",
            fields([("scope", "a b")]),
            fields([("code", "x&y")]),
        );
        assert_eq!(request.encoded_body(), "code=x%26y&scope=a+b");
        assert_eq!(request.target_url().unwrap().as_str(), "https://example.com/token");
    }

    #[test]
    fn test_get_fields_go_to_query() {
        let request = build(
            Method::Get,
            "https://example.com/authorize",
            fields([("client_id", "c")]),
            fields([("response_type", "code"), ("state", "xyz")]),
        );
        assert!(request.encoded_body().is_empty());

        let url = request.target_url().unwrap();
        let pairs: Fields = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(pairs.get("state").map(String::as_str), Some("xyz"));
        assert_eq!(pairs.get("client_id").map(String::as_str), Some("c"));
    }

    #[test]
    fn test_basic_auth_header() {
        let request = build(Method::Post, "https://example.com/token", Fields::new(), Fields::new())
            .with_basic_auth("user", "pass");
        // base64("user:pass")
        assert_eq!(request.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let request = build(
            Method::Post,
            "https://example.com/token",
            base(),
            fields([("refresh_token", "rt-value"), ("grant_type", "refresh_token")]),
        )
        .with_basic_auth("client-123", "s3cret");

        let debug_output = format!("{:?}", request);
        assert!(!debug_output.contains("s3cret"));
        assert!(!debug_output.contains("rt-value"));
        assert!(!debug_output.contains("Basic "));
        assert!(debug_output.contains("client-123"));
        assert!(debug_output.contains("refresh_token"));
    }
}

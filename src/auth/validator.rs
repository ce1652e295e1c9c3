//! Response parsing and validation.

use crate::auth::state::{AuthorizationCode, AuthorizationState};
use crate::auth::transport::RawResponse;
use crate::error::{ParseError, ProviderError, ValidationError};
use serde_json::Value;
use tracing::warn;

/// Parse a response body as JSON.
pub fn parse(response: &RawResponse) -> Result<Value, ParseError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::EmptyBody);
    }
    Ok(serde_json::from_slice(&response.body)?)
}

/// Fail if the provider reported an error, either in the body or through the status code.
pub fn check_provider_error(status: u16, parsed: &Value) -> Result<(), ProviderError> {
    if let Some(error) = parsed.get("error") {
        let error = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let description = parsed
            .get("error_description")
            .and_then(Value::as_str)
            .map(String::from);
        return Err(ProviderError {
            error,
            description,
            status,
        });
    }

    if !(200..300).contains(&status) {
        return Err(ProviderError {
            error: format!("http_{}", status),
            description: None,
            status,
        });
    }

    Ok(())
}

/// Check the echoed `state` and the consent flag, yielding the authorization code.
///
/// Consumes `expected` so the nonce cannot be reused, whatever the outcome.
pub fn verify_state(
    parsed: &Value,
    expected: AuthorizationState,
) -> Result<AuthorizationCode, ValidationError> {
    verify(parsed, expected, true)
}

/// Like [`verify_state`], without requiring `admin_consent`.
///
/// For user-consent redirects from `/authorize`, which never carry the flag.
pub fn verify_state_only(
    parsed: &Value,
    expected: AuthorizationState,
) -> Result<AuthorizationCode, ValidationError> {
    verify(parsed, expected, false)
}

fn verify(
    parsed: &Value,
    expected: AuthorizationState,
    require_consent: bool,
) -> Result<AuthorizationCode, ValidationError> {
    let returned = parsed.get("state").and_then(Value::as_str).unwrap_or("");
    let state_ok = expected.matches(returned);
    drop(expected);

    if !state_ok {
        warn!("Authorization response state does not match the request");
        return Err(ValidationError::StateMismatch);
    }

    if require_consent && !consent_granted(parsed.get("admin_consent")) {
        warn!("Authorization response did not grant consent");
        return Err(ValidationError::ConsentDenied);
    }

    match parsed.get("code").and_then(Value::as_str) {
        Some(code) if !code.is_empty() => Ok(AuthorizationCode::new(code)),
        _ => Err(ValidationError::MissingCode),
    }
}

/// Azure echoes `admin_consent=True` in query strings and `true` in JSON.
fn consent_granted(flag: Option<&Value>) -> bool {
    match flag {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

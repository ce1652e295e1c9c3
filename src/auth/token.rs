//! Token payloads returned by the token endpoint, and expiry helpers.

use crate::secure::SecureString;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};

/// Token response from Azure AD.
///
/// Handed to the caller, who owns persistence. The client never keeps a copy.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: SecureString,
    #[serde(default)]
    pub refresh_token: Option<SecureString>,
    /// Lifetime of the access token in seconds.
    #[serde(default, deserialize_with = "flexible_seconds")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "flexible_seconds")]
    pub ext_expires_in: Option<u64>,
    #[serde(default)]
    pub id_token: Option<SecureString>,
}

impl TokenResponse {
    /// When the access token expires, given when it was issued.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.expires_in?).ok()?;
        issued_at.checked_add_signed(Duration::seconds(secs))
    }
}

/// The v1 endpoint sends `"3599"`, the v2 endpoint sends `3599`.
fn flexible_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid seconds value: {:?}", s))),
    }
}

/// Calculate the remaining time until token expiry.
pub fn time_until_expiry(expiry_str: &str) -> Option<Duration> {
    let expiry: DateTime<Utc> = expiry_str.parse().ok()?;
    let now = Utc::now();

    if expiry > now {
        Some(expiry - now)
    } else {
        None
    }
}

/// Format duration as human-readable string (e.g., "45 min", "1 hour").
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();

    if total_minutes < 1 {
        "< 1 min".to_string()
    } else if total_minutes < 60 {
        format!("{} min", total_minutes)
    } else {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_response() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "User.Read"
        }))
        .unwrap();

        assert_eq!(token.access_token.as_str(), "at");
        assert_eq!(token.refresh_token.as_ref().map(SecureString::as_str), Some("rt"));
        assert_eq!(token.expires_in, Some(3599));
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
        assert_eq!(token.scope.as_deref(), Some("User.Read"));
    }

    #[test]
    fn test_minimal_response() {
        let token: TokenResponse = serde_json::from_value(json!({"access_token": "at"})).unwrap();
        assert!(token.refresh_token.is_none());
        assert!(token.expires_in.is_none());
        assert!(token.token_type.is_none());
    }

    #[test]
    fn test_string_expires_in() {
        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "at", "expires_in": "3599"})).unwrap();
        assert_eq!(token.expires_in, Some(3599));

        let result = serde_json::from_value::<TokenResponse>(
            json!({"access_token": "at", "expires_in": "soon"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_access_token_is_rejected() {
        let result = serde_json::from_value::<TokenResponse>(json!({"token_type": "Bearer"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "secret-at", "refresh_token": "secret-rt"}))
                .unwrap();
        let debug_output = format!("{:?}", token);
        assert!(!debug_output.contains("secret-at"));
        assert!(!debug_output.contains("secret-rt"));
    }

    #[test]
    fn test_expires_at() {
        let token: TokenResponse =
            serde_json::from_value(json!({"access_token": "at", "expires_in": 3600})).unwrap();
        let issued = Utc::now();
        assert_eq!(token.expires_at(issued), Some(issued + Duration::hours(1)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(30)), "< 1 min");
        assert_eq!(format_duration(Duration::minutes(5)), "5 min");
        assert_eq!(format_duration(Duration::hours(1)), "1 hour");
        assert_eq!(format_duration(Duration::hours(2)), "2 hours");
        assert_eq!(format_duration(Duration::minutes(90)), "1h 30m");
    }

    #[test]
    fn test_time_until_expiry() {
        let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
        let duration = time_until_expiry(&future);
        assert!(duration.is_some());
        assert!(duration.unwrap().num_minutes() > 55);

        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        assert!(time_until_expiry(&past).is_none());
    }
}

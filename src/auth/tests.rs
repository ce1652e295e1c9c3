//! End-to-end tests of the client over real HTTP against a mock authority.

mod integration_tests {
    use crate::auth::{OAuth2Client, TransportOptions};
    use crate::config::ClientConfig;
    use crate::error::{AuthError, FlowError};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    async fn setup_mock_authority() -> (MockServer, OAuth2Client) {
        let server = MockServer::start().await;

        let config = ClientConfig::new("mock_client_id", "mock_secret", "http://localhost:3000/callback")
            .unwrap()
            .with_tenant("contoso")
            .unwrap()
            .with_scope("openid offline_access")
            .with_templates(
                format!("{}/{{tenant}}/oauth2/authorize", server.uri()),
                format!("{}/{{tenant}}/oauth2/token", server.uri()),
            );
        let client = OAuth2Client::with_http(config, &TransportOptions::default()).unwrap();

        (server, client)
    }

    /// Echoes the `state` query parameter back with a granted admin consent.
    struct ConsentResponder;

    impl Respond for ConsentResponder {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let state = request
                .url
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "mock_auth_code",
                "state": state,
                "admin_consent": "True"
            }))
        }
    }

    #[tokio::test]
    async fn test_full_authorization_code_flow() {
        let (server, client) = setup_mock_authority().await;

        Mock::given(method("GET"))
            .and(path("/contoso/oauth2/authorize"))
            .and(query_param("response_type", "code"))
            .and(query_param("client_id", "mock_client_id"))
            .respond_with(ConsentResponder)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/token"))
            .and(header("Content-Type", "application/x-www-form-urlencoded;charset=UTF-8"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=mock_auth_code"))
            .and(body_string_contains("client_secret=mock_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "expires_in": "3599",
                "refresh_token": "mock_refresh_token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=mock_refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mock_access_token_2",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let code = client.get_authorization_code().await.unwrap();
        assert_eq!(code.as_str(), "mock_auth_code");

        let token = client.get_access_token(code.as_str()).await.unwrap();
        assert_eq!(token.access_token.as_str(), "mock_access_token");
        assert_eq!(token.expires_in, Some(3599));

        let refresh_token = token.refresh_token.as_ref().unwrap();
        let renewed = client.refresh_access_token(refresh_token.as_str()).await.unwrap();
        assert_eq!(renewed.access_token.as_str(), "mock_access_token_2");
        assert!(renewed.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_forged_state_never_reaches_token_endpoint() {
        let (server, client) = setup_mock_authority().await;

        Mock::given(method("GET"))
            .and(path("/contoso/oauth2/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "mock_auth_code",
                "state": "attacker_state",
                "admin_consent": true
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client.get_authorization_code().await.unwrap_err();
        assert!(err.is_state_mismatch());
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_over_http() {
        let (server, client) = setup_mock_authority().await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS700082: The refresh token has expired"
            })))
            .mount(&server)
            .await;

        let err = client.refresh_access_token("expired").await.unwrap_err();
        let provider = err.provider_error().unwrap();
        assert_eq!(provider.error, "invalid_grant");
        assert_eq!(provider.status, 400);
        assert!(matches!(err, AuthError::TokenRefresh(FlowError::Provider(_))));
    }

    #[tokio::test]
    async fn test_slow_authority_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ClientConfig::new("id", "secret", "http://localhost/cb")
            .unwrap()
            .with_templates(
                format!("{}/{{tenant}}/oauth2/authorize", server.uri()),
                format!("{}/{{tenant}}/oauth2/token", server.uri()),
            );
        let options = TransportOptions {
            timeout: Duration::from_millis(100),
            ..TransportOptions::default()
        };
        let client = OAuth2Client::with_http(config, &options).unwrap();

        let err = client.get_access_token("abc123").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExchange(FlowError::Transport(_))));
    }

    #[tokio::test]
    async fn test_unreachable_authority_is_transport_error() {
        let config = ClientConfig::new("id", "secret", "http://localhost/cb")
            .unwrap()
            .with_templates(
                "http://127.0.0.1:9/{tenant}/oauth2/authorize",
                "http://127.0.0.1:9/{tenant}/oauth2/token",
            );
        let client = OAuth2Client::with_http(config, &TransportOptions::default()).unwrap();

        let err = client.refresh_access_token("rt").await.unwrap_err();
        assert!(err.transport_error().is_some());
    }
}

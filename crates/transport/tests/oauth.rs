use serde_json::json;
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use transport::{OAuthClient, OAuthError};
use verve::{ClientAuthentication, SecretString, ServiceConfig};

fn config(server: &MockServer) -> ServiceConfig {
    ServiceConfig::apiverve().with_oauth_endpoints(
        format!("{}/authorize", server.uri()),
        format!("{}/token", server.uri()),
    )
}

#[tokio::test]
async fn exchanges_code_with_basic_client_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(basic_auth("n8n", "avs_n8n_k9m3d7g4l1n8s2f6"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OAuthClient::new(&config(&server)).unwrap();
    let tokens = client
        .exchange_code("code-123", "http://localhost:5678/callback")
        .await
        .unwrap();

    assert_eq!(tokens.access_token.expose(), "access-1");
    assert_eq!(
        tokens.refresh_token.as_ref().map(SecretString::expose),
        Some("refresh-1")
    );
    assert!(!tokens.is_expired());
}

#[tokio::test]
async fn body_client_auth_sends_credentials_as_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("client_id=n8n"))
        .and(body_string_contains("client_secret=avs_n8n_k9m3d7g4l1n8s2f6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "a" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.oauth.client_authentication = ClientAuthentication::Body;
    let client = OAuthClient::new(&config).unwrap();

    let tokens = client.refresh("refresh-1").await.unwrap();
    assert_eq!(tokens.access_token.expose(), "a");
    assert_eq!(tokens.expires_at, None);
    assert_eq!(
        tokens.refresh_token.as_ref().map(SecretString::expose),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn rejected_code_reports_endpoint_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(&config(&server)).unwrap();
    let err = client
        .exchange_code("used-code", "http://localhost/cb")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OAuthError::TokenEndpoint {
            status: 400,
            message: "invalid_grant".into()
        }
    );
}

#[tokio::test]
async fn response_without_access_token_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(&config(&server)).unwrap();
    let err = client.refresh("r").await.unwrap_err();
    assert!(matches!(err, OAuthError::InvalidTokenResponse(_)));
}

#[tokio::test]
async fn out_of_range_lifetime_leaves_expiry_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a",
            "expires_in": 9_000_000_000_000_000_i64
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(&config(&server)).unwrap();
    let tokens = client
        .exchange_code("code-123", "http://localhost/cb")
        .await
        .unwrap();

    assert_eq!(tokens.access_token.expose(), "a");
    assert_eq!(tokens.expires_at, None);
    assert!(!tokens.is_expired());
}

#[tokio::test]
async fn exchanged_tokens_are_redacted_in_debug_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-secret",
            "refresh_token": "refresh-secret"
        })))
        .mount(&server)
        .await;

    let client = OAuthClient::new(&config(&server)).unwrap();
    let tokens = client.exchange_code("c", "http://localhost/cb").await.unwrap();

    let rendered = format!("{tokens:?}");
    assert!(!rendered.contains("access-secret"));
    assert!(!rendered.contains("refresh-secret"));
}

//! reqwest implementation of [`AuthenticatedHttpClient`].

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use verve::{
    AuthenticatedHttpClient, CredentialName, HttpMethod, RequestSpec, ServiceConfig,
    TransportError,
};

use crate::{ClientError, OAuthClient, OAuthError, TokenSet};

/// Sends node requests to APIVerve with an OAuth2 bearer token.
///
/// Holds the token set for exactly one credential. The token is refreshed
/// before sending when it is known to be expired, and once more if the API
/// answers `401 Unauthorized`; the request is then replayed a single time.
pub struct ApiVerveClient {
    http: reqwest::Client,
    base_url: Url,
    credential: CredentialName,
    oauth: OAuthClient,
    // Held across a refresh so concurrent callers do not refresh twice.
    tokens: Mutex<TokenSet>,
}

impl ApiVerveClient {
    /// # Errors
    ///
    /// [`ClientError`] if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ServiceConfig, tokens: TokenSet) -> Result<Self, ClientError> {
        let endpoints = config.endpoints()?;
        let credential = config.credential_name()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        let oauth = OAuthClient::with_http(http.clone(), config)?;

        Ok(Self {
            http,
            base_url: endpoints.base,
            credential,
            oauth,
            tokens: Mutex::new(tokens),
        })
    }

    /// The current token set, including any refreshed tokens.
    pub async fn tokens(&self) -> TokenSet {
        self.tokens.lock().await.clone()
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| TransportError::network(format!("Invalid request URL '{joined}': {e}")))
    }

    /// Returns an access token, refreshing first if it is known to be expired.
    async fn access_token(&self) -> Result<String, TransportError> {
        let current = self.tokens.lock().await.clone();
        if current.is_expired() {
            debug!("Access token expired; refreshing before request");
            return self.refresh(current.access_token.expose()).await;
        }
        Ok(current.access_token.expose().to_string())
    }

    /// Replaces `stale` with a fresh access token.
    ///
    /// If another caller already replaced it, the newer token is returned
    /// without contacting the token endpoint.
    async fn refresh(&self, stale: &str) -> Result<String, TransportError> {
        let mut tokens = self.tokens.lock().await;
        if tokens.access_token.expose() != stale {
            return Ok(tokens.access_token.expose().to_string());
        }
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or(OAuthError::MissingRefreshToken)?;

        let fresh = self.oauth.refresh(refresh_token.expose()).await.map_err(|e| {
            warn!(error = %e, credential = %self.credential, "Token refresh failed");
            TransportError::from(e)
        })?;
        debug!(credential = %self.credential, "Access token refreshed");
        let access_token = fresh.access_token.expose().to_string();
        *tokens = fresh;
        Ok(access_token)
    }

    async fn send(
        &self,
        url: &Url,
        request: &RequestSpec,
        access_token: &str,
    ) -> Result<reqwest::Response, TransportError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
        };
        let mut builder = self
            .http
            .request(method, url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json");
        if let Some(query) = request.query.as_ref().filter(|q| !q.is_empty()) {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::network(format!("Request to {url} timed out"))
            } else {
                TransportError::network(e.to_string())
            }
        })
    }
}

#[async_trait]
impl AuthenticatedHttpClient for ApiVerveClient {
    #[instrument(
        name = "apiverve.http",
        skip_all,
        fields(method = %request.method, path = %request.path, status = tracing::field::Empty)
    )]
    async fn request(
        &self,
        credential: &CredentialName,
        request: &RequestSpec,
    ) -> Result<Value, TransportError> {
        if credential != &self.credential {
            return Err(TransportError::authentication(format!(
                "No credentials of type '{credential}' are configured"
            )));
        }

        let url = self.url_for(&request.path)?;
        let access_token = self.access_token().await?;
        let mut response = self.send(&url, request, &access_token).await?;

        let can_refresh = self.tokens.lock().await.can_refresh();
        if response.status() == StatusCode::UNAUTHORIZED && can_refresh {
            debug!("API rejected access token; refreshing and replaying once");
            let fresh = self.refresh(&access_token).await?;
            response = self.send(&url, request, &fresh).await?;
        }

        tracing::Span::current().record("status", response.status().as_u16());
        read_json(response).await
    }
}

/// Decodes a response body, mapping error statuses to [`TransportError::Status`].
async fn read_json(response: reqwest::Response) -> Result<Value, TransportError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::network(e.to_string()))?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&body).map_err(|e| TransportError::Decode {
        message: format!("Response body is not valid JSON: {e}"),
    })
}

/// APIVerve error bodies look like `{"status":"error","error":"...","data":null}`.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_body_text() {
        let body = br#"{"status":"error","error":"Invalid API key","data":null}"#;
        assert_eq!(error_message(StatusCode::FORBIDDEN, body), "Invalid API key");
    }

    #[test]
    fn error_message_falls_back_to_reason_phrase() {
        assert_eq!(error_message(StatusCode::NOT_FOUND, b"<html>"), "Not Found");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, br#"{"status":"error"}"#),
            "Bad Gateway"
        );
    }

    #[test]
    fn paths_are_joined_onto_base_url_prefix() {
        let config = ServiceConfig::apiverve().with_base_url("http://localhost:9000/proxy/");
        let client = ApiVerveClient::new(&config, TokenSet::new("t")).unwrap();
        let url = client.url_for("/v1/n8n/analytics").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/proxy/v1/n8n/analytics");
    }
}

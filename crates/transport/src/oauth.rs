//! OAuth2 authorization-code flow against the fixed APIVerve endpoints.
//!
//! Covers the three token-endpoint interactions the integration needs:
//! building the authorization URL the user visits, exchanging the returned
//! code, and refreshing an expired access token.

use chrono::{TimeDelta, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use verve::{ClientAuthentication, OAuthConfig, SecretString, ServiceConfig};

use crate::{ClientError, OAuthError, TokenSet};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Talks to the authorization server on behalf of the configured client.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
    authorization_url: Url,
    token_url: Url,
}

impl OAuthClient {
    /// Builds a client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// [`ClientError`] if an endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Self::with_http(http, config)
    }

    /// Builds a client sharing an existing HTTP connection pool.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] if an endpoint URL is invalid.
    pub fn with_http(http: reqwest::Client, config: &ServiceConfig) -> Result<Self, ClientError> {
        let endpoints = config.endpoints()?;
        Ok(Self {
            http,
            config: config.oauth.clone(),
            authorization_url: endpoints.authorization,
            token_url: endpoints.token,
        })
    }

    /// The URL the user opens to grant access.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("scope", &self.config.scope)
                .append_pair("state", state);
            for (key, value) in
                url::form_urlencoded::parse(self.config.auth_query_parameters.as_bytes())
            {
                query.append_pair(&key, &value);
            }
        }
        url
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// [`OAuthError`] if the endpoint is unreachable, rejects the code, or
    /// answers without an access token.
    #[instrument(name = "oauth.exchange_code", skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, OAuthError> {
        self.request_token(vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ])
        .await
    }

    /// Obtains a fresh access token.
    ///
    /// When the server does not rotate the refresh token, the one passed in is
    /// kept on the returned [`TokenSet`].
    ///
    /// # Errors
    ///
    /// [`OAuthError`] if the endpoint is unreachable or rejects the grant.
    #[instrument(name = "oauth.refresh", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, OAuthError> {
        let mut tokens = self
            .request_token(vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token.to_string()),
            ])
            .await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(SecretString::new(refresh_token));
        }
        Ok(tokens)
    }

    async fn request_token(
        &self,
        mut form: Vec<(&'static str, String)>,
    ) -> Result<TokenSet, OAuthError> {
        let mut request = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json");
        match self.config.client_authentication {
            ClientAuthentication::Header => {
                request = request.basic_auth(
                    &self.config.client_id,
                    Some(self.config.client_secret.expose()),
                );
            }
            ClientAuthentication::Body => {
                form.push(("client_id", self.config.client_id.clone()));
                form.push(("client_secret", self.config.client_secret.expose().to_string()));
            }
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| OAuthError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = token_error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
            return Err(OAuthError::TokenEndpoint {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| OAuthError::InvalidTokenResponse(e.to_string()))?;
        debug!(
            expires_in = parsed.expires_in,
            rotated_refresh_token = parsed.refresh_token.is_some(),
            "Token endpoint issued access token"
        );

        // A lifetime past the representable date range counts as unknown.
        Ok(TokenSet {
            access_token: SecretString::new(parsed.access_token),
            refresh_token: parsed.refresh_token.map(SecretString::new),
            expires_at: parsed
                .expires_in
                .and_then(TimeDelta::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime)),
        })
    }
}

/// RFC 6749 error responses carry `error` and optionally `error_description`.
fn token_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("error_description")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_fixed_client_settings() {
        let client = OAuthClient::new(&ServiceConfig::apiverve()).unwrap();
        let url = client.authorization_url("http://localhost:5678/callback", "xyz");

        assert_eq!(url.host_str(), Some("api.apiverve.com"));
        assert_eq!(url.path(), "/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("client_id".into(), "n8n".into())));
        assert!(pairs.contains(&("scope".into(), "apiverve:full".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://localhost:5678/callback".into()
        )));
    }

    #[test]
    fn extra_authorization_parameters_are_appended() {
        let mut config = ServiceConfig::apiverve();
        config.oauth.auth_query_parameters = "prompt=consent&access_type=offline".into();
        let client = OAuthClient::new(&config).unwrap();

        let url = client.authorization_url("http://localhost/cb", "s");
        let query = url.query().unwrap();
        assert!(query.ends_with("prompt=consent&access_type=offline"));
    }

    #[test]
    fn token_error_prefers_description() {
        let body = br#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#;
        assert_eq!(token_error_message(body).as_deref(), Some("Refresh token revoked"));
        assert_eq!(token_error_message(b"not json"), None);
    }
}

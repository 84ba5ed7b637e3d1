//! Immutable service configuration.
//!
//! The APIVerve integration is not a general OAuth2 credential: the
//! authorization and token endpoints, client identity and scope are fixed.
//! They are gathered in one [`ServiceConfig`] value built at startup and handed
//! to the transport, so tests can point the whole stack at a mock server by
//! constructing a different value.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{CredentialName, SecretString};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.apiverve.com";

/// Name under which the OAuth2 credential is stored.
pub const CREDENTIAL_NAME: &str = "apiVerveOAuth2Api";

const AUTHORIZATION_URL: &str = "https://api.apiverve.com/authorize";
const TOKEN_URL: &str = "https://api.apiverve.com/token";
const CLIENT_ID: &str = "n8n";
// Shared by every installation of the integration. See DESIGN.md, open questions.
const CLIENT_SECRET: &str = "avs_n8n_k9m3d7g4l1n8s2f6";
const SCOPE: &str = "apiverve:full";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The configuration value cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid credential name '{0}'")]
    InvalidCredentialName(String),
}

// ---------------------------------------------------------------------------
// OAuth2
// ---------------------------------------------------------------------------

/// How the client authenticates itself to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthentication {
    /// `Authorization: Basic` header built from client id and secret.
    Header,
    /// `client_id` and `client_secret` form fields.
    Body,
}

/// OAuth2 authorization-code settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scope: String,
    /// Extra query string appended to the authorization URL (without `?`).
    pub auth_query_parameters: String,
    pub client_authentication: ClientAuthentication,
}

impl OAuthConfig {
    /// The fixed APIVerve settings.
    pub fn apiverve() -> Self {
        Self {
            authorization_url: AUTHORIZATION_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            client_id: CLIENT_ID.to_string(),
            client_secret: SecretString::new(CLIENT_SECRET),
            scope: SCOPE.to_string(),
            auth_query_parameters: String::new(),
            client_authentication: ClientAuthentication::Header,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Everything the transport needs to reach and authenticate against APIVerve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub credential: String,
    pub oauth: OAuthConfig,
    /// Per-request timeout applied by the transport.
    pub timeout: Duration,
}

impl ServiceConfig {
    /// The production configuration.
    pub fn apiverve() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: CREDENTIAL_NAME.to_string(),
            oauth: OAuthConfig::apiverve(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replaces the API host, keeping every other setting.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replaces the OAuth2 authorization and token endpoints.
    pub fn with_oauth_endpoints(
        mut self,
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.oauth.authorization_url = authorization_url.into();
        self.oauth.token_url = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured credential name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidCredentialName`] if the name is blank.
    pub fn credential_name(&self) -> Result<CredentialName, ConfigError> {
        CredentialName::new(self.credential.clone())
            .ok_or_else(|| ConfigError::InvalidCredentialName(self.credential.clone()))
    }

    /// Parses and validates every URL in the configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] naming the first field that does not parse
    /// as an absolute `http`/`https` URL.
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        Ok(Endpoints {
            base: parse_url("base URL", &self.base_url)?,
            authorization: parse_url("authorization URL", &self.oauth.authorization_url)?,
            token: parse_url("token URL", &self.oauth.token_url)?,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::apiverve()
    }
}

/// Parsed endpoints of a [`ServiceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub base: Url,
    pub authorization: Url,
    pub token: Url,
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

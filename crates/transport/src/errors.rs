//! Error types for the transport adapter.
//!
//! Failures of an individual API call are reported as
//! [`verve::TransportError`] through the port trait. The types here cover
//! construction of the client and the OAuth2 token endpoint, which the CLI
//! also drives directly.

use thiserror::Error;
use verve::{ConfigError, TransportError};

/// The client could not be constructed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// A token-endpoint interaction failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// The token endpoint could not be reached.
    #[error("Token request failed: {0}")]
    Request(String),

    /// The token endpoint rejected the grant.
    #[error("Token endpoint returned status {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    /// The token endpoint answered with something other than a token.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// The access token expired and there is nothing to refresh it with.
    #[error("Access token expired and no refresh token is available")]
    MissingRefreshToken,
}

impl From<OAuthError> for TransportError {
    fn from(err: OAuthError) -> Self {
        TransportError::authentication(err.to_string())
    }
}

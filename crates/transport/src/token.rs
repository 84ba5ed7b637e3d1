//! OAuth2 token material.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use verve::SecretString;

/// A token is treated as expired this long before its advertised expiry, so a
/// request never leaves with a token that lapses in flight.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Access and refresh tokens for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: SecretString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<SecretString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// A bare access token with unknown expiry.
    pub fn new(access_token: impl Into<SecretString>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<SecretString>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns `true` if the access token is known to be expired, or about to be.
    ///
    /// A token without an expiry is assumed valid until the API says otherwise.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            Utc::now() + TimeDelta::seconds(EXPIRY_SKEW_SECS) >= expires_at
        })
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_is_never_expired() {
        assert!(!TokenSet::new("abc").is_expired());
    }

    #[test]
    fn token_inside_skew_window_counts_as_expired() {
        let soon = Utc::now() + TimeDelta::seconds(5);
        assert!(TokenSet::new("abc").with_expiry(soon).is_expired());

        let later = Utc::now() + TimeDelta::seconds(3600);
        assert!(!TokenSet::new("abc").with_expiry(later).is_expired());
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", TokenSet::new("secret-access").with_refresh_token("secret-refresh"));
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }
}

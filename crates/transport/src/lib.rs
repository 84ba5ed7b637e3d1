//! APIVerve authenticated HTTP transport.
//!
//! Implements the [`verve::AuthenticatedHttpClient`] trait over `reqwest`,
//! attaching an OAuth2 bearer token to every request and refreshing it
//! against the fixed APIVerve token endpoint when it expires.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL joining, token attachment and refresh, timeouts,
//! and response decoding all live here. The [`verve`] and `nodes` crates see
//! only [`verve::AuthenticatedHttpClient`].
//!
//! ## Credential Flow
//!
//! The integration uses the OAuth2 authorization-code grant. [`OAuthClient`]
//! builds the authorization URL and exchanges the returned code for a
//! [`TokenSet`]; [`ApiVerveClient`] then owns that token set for the lifetime
//! of the process.

mod client;
mod errors;
mod oauth;
mod token;

pub use client::ApiVerveClient;
pub use errors::{ClientError, OAuthError};
pub use oauth::OAuthClient;
pub use token::TokenSet;

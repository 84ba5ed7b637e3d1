//! Error types for the APIVerve node domain.
//!
//! Two classes of failure reach the caller:
//!
//! - **Validation** — the user-supplied parameters are unusable (malformed
//!   JSON, missing identifier, unknown resource/operation). Always detected
//!   before any network call for the affected item.
//! - **Transport** — produced by the [`crate::AuthenticatedHttpClient`]
//!   collaborator: HTTP error statuses, network failures, authentication
//!   failures, undecodable bodies.
//!
//! Both are surfaced identically; [`NodeError::is_validation`] tells them apart
//! when a caller needs to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemIndex, Parameter, Resource};

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure raised by the authenticated HTTP collaborator.
///
/// The `Display` form of every variant is what ends up in the `error` field
/// of a captured failure record, so it stays close to the upstream message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransportError {
    /// The API answered with a non-success status.
    #[error("Request failed with status code {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body, or the canonical reason phrase.
        message: String,
    },

    /// The request never produced a response (connect failure, timeout, TLS).
    #[error("{message}")]
    Network { message: String },

    /// No usable bearer token could be obtained for the credential.
    #[error("{message}")]
    Authentication { message: String },

    /// The response body was not valid JSON.
    #[error("{message}")]
    Decode { message: String },
}

impl TransportError {
    /// Convenience constructor for [`TransportError::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        TransportError::Network {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`TransportError::Authentication`].
    pub fn authentication(message: impl Into<String>) -> Self {
        TransportError::Authentication {
            message: message.into(),
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node errors
// ---------------------------------------------------------------------------

/// Errors produced while resolving or executing one item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// A JSON parameter could not be parsed.
    #[error("{message}")]
    Validation {
        /// The parameter whose value was malformed.
        parameter: Parameter,
        /// Human-readable description, e.g. `"Invalid JSON in parameters"`.
        message: String,
    },

    /// A required identifier parameter was absent or empty.
    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: Parameter },

    /// The `resource` parameter does not name a known resource.
    #[error("The resource '{resource}' is not known")]
    UnknownResource { resource: String },

    /// The `operation` parameter is not valid for the selected resource.
    #[error("The operation '{operation}' is not supported for resource '{resource}'")]
    UnsupportedOperation {
        resource: Resource,
        operation: String,
    },

    /// The authenticated HTTP call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl NodeError {
    /// Convenience constructor for [`NodeError::Validation`].
    pub fn validation(parameter: Parameter, message: impl Into<String>) -> Self {
        NodeError::Validation {
            parameter,
            message: message.into(),
        }
    }

    /// Returns `true` for malformed-input errors, `false` for transport failures.
    pub fn is_validation(&self) -> bool {
        !matches!(self, NodeError::Transport(_))
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// A per-item error that aborted a run because failures were not tolerated.
///
/// Items after `item_index` were never dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source} [item {item_index}]")]
pub struct ExecutionError {
    /// The item whose processing failed.
    pub item_index: ItemIndex,
    /// The underlying failure.
    pub source: NodeError,
}

//! Core domain for the APIVerve node.
//!
//! This crate contains the data model, the request dispatcher, the service
//! configuration value, and the port traits the node depends on.
//! Infrastructure crates implement the traits defined here; they never add
//! dispatch rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* request each operation needs; the `transport` crate
//! defines *how* it is sent.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ApiId`, `BinId`, `ItemIndex`, etc.) |
//! | [`types`] | Resources, operations, requests, items, result records |
//! | [`errors`] | Validation, transport and run-level error types |
//! | [`secret`] | `SecretString` for client secrets and tokens |
//! | [`config`] | Fixed OAuth2 and endpoint configuration |
//! | [`ports`] | `AuthenticatedHttpClient` and `ParameterAccessor` |
//! | [`dispatch`] | (resource, operation) → request resolution |

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod secret;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    ClientAuthentication, ConfigError, Endpoints, OAuthConfig, ServiceConfig, CREDENTIAL_NAME,
    DEFAULT_BASE_URL,
};
pub use dispatch::{coerce_to_string, dispatch, API_LIST_PATH};
pub use errors::{ExecutionError, NodeError, TransportError};
pub use identifiers::{ApiId, BinId, CredentialName, ItemIndex, RunId};
pub use ports::{AuthenticatedHttpClient, NodeParameters, ParameterAccessor};
pub use secret::SecretString;
pub use types::{
    AnalyticsOperation, ApiDescriptor, ApiOperation, ApiOption, HttpMethod, Item,
    JsonBinOperation, NodeOperation, PairedItem, Parameter, RequestSpec, Resource, ResultRecord,
};

//! Port traits implemented outside this crate.
//!
//! The node needs two collaborators from its surroundings: something that
//! performs an authenticated HTTP call, and something that resolves the
//! parameter values the user configured. Infrastructure crates implement
//! these; the domain only depends on the traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CredentialName, ItemIndex, Parameter, RequestSpec, TransportError};

// ---------------------------------------------------------------------------
// Authenticated transport
// ---------------------------------------------------------------------------

/// Performs one HTTP request on behalf of a stored credential.
///
/// Implementations attach the bearer token (refreshing it if needed), join the
/// request path onto their configured base URL, and return the decoded JSON
/// body. Callers never see tokens or connection state.
#[async_trait]
pub trait AuthenticatedHttpClient: Send + Sync {
    /// Sends `request` authenticated as `credential`.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]: error status, network failure, missing or
    /// unrefreshable token, or an undecodable body.
    async fn request(
        &self,
        credential: &CredentialName,
        request: &RequestSpec,
    ) -> Result<Value, TransportError>;
}

// ---------------------------------------------------------------------------
// Parameter resolution
// ---------------------------------------------------------------------------

/// Resolves the value of a node parameter for one item.
///
/// Returns `None` when the parameter is not set; the dispatcher applies its own
/// defaults.
pub trait ParameterAccessor: Send + Sync {
    fn get(&self, parameter: Parameter, item: ItemIndex) -> Option<Value>;
}

/// Parameters fixed for the whole run, with optional per-item overrides.
#[derive(Debug, Clone, Default)]
pub struct NodeParameters {
    values: HashMap<Parameter, Value>,
    overrides: HashMap<(ItemIndex, Parameter), Value>,
}

impl NodeParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value used for every item.
    pub fn with(mut self, parameter: Parameter, value: impl Into<Value>) -> Self {
        self.values.insert(parameter, value.into());
        self
    }

    /// Overrides the value for a single item.
    pub fn with_item(
        mut self,
        item: ItemIndex,
        parameter: Parameter,
        value: impl Into<Value>,
    ) -> Self {
        self.overrides.insert((item, parameter), value.into());
        self
    }
}

impl ParameterAccessor for NodeParameters {
    fn get(&self, parameter: Parameter, item: ItemIndex) -> Option<Value> {
        self.overrides
            .get(&(item, parameter))
            .or_else(|| self.values.get(&parameter))
            .cloned()
    }
}

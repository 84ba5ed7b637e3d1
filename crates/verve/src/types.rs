//! Shared value types for the APIVerve node.
//!
//! The (resource, operation) pair arrives from the host as two strings. It is
//! parsed once into a [`NodeOperation`], a tagged variant whose shape makes
//! every invalid combination unrepresentable. Everything downstream of the
//! parse matches on it exhaustively.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{ApiId, ItemIndex, NodeError};

// ---------------------------------------------------------------------------
// Resources and operations
// ---------------------------------------------------------------------------

/// Top-level grouping of node operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Execute or list the upstream utility APIs.
    Api,
    /// Read and write JSON storage bins.
    #[serde(rename = "jsonbin")]
    JsonBin,
    /// Usage statistics for the authenticated account.
    Analytics,
}

impl Resource {
    /// Wire name used by the host for this resource.
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Api => "api",
            Resource::JsonBin => "jsonbin",
            Resource::Analytics => "analytics",
        }
    }
}

impl FromStr for Resource {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Resource::Api),
            "jsonbin" => Ok(Resource::JsonBin),
            "analytics" => Ok(Resource::Analytics),
            other => Err(NodeError::UnknownResource {
                resource: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations of the [`Resource::Api`] resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Call one upstream API with user-supplied query parameters.
    Execute,
    /// List every API available to the account.
    List,
}

/// Operations of the [`Resource::JsonBin`] resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonBinOperation {
    List,
    Get,
    Update,
}

/// Operations of the [`Resource::Analytics`] resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsOperation {
    GetUsage,
}

/// A validated (resource, operation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOperation {
    Api(ApiOperation),
    JsonBin(JsonBinOperation),
    Analytics(AnalyticsOperation),
}

impl NodeOperation {
    /// Parses the host's `resource` and `operation` strings.
    ///
    /// # Errors
    ///
    /// [`NodeError::UnknownResource`] if `resource` is not recognised, or
    /// [`NodeError::UnsupportedOperation`] if `operation` is not valid for it.
    pub fn parse(resource: &str, operation: &str) -> Result<Self, NodeError> {
        let resource: Resource = resource.parse()?;
        let parsed = match (resource, operation) {
            (Resource::Api, "execute") => NodeOperation::Api(ApiOperation::Execute),
            (Resource::Api, "list") => NodeOperation::Api(ApiOperation::List),
            (Resource::JsonBin, "list") => NodeOperation::JsonBin(JsonBinOperation::List),
            (Resource::JsonBin, "get") => NodeOperation::JsonBin(JsonBinOperation::Get),
            (Resource::JsonBin, "update") => NodeOperation::JsonBin(JsonBinOperation::Update),
            (Resource::Analytics, "getUsage") => {
                NodeOperation::Analytics(AnalyticsOperation::GetUsage)
            }
            (resource, other) => {
                return Err(NodeError::UnsupportedOperation {
                    resource,
                    operation: other.to_string(),
                })
            }
        };
        Ok(parsed)
    }

    /// The resource this operation belongs to.
    pub fn resource(self) -> Resource {
        match self {
            NodeOperation::Api(_) => Resource::Api,
            NodeOperation::JsonBin(_) => Resource::JsonBin,
            NodeOperation::Analytics(_) => Resource::Analytics,
        }
    }

    /// Wire name of the operation within its resource.
    pub fn operation_name(self) -> &'static str {
        match self {
            NodeOperation::Api(ApiOperation::Execute) => "execute",
            NodeOperation::Api(ApiOperation::List) => "list",
            NodeOperation::JsonBin(JsonBinOperation::List) => "list",
            NodeOperation::JsonBin(JsonBinOperation::Get) => "get",
            NodeOperation::JsonBin(JsonBinOperation::Update) => "update",
            NodeOperation::Analytics(AnalyticsOperation::GetUsage) => "getUsage",
        }
    }
}

impl std::fmt::Display for NodeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.resource(), self.operation_name())
    }
}

// ---------------------------------------------------------------------------
// Node parameters
// ---------------------------------------------------------------------------

/// Parameters the node reads from the host.
///
/// `Resource` and `Operation` are node-level and read once against
/// [`ItemIndex::FIRST`]; the rest are resolved per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Resource,
    Operation,
    ApiId,
    Parameters,
    BinId,
    BinData,
}

impl Parameter {
    /// Wire name of the parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::Resource => "resource",
            Parameter::Operation => "operation",
            Parameter::ApiId => "apiId",
            Parameter::Parameters => "parameters",
            Parameter::BinId => "binId",
            Parameter::BinData => "binData",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// HTTP methods the node issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request for one item.
///
/// `path` is relative to the configured base URL and always starts with
/// `/v1/`. Built fresh per item and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    /// Query-string parameters. Values are already coerced to strings.
    pub query: Option<BTreeMap<String, String>>,
    /// JSON request body.
    pub body: Option<Value>,
}

impl RequestSpec {
    /// A `GET` with neither query nor body.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: None,
            body: None,
        }
    }

    /// Attaches query-string parameters.
    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = Some(query);
        self
    }

    /// A `PUT` carrying a JSON body.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Put,
            path: path.into(),
            query: None,
            body: Some(body),
        }
    }
}

// ---------------------------------------------------------------------------
// Items and results
// ---------------------------------------------------------------------------

/// One unit of input work as handed over by the host.
///
/// The payload is opaque to dispatch; it is available to a
/// [`crate::ParameterAccessor`] that resolves parameters per item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub json: Value,
}

impl Item {
    pub fn new(json: Value) -> Self {
        Self { json }
    }
}

/// Lineage link from an output record back to its input item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: ItemIndex,
}

/// One output record. Exactly one is produced per input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub json: Value,
    pub paired_item: PairedItem,
}

impl ResultRecord {
    /// Wraps a response body for the item at `index`.
    pub fn success(payload: Value, index: ItemIndex) -> Self {
        Self {
            json: payload,
            paired_item: PairedItem { item: index },
        }
    }

    /// The fixed-shape record emitted for a tolerated per-item failure.
    pub fn failure(message: impl Into<String>, index: ItemIndex) -> Self {
        Self {
            json: json!({
                "status": "error",
                "error": message.into(),
                "data": null,
            }),
            paired_item: PairedItem { item: index },
        }
    }

    /// Returns `true` if this record is a captured failure.
    pub fn is_failure(&self) -> bool {
        self.json.get("status").and_then(Value::as_str) == Some("error")
            && self.json.get("data").is_some_and(Value::is_null)
    }
}

// ---------------------------------------------------------------------------
// API catalogue
// ---------------------------------------------------------------------------

/// One entry of the upstream `/v1/n8n/apis` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    pub id: ApiId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// A selectable option built from an [`ApiDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiOption {
    /// Display label.
    pub name: String,
    /// The API id submitted as the `apiId` parameter.
    pub value: ApiId,
    pub description: String,
}

impl From<ApiDescriptor> for ApiOption {
    fn from(api: ApiDescriptor) -> Self {
        Self {
            name: api.label,
            value: api.id,
            description: api.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_valid_pair() {
        let cases = [
            ("api", "execute", NodeOperation::Api(ApiOperation::Execute)),
            ("api", "list", NodeOperation::Api(ApiOperation::List)),
            ("jsonbin", "list", NodeOperation::JsonBin(JsonBinOperation::List)),
            ("jsonbin", "get", NodeOperation::JsonBin(JsonBinOperation::Get)),
            ("jsonbin", "update", NodeOperation::JsonBin(JsonBinOperation::Update)),
            ("analytics", "getUsage", NodeOperation::Analytics(AnalyticsOperation::GetUsage)),
        ];
        for (resource, operation, expected) in cases {
            let parsed = NodeOperation::parse(resource, operation).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.resource().as_str(), resource);
            assert_eq!(parsed.operation_name(), operation);
        }
    }

    #[test]
    fn rejects_operation_from_another_resource() {
        let err = NodeOperation::parse("analytics", "update").unwrap_err();
        assert!(matches!(
            err,
            NodeError::UnsupportedOperation { resource: Resource::Analytics, ref operation }
                if operation == "update"
        ));
    }

    #[test]
    fn rejects_unknown_resource() {
        let err = NodeOperation::parse("billing", "list").unwrap_err();
        assert!(matches!(err, NodeError::UnknownResource { .. }));
    }

    #[test]
    fn failure_record_has_fixed_shape() {
        let record = ResultRecord::failure("timeout", ItemIndex::new(2));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "json": { "status": "error", "error": "timeout", "data": null },
                "pairedItem": { "item": 2 }
            })
        );
        assert!(record.is_failure());
    }

    #[test]
    fn success_record_is_not_mistaken_for_failure() {
        let record = ResultRecord::success(json!({ "status": "ok", "data": {} }), ItemIndex::FIRST);
        assert!(!record.is_failure());
    }

    #[test]
    fn api_option_uses_label_as_name() {
        let descriptor: ApiDescriptor = serde_json::from_value(json!({
            "id": "dnslookup",
            "label": "DNS Lookup",
            "description": "Look up DNS records"
        }))
        .unwrap();
        let option = ApiOption::from(descriptor);
        assert_eq!(option.name, "DNS Lookup");
        assert_eq!(option.value.as_str(), "dnslookup");
    }
}

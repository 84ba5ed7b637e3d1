//! Request dispatcher.
//!
//! Turns a validated [`NodeOperation`] plus the parameters of one item into the
//! [`RequestSpec`] the transport sends:
//!
//! | Operation | Method | Path | Payload |
//! |-----------|--------|------|---------|
//! | api / execute | `GET` | `/v1/{apiId}` | query from `parameters` |
//! | api / list | `GET` | `/v1/n8n/apis` | |
//! | jsonbin / list | `GET` | `/v1/n8n/jsonbin/list` | |
//! | jsonbin / get | `GET` | `/v1/n8n/jsonbin/get/{binId}` | |
//! | jsonbin / update | `PUT` | `/v1/n8n/jsonbin/update/{binId}` | body `{"data": binData}` |
//! | analytics / getUsage | `GET` | `/v1/n8n/analytics` | |
//!
//! Dispatch is pure: every validation failure is reported before the
//! transport is involved.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::{
    AnalyticsOperation, ApiId, ApiOperation, BinId, ItemIndex, JsonBinOperation, NodeError,
    NodeOperation, Parameter, ParameterAccessor, RequestSpec,
};

/// Path of the API catalogue, shared with the option-list lookup.
pub const API_LIST_PATH: &str = "/v1/n8n/apis";

const JSONBIN_PATH: &str = "/v1/n8n/jsonbin";
const ANALYTICS_PATH: &str = "/v1/n8n/analytics";

const INVALID_PARAMETERS: &str = "Invalid JSON in parameters";
const INVALID_BIN_DATA: &str = "Invalid JSON in bin data";

/// Resolves the request for the item at `item`.
///
/// # Errors
///
/// - [`NodeError::MissingParameter`] when `apiId` or `binId` is required but
///   absent or blank.
/// - [`NodeError::Validation`] when `parameters` or `binData` is not valid
///   JSON.
pub fn dispatch(
    operation: NodeOperation,
    item: ItemIndex,
    params: &dyn ParameterAccessor,
) -> Result<RequestSpec, NodeError> {
    let request = match operation {
        NodeOperation::Api(ApiOperation::Execute) => {
            let api_id = api_id(item, params)?;
            let query = query_parameters(params.get(Parameter::Parameters, item))?;
            RequestSpec::get(format!("/v1/{api_id}")).with_query(query)
        }
        NodeOperation::Api(ApiOperation::List) => RequestSpec::get(API_LIST_PATH),
        NodeOperation::JsonBin(JsonBinOperation::List) => {
            RequestSpec::get(format!("{JSONBIN_PATH}/list"))
        }
        NodeOperation::JsonBin(JsonBinOperation::Get) => {
            let bin_id = bin_id(item, params)?;
            RequestSpec::get(format!("{JSONBIN_PATH}/get/{bin_id}"))
        }
        NodeOperation::JsonBin(JsonBinOperation::Update) => {
            let bin_id = bin_id(item, params)?;
            let data = parse_json(
                params.get(Parameter::BinData, item),
                Parameter::BinData,
                INVALID_BIN_DATA,
            )?;
            RequestSpec::put(
                format!("{JSONBIN_PATH}/update/{bin_id}"),
                json!({ "data": data }),
            )
        }
        NodeOperation::Analytics(AnalyticsOperation::GetUsage) => RequestSpec::get(ANALYTICS_PATH),
    };

    tracing::debug!(
        %operation,
        item = %item,
        method = %request.method,
        path = %request.path,
        "Resolved request"
    );
    Ok(request)
}

// ---------------------------------------------------------------------------
// Identifier parameters
// ---------------------------------------------------------------------------

fn api_id(item: ItemIndex, params: &dyn ParameterAccessor) -> Result<ApiId, NodeError> {
    params
        .get(Parameter::ApiId, item)
        .and_then(|v| ApiId::new(coerce_to_string(&v)))
        .ok_or(NodeError::MissingParameter {
            name: Parameter::ApiId,
        })
}

fn bin_id(item: ItemIndex, params: &dyn ParameterAccessor) -> Result<BinId, NodeError> {
    params
        .get(Parameter::BinId, item)
        .and_then(|v| BinId::new(coerce_to_string(&v)))
        .ok_or(NodeError::MissingParameter {
            name: Parameter::BinId,
        })
}

// ---------------------------------------------------------------------------
// JSON parameters
// ---------------------------------------------------------------------------

/// Reads a JSON-typed parameter. Text is parsed; any other JSON value is taken
/// as already parsed. An unset parameter defaults to `{}`.
fn parse_json(
    value: Option<Value>,
    parameter: Parameter,
    message: &str,
) -> Result<Value, NodeError> {
    match value {
        None => Ok(json!({})),
        Some(Value::String(text)) => {
            serde_json::from_str(&text).map_err(|e| {
                tracing::debug!(%parameter, error = %e, "Rejected malformed JSON parameter");
                NodeError::validation(parameter, message)
            })
        }
        Some(other) => Ok(other),
    }
}

/// Flattens the `parameters` value into query-string pairs.
///
/// Objects contribute their entries and arrays their elements keyed by
/// index. Other scalars carry no entries. A `null` document is rejected.
fn query_parameters(value: Option<Value>) -> Result<BTreeMap<String, String>, NodeError> {
    let parsed = parse_json(value, Parameter::Parameters, INVALID_PARAMETERS)?;
    let query = match parsed {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), coerce_to_string(value)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, value)| (i.to_string(), coerce_to_string(value)))
            .collect(),
        Value::Null => {
            return Err(NodeError::validation(
                Parameter::Parameters,
                INVALID_PARAMETERS,
            ))
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) => BTreeMap::new(),
    };
    Ok(query)
}

/// Lossy string form of a JSON value, used for query-string values.
///
/// Integral numbers lose their fractional part (`5.0` becomes `"5"`), very
/// large or small floats use exponent notation (`1e21` becomes `"1e+21"`), arrays
/// are comma-joined with `null` elements left empty, and objects become
/// compact JSON text.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                n.as_f64().map_or_else(|| n.to_string(), number_to_string)
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Shortest round-trip form, switching to exponent notation outside
/// `[1e-6, 1e21)` the way ECMAScript `Number::toString` does.
fn number_to_string(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return f.to_string();
    }
    let exponential = format!("{f:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

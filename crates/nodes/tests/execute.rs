use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use nodes::{ApiVerveNode, ExecutionSettings};
use verve::{
    AuthenticatedHttpClient, CredentialName, HttpMethod, Item, ItemIndex, NodeError,
    NodeParameters, Parameter, RequestSpec, TransportError,
};

/// Replays scripted responses in call order and records every request.
#[derive(Default)]
struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<(CredentialName, RequestSpec)>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        })
    }

    fn requests(&self) -> Vec<RequestSpec> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }
}

#[async_trait]
impl AuthenticatedHttpClient for ScriptedClient {
    async fn request(
        &self,
        credential: &CredentialName,
        request: &RequestSpec,
    ) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((credential.clone(), request.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "status": "ok" })))
    }
}

fn node(client: &Arc<ScriptedClient>) -> ApiVerveNode {
    ApiVerveNode::new(
        client.clone(),
        CredentialName::new("apiVerveOAuth2Api").unwrap(),
    )
}

fn items(count: usize) -> Vec<Item> {
    (0..count).map(|i| Item::new(json!({ "n": i }))).collect()
}

fn bin_get_params() -> NodeParameters {
    NodeParameters::new()
        .with(Parameter::Resource, "jsonbin")
        .with(Parameter::Operation, "get")
        .with(Parameter::BinId, "abc123")
}

#[tokio::test]
async fn one_record_per_item_in_order() {
    let client = ScriptedClient::new(vec![
        Ok(json!({ "data": 0 })),
        Ok(json!({ "data": 1 })),
        Ok(json!({ "data": 2 })),
    ]);

    let records = node(&client)
        .execute(&items(3), &bin_get_params(), ExecutionSettings::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.paired_item.item, ItemIndex::new(i));
        assert_eq!(record.json, json!({ "data": i }));
    }
    assert_eq!(client.requests().len(), 3);
}

#[tokio::test]
async fn api_execute_sends_coerced_query() {
    let client = ScriptedClient::new(vec![Ok(json!({ "status": "ok", "data": { "valid": true } }))]);
    let params = NodeParameters::new()
        .with(Parameter::Resource, "api")
        .with(Parameter::Operation, "execute")
        .with(Parameter::ApiId, "email-validator")
        .with(Parameter::Parameters, r#"{"email":"a@b.com","count":5}"#);

    let records = node(&client)
        .execute(&items(1), &params, ExecutionSettings::default())
        .await
        .unwrap();

    let sent = client.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, HttpMethod::Get);
    assert_eq!(sent[0].path, "/v1/email-validator");
    let query = sent[0].query.as_ref().unwrap();
    assert_eq!(query["email"], "a@b.com");
    assert_eq!(query["count"], "5");
    assert_eq!(records[0].json["data"]["valid"], json!(true));
}

#[tokio::test]
async fn tolerated_transport_failure_becomes_error_record() {
    let client = ScriptedClient::new(vec![
        Ok(json!({ "data": "first" })),
        Err(TransportError::network("timeout")),
        Ok(json!({ "data": "third" })),
    ]);

    let records = node(&client)
        .execute(&items(3), &bin_get_params(), ExecutionSettings::continue_on_fail())
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(
        records[1].json,
        json!({ "status": "error", "error": "timeout", "data": null })
    );
    assert_eq!(records[1].paired_item.item, ItemIndex::new(1));
    assert!(records[1].is_failure());
    assert_eq!(records[2].json, json!({ "data": "third" }));
    assert_eq!(client.requests().len(), 3);
}

#[tokio::test]
async fn untolerated_failure_aborts_remaining_items() {
    let client = ScriptedClient::new(vec![
        Ok(json!({ "data": "first" })),
        Err(TransportError::network("timeout")),
        Ok(json!({ "data": "third" })),
    ]);

    let err = node(&client)
        .execute(&items(3), &bin_get_params(), ExecutionSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err.item_index, ItemIndex::new(1));
    assert_eq!(err.source, NodeError::Transport(TransportError::network("timeout")));
    assert_eq!(client.requests().len(), 2, "third item must not be dispatched");
}

#[tokio::test]
async fn malformed_parameters_never_reach_the_transport() {
    let client = ScriptedClient::new(vec![]);
    let params = NodeParameters::new()
        .with(Parameter::Resource, "api")
        .with(Parameter::Operation, "execute")
        .with(Parameter::ApiId, "email-validator")
        .with(Parameter::Parameters, "{bad json");

    let err = node(&client)
        .execute(&items(1), &params, ExecutionSettings::default())
        .await
        .unwrap_err();

    assert!(err.source.is_validation());
    assert_eq!(err.source.to_string(), "Invalid JSON in parameters");
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn tolerated_validation_failure_keeps_item_alignment() {
    let client = ScriptedClient::new(vec![Ok(json!({ "n": 0 })), Ok(json!({ "n": 2 }))]);
    let params = NodeParameters::new()
        .with(Parameter::Resource, "jsonbin")
        .with(Parameter::Operation, "update")
        .with(Parameter::BinId, "abc123")
        .with(Parameter::BinData, r#"{"x":1}"#)
        .with_item(ItemIndex::new(1), Parameter::BinData, "{oops");

    let records = node(&client)
        .execute(&items(3), &params, ExecutionSettings::continue_on_fail())
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].json, json!({ "n": 0 }));
    assert_eq!(records[1].json["error"], json!("Invalid JSON in bin data"));
    assert_eq!(records[2].json, json!({ "n": 2 }));
    assert_eq!(records[2].paired_item.item, ItemIndex::new(2));

    let sent = client.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, HttpMethod::Put);
    assert_eq!(sent[0].path, "/v1/n8n/jsonbin/update/abc123");
    assert_eq!(sent[0].body, Some(json!({ "data": { "x": 1 } })));
}

#[tokio::test]
async fn invalid_operation_aborts_even_when_tolerating_failures() {
    let client = ScriptedClient::new(vec![]);
    let params = NodeParameters::new()
        .with(Parameter::Resource, "analytics")
        .with(Parameter::Operation, "delete");

    let err = node(&client)
        .execute(&items(2), &params, ExecutionSettings::continue_on_fail())
        .await
        .unwrap_err();

    assert_eq!(err.item_index, ItemIndex::FIRST);
    assert!(matches!(err.source, NodeError::UnsupportedOperation { .. }));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn empty_input_produces_no_records() {
    let client = ScriptedClient::new(vec![]);
    let records = node(&client)
        .execute(&[], &NodeParameters::new(), ExecutionSettings::default())
        .await
        .unwrap();
    assert!(records.is_empty());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn requests_use_the_node_credential() {
    let client = ScriptedClient::new(vec![]);
    let params = NodeParameters::new()
        .with(Parameter::Resource, "analytics")
        .with(Parameter::Operation, "getUsage");

    node(&client)
        .execute(&items(1), &params, ExecutionSettings::default())
        .await
        .unwrap();

    let recorded = client.requests.lock().unwrap();
    assert_eq!(recorded[0].0.as_str(), "apiVerveOAuth2Api");
    assert_eq!(recorded[0].1, RequestSpec::get("/v1/n8n/analytics"));
}

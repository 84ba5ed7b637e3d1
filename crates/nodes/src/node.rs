//! The APIVerve node executor.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn, Span};

use verve::{
    dispatch, AuthenticatedHttpClient, CredentialName, ExecutionError, Item, ItemIndex,
    NodeError, NodeOperation, Parameter, ParameterAccessor, ResultRecord, RunId,
};

/// Run-level settings supplied by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Capture per-item failures as error records instead of aborting the run.
    pub continue_on_fail: bool,
}

impl ExecutionSettings {
    pub fn continue_on_fail() -> Self {
        Self {
            continue_on_fail: true,
        }
    }
}

/// Executes the selected APIVerve operation over a batch of items.
///
/// Items are processed strictly in order, one request at a time. The output
/// holds exactly one [`ResultRecord`] per input item, paired to it by index.
pub struct ApiVerveNode {
    pub(crate) client: Arc<dyn AuthenticatedHttpClient>,
    pub(crate) credential: CredentialName,
}

impl ApiVerveNode {
    pub fn new(client: Arc<dyn AuthenticatedHttpClient>, credential: CredentialName) -> Self {
        Self { client, credential }
    }

    /// Runs the node.
    ///
    /// `resource` and `operation` are read once against the first item; all
    /// other parameters are resolved per item.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the resource/operation pair is invalid
    /// (regardless of `settings`), or when an item fails and
    /// `settings.continue_on_fail` is off. In the latter case no later item is
    /// dispatched.
    #[instrument(
        name = "apiverve.execute",
        skip_all,
        fields(run_id = tracing::field::Empty, items = items.len(), operation = tracing::field::Empty)
    )]
    pub async fn execute(
        &self,
        items: &[Item],
        params: &dyn ParameterAccessor,
        settings: ExecutionSettings,
    ) -> Result<Vec<ResultRecord>, ExecutionError> {
        let run_id = RunId::new_random();
        Span::current().record("run_id", tracing::field::display(run_id));

        if items.is_empty() {
            debug!("No input items; nothing to do");
            return Ok(Vec::new());
        }

        let operation = resolve_operation(params).map_err(|source| ExecutionError {
            item_index: ItemIndex::FIRST,
            source,
        })?;
        Span::current().record("operation", tracing::field::display(operation));

        let mut records = Vec::with_capacity(items.len());
        let mut failures = 0usize;
        for position in 0..items.len() {
            let index = ItemIndex::new(position);
            match self.process_item(operation, index, params).await {
                Ok(payload) => records.push(ResultRecord::success(payload, index)),
                Err(error) if settings.continue_on_fail => {
                    warn!(item = %index, %error, "Item failed; continuing");
                    failures += 1;
                    records.push(ResultRecord::failure(error.to_string(), index));
                }
                Err(error) => {
                    warn!(item = %index, %error, "Item failed; aborting run");
                    return Err(ExecutionError {
                        item_index: index,
                        source: error,
                    });
                }
            }
        }

        info!(records = records.len(), failures, "Node run complete");
        Ok(records)
    }

    async fn process_item(
        &self,
        operation: NodeOperation,
        index: ItemIndex,
        params: &dyn ParameterAccessor,
    ) -> Result<Value, NodeError> {
        let request = dispatch(operation, index, params)?;
        let response = self.client.request(&self.credential, &request).await?;
        Ok(response)
    }
}

fn resolve_operation(params: &dyn ParameterAccessor) -> Result<NodeOperation, NodeError> {
    let resource = string_parameter(params, Parameter::Resource)?;
    let operation = string_parameter(params, Parameter::Operation)?;
    NodeOperation::parse(&resource, &operation)
}

fn string_parameter(
    params: &dyn ParameterAccessor,
    parameter: Parameter,
) -> Result<String, NodeError> {
    match params.get(parameter, ItemIndex::FIRST) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(NodeError::MissingParameter { name: parameter }),
    }
}

//! Option-list lookups that populate the node's selection lists.
//!
//! These run before any execution, only to make parameter selection easier.
//! A failed lookup must never block the user, so every failure degrades to an
//! empty list and is logged instead of returned.

use tracing::{debug, instrument, warn};

use verve::{ApiDescriptor, ApiOption, RequestSpec, API_LIST_PATH};

use crate::ApiVerveNode;

impl ApiVerveNode {
    /// Lists the upstream APIs as selectable options.
    ///
    /// Best effort: a transport failure or a response that is not a JSON
    /// array yields an empty list. Entries without a usable `id` are skipped
    /// on their own; a missing `label` or `description` is left empty.
    #[instrument(name = "apiverve.available_apis", skip_all)]
    pub async fn available_apis(&self) -> Vec<ApiOption> {
        let response = match self
            .client
            .request(&self.credential, &RequestSpec::get(API_LIST_PATH))
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "API listing unavailable; offering no options");
                return Vec::new();
            }
        };

        let serde_json::Value::Array(entries) = response else {
            warn!("API listing is not an array; offering no options");
            return Vec::new();
        };

        let total = entries.len();
        let options: Vec<ApiOption> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<ApiDescriptor>(entry) {
                Ok(api) if !api.id.as_str().trim().is_empty() => Some(ApiOption::from(api)),
                Ok(_) => None,
                Err(error) => {
                    warn!(%error, "Skipping malformed API listing entry");
                    None
                }
            })
            .collect();
        debug!(count = options.len(), skipped = total - options.len(), "Loaded API options");
        options
    }
}


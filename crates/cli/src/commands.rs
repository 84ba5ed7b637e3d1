//! Subcommand implementations.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde_json::{json, Value};
use tracing::{info, info_span, Instrument};

use nodes::{ApiVerveNode, ExecutionSettings};
use transport::{ApiVerveClient, OAuthClient, TokenSet};
use verve::{Item, NodeParameters, Parameter, ServiceConfig};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// OAuth2 access token for the APIVerve credential.
    #[arg(long, env = "APIVERVE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Refresh token used when the access token expires.
    #[arg(long, env = "APIVERVE_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,
}

impl TokenArgs {
    fn token_set(&self) -> TokenSet {
        let tokens = TokenSet::new(self.access_token.clone());
        match &self.refresh_token {
            Some(refresh_token) => tokens.with_refresh_token(refresh_token.clone()),
            None => tokens,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    tokens: TokenArgs,

    /// Resource: api, jsonbin or analytics.
    #[arg(long)]
    resource: String,

    /// Operation within the resource (e.g. execute, list, get, update, getUsage).
    #[arg(long)]
    operation: String,

    /// API to execute (api / execute).
    #[arg(long)]
    api_id: Option<String>,

    /// API parameters as JSON text (api / execute).
    #[arg(long)]
    parameters: Option<String>,

    /// JSON Bin id (jsonbin / get, update).
    #[arg(long)]
    bin_id: Option<String>,

    /// Data to store as JSON text (jsonbin / update).
    #[arg(long)]
    bin_data: Option<String>,

    /// JSON file with the input items (an array, or one value); `-` reads stdin.
    /// Without it the node runs once.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Record per-item failures as error records instead of stopping.
    #[arg(long)]
    continue_on_fail: bool,
}

impl RunArgs {
    fn node_parameters(&self) -> NodeParameters {
        let optional = [
            (Parameter::ApiId, &self.api_id),
            (Parameter::Parameters, &self.parameters),
            (Parameter::BinId, &self.bin_id),
            (Parameter::BinData, &self.bin_data),
        ];
        optional.into_iter().fold(
            NodeParameters::new()
                .with(Parameter::Resource, self.resource.clone())
                .with(Parameter::Operation, self.operation.clone()),
            |params, (parameter, value)| match value {
                Some(value) => params.with(parameter, value.clone()),
                None => params,
            },
        )
    }
}

#[derive(Debug, Args)]
pub struct RedirectArgs {
    /// Callback URL registered for the OAuth2 client.
    #[arg(long)]
    redirect_uri: String,
}

#[derive(Debug, Args)]
pub struct ExchangeArgs {
    /// Authorization code returned to the callback URL.
    #[arg(long)]
    code: String,

    #[command(flatten)]
    redirect: RedirectArgs,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub async fn run(config: &ServiceConfig, args: RunArgs) -> anyhow::Result<()> {
    let items = read_items(args.input.as_ref())?;
    let params = args.node_parameters();
    let settings = ExecutionSettings {
        continue_on_fail: args.continue_on_fail,
    };

    let client = Arc::new(
        ApiVerveClient::new(config, args.tokens.token_set())
            .context("Failed to configure APIVerve client")?,
    );
    let node = ApiVerveNode::new(client.clone(), config.credential_name()?);

    let span = info_span!("apiverve.run", resource = %args.resource, operation = %args.operation);
    let records = node
        .execute(&items, &params, settings)
        .instrument(span)
        .await?;

    if client.tokens().await.access_token.expose() != args.tokens.access_token {
        info!("Access token was refreshed during the run; update APIVERVE_ACCESS_TOKEN");
    }

    print_json(&serde_json::to_value(&records)?)
}

pub async fn list_apis(config: &ServiceConfig, args: TokenArgs) -> anyhow::Result<()> {
    let client = ApiVerveClient::new(config, args.token_set())
        .context("Failed to configure APIVerve client")?;
    let node = ApiVerveNode::new(Arc::new(client), config.credential_name()?);

    let options = node.available_apis().await;
    print_json(&serde_json::to_value(&options)?)
}

pub fn authorize_url(config: &ServiceConfig, args: RedirectArgs) -> anyhow::Result<()> {
    let client = OAuthClient::new(config).context("Failed to configure OAuth2 client")?;
    let state = uuid::Uuid::new_v4().to_string();
    let url = client.authorization_url(&args.redirect_uri, &state);
    print_json(&json!({ "url": url.as_str(), "state": state }))
}

pub async fn exchange_code(config: &ServiceConfig, args: ExchangeArgs) -> anyhow::Result<()> {
    let client = OAuthClient::new(config).context("Failed to configure OAuth2 client")?;
    let tokens = client
        .exchange_code(&args.code, &args.redirect.redirect_uri)
        .await
        .context("Authorization code exchange failed")?;
    print_json(&serde_json::to_value(&tokens)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_items(input: Option<&PathBuf>) -> anyhow::Result<Vec<Item>> {
    let Some(path) = input else {
        return Ok(vec![Item::default()]);
    };

    let text = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read items from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read items from {}", path.display()))?
    };

    let value: Value = serde_json::from_str(&text).context("Input items are not valid JSON")?;
    Ok(items_from_json(value))
}

/// An array yields one item per element; any other value is a single item.
fn items_from_json(value: Value) -> Vec<Item> {
    match value {
        Value::Array(values) => values.into_iter().map(Item::new).collect(),
        other => vec![Item::new(other)],
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

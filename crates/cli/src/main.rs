//! APIVerve node CLI entry point.
//!
//! This binary is the composition root for the workspace and stands in for the
//! workflow host. Responsibilities:
//!
//! 1. **Parse configuration** — flags with environment fallbacks, folded into
//!    one immutable [`verve::ServiceConfig`].
//! 2. **Wire observability** — `tracing-subscriber` with a text or JSON layer
//!    on stderr and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure** — the [`transport::ApiVerveClient`] holding
//!    the user's tokens, injected into [`nodes::ApiVerveNode`].
//! 4. **Run a command** — execute the node over a batch of items, list the
//!    available APIs, or walk through the OAuth2 authorization-code flow.

mod commands;
mod observability;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use observability::LogFormat;
use verve::ServiceConfig;

#[derive(Debug, Parser)]
#[command(name = "apiverve", version, about = "Run APIVerve node operations")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// API host; override only to target a test server.
    #[arg(long, global = true, env = "APIVERVE_BASE_URL", default_value = verve::DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "APIVERVE_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log output format (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl GlobalArgs {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::apiverve()
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute the node over a batch of input items.
    Run(commands::RunArgs),
    /// List the upstream APIs available for `--api-id`.
    ListApis(commands::TokenArgs),
    /// Print the URL that starts the OAuth2 authorization-code flow.
    AuthorizeUrl(commands::RedirectArgs),
    /// Exchange an authorization code for access and refresh tokens.
    ExchangeCode(commands::ExchangeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.global.log_format)?;

    let config = cli.global.service_config();
    let result = match cli.command {
        Command::Run(args) => commands::run(&config, args).await,
        Command::ListApis(args) => commands::list_apis(&config, args).await,
        Command::AuthorizeUrl(args) => commands::authorize_url(&config, args),
        Command::ExchangeCode(args) => commands::exchange_code(&config, args).await,
    };

    telemetry.shutdown();
    result
}

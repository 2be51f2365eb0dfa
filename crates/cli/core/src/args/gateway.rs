//! Gateway CLI arguments.

use clap::Args;

/// Gateway connection overrides.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Gateway")]
pub struct GatewayArgs {
    /// Base url of the gateway.
    #[arg(long = "gateway.url", value_name = "URL", global = true)]
    pub url: Option<String>,

    /// API key sent as a bearer token.
    #[arg(long = "gateway.api-key", value_name = "KEY", global = true)]
    pub api_key: Option<String>,
}

//! Sandbox MCP Bridge - Entry Point
//!
//! This is the main entry point for the MCP server binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use sandbox_mcp_bridge::client::{
    ApiClient, ApiConfig, ControlPlaneAuth, DEFAULT_AGENT_URL_TEMPLATE, DEFAULT_CONTROL_PLANE_URL,
};
use sandbox_mcp_bridge::credential::Credential;
use sandbox_mcp_bridge::server::{self, DEFAULT_MCP_PATH};
use sandbox_mcp_bridge::tools::SandboxTools;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Streamable HTTP; each request carries its own bearer token
    Http,
    /// stdin/stdout; every call uses --api-key
    Stdio,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AuthStyle {
    /// X-API-Key header
    ApiKey,
    /// Authorization: Bearer header
    Bearer,
}

impl From<AuthStyle> for ControlPlaneAuth {
    fn from(style: AuthStyle) -> Self {
        match style {
            AuthStyle::ApiKey => Self::ApiKey,
            AuthStyle::Bearer => Self::Bearer,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Sandbox MCP Bridge - MCP tools for a remote sandbox API.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport to serve MCP over
    #[arg(long, value_enum, env = "SANDBOX_MCP_TRANSPORT", default_value = "http")]
    transport: Transport,

    /// Address to listen on (HTTP transport)
    #[arg(long, env = "SANDBOX_MCP_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Route of the MCP endpoint (HTTP transport)
    #[arg(long, env = "SANDBOX_MCP_PATH", default_value = DEFAULT_MCP_PATH)]
    path: String,

    /// Base URL of the sandbox control plane
    #[arg(long, env = "SANDBOX_MCP_CONTROL_PLANE_URL", default_value = DEFAULT_CONTROL_PLANE_URL)]
    control_plane_url: String,

    /// URL of a sandbox's agent; {sandbox_id} is substituted
    #[arg(long, env = "SANDBOX_MCP_AGENT_URL_TEMPLATE", default_value = DEFAULT_AGENT_URL_TEMPLATE)]
    agent_url_template: String,

    /// How the credential is sent to the control plane
    #[arg(long, value_enum, env = "SANDBOX_MCP_CONTROL_PLANE_AUTH", default_value = "api-key")]
    control_plane_auth: AuthStyle,

    /// Timeout for calls whose tool sets none, in seconds
    #[arg(long, env = "SANDBOX_MCP_DEFAULT_TIMEOUT_SECS", default_value = "30")]
    default_timeout_secs: u64,

    /// API key used for every call (stdio transport only)
    #[arg(long, env = "SANDBOX_MCP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, env = "SANDBOX_MCP_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    // MCP requires that logs go to stderr (stdout is for JSON-RPC)
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    match args.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    info!("Sandbox MCP Bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = ApiConfig::new()
        .with_control_plane_url(args.control_plane_url)
        .with_agent_url_template(args.agent_url_template)
        .with_control_plane_auth(args.control_plane_auth.into())
        .with_default_timeout(Duration::from_secs(args.default_timeout_secs));
    let client = ApiClient::new(config).into_diagnostic()?;
    info!(
        control_plane = %client.config().control_plane_url,
        agent = %client.config().agent_url_template,
        "Sandbox API configured"
    );
    let tools = SandboxTools::new(client);

    match args.transport {
        Transport::Http => {
            if args.api_key.is_some() {
                warn!("--api-key is ignored over HTTP; callers must send their own bearer token");
            }
            server::run_http(tools, args.bind, &args.path)
                .await
                .into_diagnostic()
        }
        Transport::Stdio => {
            let credential = args.api_key.as_deref().and_then(Credential::new);
            if credential.is_none() {
                warn!("No API key configured; every tool call will report missing authentication");
            }
            server::run_stdio(tools, credential).await.into_diagnostic()
        }
    }
}

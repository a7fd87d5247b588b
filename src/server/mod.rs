//! MCP server implementation.
//!
//! This module provides the MCP server that turns tool calls from AI agents
//! into sandbox API requests, served either over streamable HTTP (one bearer
//! credential per request) or over stdio (one credential per session).

mod auth;
mod handler;

pub use auth::{RequestCredential, credential_from_parts, extract_credential};
pub use handler::SandboxServer;

use std::net::SocketAddr;

use axum::Router;
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::{
            StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
        },
    },
};
use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::ServerError;
use crate::tools::SandboxTools;

/// Route the MCP endpoint is mounted on by default.
pub const DEFAULT_MCP_PATH: &str = "/mcp";

/// Builds the axum router: the MCP service at `path`, behind the credential
/// middleware. GET, POST and DELETE all pass through the same layer.
pub fn router(tools: SandboxTools, path: &str) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(SandboxServer::new(tools.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .nest_service(path, service)
        .layer(axum::middleware::from_fn(extract_credential))
}

/// Run the MCP server over streamable HTTP until Ctrl-C.
///
/// # Errors
///
/// Returns error if the listener cannot be bound or the server fails.
pub async fn run_http(tools: SandboxTools, addr: SocketAddr, path: &str) -> crate::error::Result<()> {
    info!(%addr, path, "Starting sandbox MCP bridge over HTTP");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    axum::serve(listener, router(tools, path))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

/// Run the MCP server over stdio, using `credential` for every tool call.
///
/// # Errors
///
/// Returns error if server initialization or transport fails.
pub async fn run_stdio(
    tools: SandboxTools,
    credential: Option<Credential>,
) -> crate::error::Result<()> {
    info!(
        authenticated = credential.is_some(),
        "Starting sandbox MCP bridge over stdio"
    );

    let server = SandboxServer::new(tools).with_session_credential(credential);

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| ServerError::InitializationFailed(e.to_string()))?;

    info!("Server initialized, waiting for requests");

    service
        .waiting()
        .await
        .map_err(|e| ServerError::Transport(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

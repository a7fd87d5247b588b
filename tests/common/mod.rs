//! Shared helpers for integration tests.
//!
//! A single `wiremock` server stands in for both backends: the control plane is
//! served at its root and each sandbox's agent under `/agents/{sandbox_id}`.

#![allow(dead_code)]

use std::time::Duration;

use sandbox_mcp_bridge::client::{ApiClient, ApiConfig, ControlPlaneAuth};
use sandbox_mcp_bridge::credential::{self, Credential};
use sandbox_mcp_bridge::tools::SandboxTools;
use wiremock::{MockServer, Request};

/// Starts a mock backend and a tool set pointed at it.
pub async fn backend() -> (MockServer, SandboxTools) {
    backend_with_auth(ControlPlaneAuth::ApiKey).await
}

/// Like [`backend`], with an explicit control-plane auth style.
pub async fn backend_with_auth(auth: ControlPlaneAuth) -> (MockServer, SandboxTools) {
    let server = MockServer::start().await;
    let tools = tools_for(&server.uri(), auth);
    (server, tools)
}

/// Builds a tool set whose control plane is `base` and whose agents live under
/// `{base}/agents/{sandbox_id}`.
pub fn tools_for(base: &str, auth: ControlPlaneAuth) -> SandboxTools {
    let config = ApiConfig::new()
        .with_control_plane_url(base)
        .with_agent_url_template(format!("{base}/agents/{{sandbox_id}}"))
        .with_control_plane_auth(auth)
        .with_default_timeout(Duration::from_secs(5))
        .with_timeout_grace(Duration::from_millis(500));
    SandboxTools::new(ApiClient::new(config).expect("valid test config"))
}

/// Runs `body` as if it were handling a request that carried `token`.
pub async fn as_caller<F: std::future::Future>(token: &str, body: F) -> F::Output {
    credential::establish(Credential::new(token), body).await
}

/// All requests the mock backend has seen.
pub async fn received(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
}

/// Value of `name` on a captured request, if present and valid UTF-8.
pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

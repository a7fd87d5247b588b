//! Authenticated HTTP client for the sandbox-management API.
//!
//! [`ApiClient::call`] performs exactly one request per invocation. It reads the
//! caller's credential from [`crate::credential::current`], routes the request to
//! the control plane or to a sandbox's agent, and classifies the outcome:
//!
//! - no credential: [`ToolError::Unauthenticated`], nothing is sent
//! - network failure or timeout: [`ToolError::Transport`], never retried
//! - any HTTP status: `Ok(ApiResponse)`, with non-2xx as [`ApiResponse::Remote`]
//!
//! # Example
//!
//! ```no_run
//! use reqwest::Method;
//! use sandbox_mcp_bridge::client::{ApiClient, ApiConfig, ApiRequest, Target};
//! use sandbox_mcp_bridge::credential::{self, Credential};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(ApiConfig::default())?;
//! let request = ApiRequest::new(Target::ControlPlane, Method::GET, &["v1", "sandboxes"]);
//!
//! let response = credential::establish(Credential::new("my-token"), client.call(request)).await?;
//! println!("{response:?}");
//! # Ok(())
//! # }
//! ```

mod config;
mod request;

pub use config::{
    ApiConfig, ControlPlaneAuth, DEFAULT_AGENT_PORT, DEFAULT_AGENT_URL_TEMPLATE,
    DEFAULT_CONTROL_PLANE_URL, SANDBOX_ID_PLACEHOLDER,
};
pub use request::{ApiRequest, ApiResponse, Target};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{Span, debug, info, instrument, warn};
use url::Url;

use crate::credential::{self, Credential};
use crate::error::{ConfigError, ToolError};

/// Header carrying the credential when [`ControlPlaneAuth::ApiKey`] is used.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Response bodies are cut to this many characters in logs.
const LOG_BODY_LIMIT: usize = 512;

/// Sequence number for correlating outbound calls in logs.
static CALL_SEQ: AtomicU64 = AtomicU64::new(1);

/// Client for the control plane and per-sandbox agents.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    control_plane: Url,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    /// Creates a client after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let control_plane = config.control_plane_base()?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            control_plane,
            config: Arc::new(config),
        })
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Resolves the full URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::InvalidArgument` if the sandbox id does not produce a
    /// usable agent URL.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ToolError> {
        let mut url = match &request.target {
            Target::ControlPlane => self.control_plane.clone(),
            Target::Agent(sandbox_id) => self.agent_base(sandbox_id)?,
        };

        if !request.segments.is_empty() {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ToolError::invalid("path", "base URL cannot carry a path"))?;
            path.pop_if_empty();
            path.extend(request.segments.iter().filter(|s| !s.is_empty()));
        }

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn agent_base(&self, sandbox_id: &str) -> Result<Url, ToolError> {
        let raw = self
            .config
            .agent_url_template
            .replace(config::SANDBOX_ID_PLACEHOLDER, sandbox_id);
        Url::parse(&raw).map_err(|e| ToolError::invalid("sandbox_id", e.to_string()))
    }

    /// Sends `request` with the current request's credential.
    ///
    /// # Errors
    ///
    /// - `ToolError::Unauthenticated` if no credential is bound
    /// - `ToolError::InvalidArgument` if the target URL cannot be built or the
    ///   timeout plus grace overflows
    /// - `ToolError::Transport` if no response was received
    #[instrument(
        skip(self, request),
        fields(
            seq = CALL_SEQ.fetch_add(1, Ordering::Relaxed),
            target = %request.target,
            method = %request.method,
            path = %request.display_path(),
            status
        )
    )]
    pub async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ToolError> {
        let Some(credential) = credential::current() else {
            debug!("No credential bound, refusing outbound call");
            return Err(ToolError::Unauthenticated);
        };

        let url = self.url_for(&request)?;
        let timeout = request
            .timeout
            .unwrap_or(self.config.default_timeout)
            .checked_add(self.config.timeout_grace)
            .ok_or_else(|| ToolError::invalid("timeout", "too large"))?;

        let builder = self
            .http
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(timeout);
        let builder = self.authorize(builder, &request.target, &credential);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        debug!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "Sending outbound request"
        );
        let started = Instant::now();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed_ms(started), "Outbound request failed");
                return Err(ToolError::transport(e));
            }
        };

        let status = response.status();
        Span::current().record("status", status.as_u16());

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed_ms(started), "Failed to read response body");
                return Err(ToolError::transport(e));
            }
        };

        if status.is_success() {
            info!(
                elapsed_ms = elapsed_ms(started),
                body = %truncate(&text, LOG_BODY_LIMIT),
                "Outbound request completed"
            );
        } else {
            warn!(
                elapsed_ms = elapsed_ms(started),
                body = %truncate(&text, LOG_BODY_LIMIT),
                "Backend returned an error status"
            );
        }

        Ok(ApiResponse::from_parts(status, &text))
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        target: &Target,
        credential: &Credential,
    ) -> reqwest::RequestBuilder {
        match (target, self.config.control_plane_auth) {
            (Target::ControlPlane, ControlPlaneAuth::ApiKey) => {
                builder.header(API_KEY_HEADER, credential.expose())
            }
            _ => builder.bearer_auth(credential.expose()),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Truncates `text` to at most `limit` characters, on a char boundary.
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}... ({} bytes)", &text[..idx], text.len()),
        None => text.to_string(),
    }
}

//! The tool catalogue.
//!
//! Every tool follows the same shape: validate the typed input, build exactly
//! one [`ApiRequest`], send it through [`ApiClient::call`], and render the
//! outcome to text with [`format::render`]. Tool methods never fail; every
//! error is reported inside the returned string.
//!
//! The methods live on [`SandboxTools`], grouped by backend area:
//!
//! - [`sandboxes`]: sandbox and template lifecycle (control plane)
//! - [`execution`]: code execution, shell commands, processes
//! - [`files`]: filesystem operations inside a sandbox
//! - [`vm`]: agent health, VM info, URLs, system metrics
//! - [`environment`]: environment variables and the agent cache

pub mod environment;
pub mod execution;
pub mod files;
pub mod format;
pub mod sandboxes;
pub mod vm;

pub use environment::EnvSetParams;
pub use execution::{ExecuteCodeParams, ExecutionMode, KillProcessParams, RunCommandParams};
pub use files::{FileListParams, FilePathParams, FileWriteParams};
pub use sandboxes::{
    CreateSandboxParams, ListSandboxesParams, ListTemplatesParams, SandboxIdParams,
    TemplateNameParams, UpdateSandboxTimeoutParams,
};
pub use vm::PreviewUrlParams;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::client::{ApiClient, ApiRequest};
use crate::error::ToolError;

/// Working directory used when a tool does not name one.
pub const WORKSPACE_ROOT: &str = "/workspace";

/// Execution timeout, in seconds, used when a tool does not name one.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;

/// Describes a tool for logging and for the text it produces.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    /// Tool name as exposed over MCP.
    pub tool: &'static str,
    /// Gerund phrase used in failure text, e.g. "deleting sandbox".
    pub doing: &'static str,
    /// Heading placed above a successful payload.
    pub label: &'static str,
}

/// Semantic checks that run before any request is built.
pub trait Validate {
    /// # Errors
    ///
    /// Returns `ToolError::InvalidArgument` naming the offending field.
    fn validate(&self) -> Result<(), ToolError>;
}

impl Validate for () {
    fn validate(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Input for agent tools that take nothing but the sandbox.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AgentParams {
    /// Sandbox whose agent receives the request.
    pub sandbox_id: String,
}

impl Validate for AgentParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)
    }
}

/// Tool handlers backed by one [`ApiClient`].
#[derive(Debug, Clone)]
pub struct SandboxTools {
    client: ApiClient,
}

impl SandboxTools {
    /// Creates the tool set.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Returns the underlying API client.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Validates `params`, then sends the request built from them.
    async fn run<P, F>(&self, action: &Action, params: &P, build: F) -> String
    where
        P: Validate,
        F: FnOnce(&P) -> ApiRequest,
    {
        let request = params.validate().map(|()| build(params));
        self.send(action, request).await
    }

    /// Sends a prepared request and renders whatever comes back.
    #[instrument(skip_all, fields(tool = action.tool, invocation = %Uuid::new_v4()))]
    async fn send(&self, action: &Action, request: Result<ApiRequest, ToolError>) -> String {
        let outcome = match request {
            Ok(request) => self.client.call(request).await,
            Err(e) => {
                debug!(error = %e, "Rejected tool arguments");
                Err(e)
            }
        };
        format::render(action, outcome)
    }
}

/// Checks that `value` is a usable sandbox identifier.
///
/// Identifiers become part of a host name for agent calls, so only ASCII
/// letters, digits, `-` and `_` are accepted.
pub(crate) fn require_sandbox_id(field: &'static str, value: &str) -> Result<(), ToolError> {
    require_non_empty(field, value)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ToolError::invalid(
            field,
            "may only contain ASCII letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: Option<u64>) -> Result<(), ToolError> {
    if value == Some(0) {
        return Err(ToolError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

//! MCP server handler implementation.

use http::request::Parts;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use tracing::debug;

use super::auth;
use crate::credential::{self, Credential};
use crate::tools::{
    AgentParams, CreateSandboxParams, EnvSetParams, ExecuteCodeParams, FileListParams,
    FilePathParams, FileWriteParams, KillProcessParams, ListSandboxesParams, ListTemplatesParams,
    PreviewUrlParams, RunCommandParams, SandboxIdParams, SandboxTools, TemplateNameParams,
    UpdateSandboxTimeoutParams,
};

/// The MCP server exposing the sandbox API as tools.
///
/// Every tool call runs inside [`credential::establish`] with the credential of
/// the request that carried it. Over HTTP that is the request's bearer token;
/// over stdio it is the session credential given at construction.
#[derive(Clone)]
pub struct SandboxServer {
    tools: SandboxTools,
    session_credential: Option<Credential>,
    tool_router: ToolRouter<Self>,
}

impl SandboxServer {
    /// Create a server whose credentials come from each HTTP request.
    #[must_use]
    pub fn new(tools: SandboxTools) -> Self {
        Self {
            tools,
            session_credential: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Use `credential` for calls that arrive without HTTP request parts
    /// (the stdio transport).
    #[must_use]
    pub fn with_session_credential(mut self, credential: Option<Credential>) -> Self {
        self.session_credential = credential;
        self
    }

    /// Names of all registered tools.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    /// Credential for a call whose transport attached `parts`, if any.
    ///
    /// HTTP calls always use their own request's credential, even when it is
    /// absent. Only calls without HTTP parts fall back to the session credential.
    fn credential_for(&self, parts: Option<&Parts>) -> Option<Credential> {
        match parts {
            Some(parts) => auth::credential_from_parts(parts),
            None => self.session_credential.clone(),
        }
    }
}

fn text(body: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(body)]))
}

#[tool_router]
impl SandboxServer {
    #[tool(description = "Check that the sandbox API is up.")]
    async fn health_check(&self) -> Result<CallToolResult, McpError> {
        text(self.tools.health_check().await)
    }

    #[tool(description = "List sandboxes, optionally filtered by status.")]
    async fn list_sandboxes(
        &self,
        Parameters(params): Parameters<ListSandboxesParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.list_sandboxes(params).await)
    }

    #[tool(
        description = "Create a sandbox from a template. Defaults: timeout_seconds=600, internet_access=true."
    )]
    async fn create_sandbox(
        &self,
        Parameters(params): Parameters<CreateSandboxParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.create_sandbox(params).await)
    }

    #[tool(description = "Get details of one sandbox.")]
    async fn get_sandbox(
        &self,
        Parameters(params): Parameters<SandboxIdParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_sandbox(params).await)
    }

    #[tool(description = "Delete a sandbox and everything in it.")]
    async fn delete_sandbox(
        &self,
        Parameters(params): Parameters<SandboxIdParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.delete_sandbox(params).await)
    }

    #[tool(description = "Resume a paused sandbox.")]
    async fn resume_sandbox(
        &self,
        Parameters(params): Parameters<SandboxIdParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.resume_sandbox(params).await)
    }

    #[tool(description = "Set how many seconds from now a sandbox stays alive.")]
    async fn update_sandbox_timeout(
        &self,
        Parameters(params): Parameters<UpdateSandboxTimeoutParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.update_sandbox_timeout(params).await)
    }

    #[tool(description = "List available sandbox templates.")]
    async fn list_templates(
        &self,
        Parameters(params): Parameters<ListTemplatesParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.list_templates(params).await)
    }

    #[tool(description = "Get details of one template by name.")]
    async fn get_template(
        &self,
        Parameters(params): Parameters<TemplateNameParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_template(params).await)
    }

    #[tool(
        description = "Run code. mode=isolated (default) uses a throwaway sandbox; persistent, rich and background run inside sandbox_id. Timeout defaults to 30 seconds."
    )]
    async fn execute_code(
        &self,
        Parameters(params): Parameters<ExecuteCodeParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.execute_code(params).await)
    }

    #[tool(
        description = "Run a shell command in a sandbox. Set background=true to return immediately. Working directory defaults to /workspace."
    )]
    async fn run_command(
        &self,
        Parameters(params): Parameters<RunCommandParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.run_command(params).await)
    }

    #[tool(description = "List background executions running in a sandbox.")]
    async fn list_processes(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.list_processes(params).await)
    }

    #[tool(description = "Kill a background execution by process id.")]
    async fn kill_process(
        &self,
        Parameters(params): Parameters<KillProcessParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.kill_process(params).await)
    }

    #[tool(description = "List all operating-system processes in a sandbox.")]
    async fn list_system_processes(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.list_system_processes(params).await)
    }

    #[tool(description = "Read a text file from a sandbox.")]
    async fn file_read(
        &self,
        Parameters(params): Parameters<FilePathParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_read(params).await)
    }

    #[tool(description = "Write a text file in a sandbox, replacing existing content.")]
    async fn file_write(
        &self,
        Parameters(params): Parameters<FileWriteParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_write(params).await)
    }

    #[tool(description = "List a directory in a sandbox. Path defaults to /workspace.")]
    async fn file_list(
        &self,
        Parameters(params): Parameters<FileListParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_list(params).await)
    }

    #[tool(description = "Check whether a path exists in a sandbox.")]
    async fn file_exists(
        &self,
        Parameters(params): Parameters<FilePathParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_exists(params).await)
    }

    #[tool(description = "Remove a file or directory in a sandbox.")]
    async fn file_remove(
        &self,
        Parameters(params): Parameters<FilePathParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_remove(params).await)
    }

    #[tool(description = "Create a directory in a sandbox, including parents.")]
    async fn file_mkdir(
        &self,
        Parameters(params): Parameters<FilePathParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.file_mkdir(params).await)
    }

    #[tool(description = "Check that the agent inside a sandbox responds.")]
    async fn ping_vm(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.ping_vm(params).await)
    }

    #[tool(description = "Get agent version and VM details for a sandbox.")]
    async fn get_vm_info(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_vm_info(params).await)
    }

    #[tool(description = "Get the public URL for a port exposed by a sandbox.")]
    async fn get_preview_url(
        &self,
        Parameters(params): Parameters<PreviewUrlParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_preview_url(params).await)
    }

    #[tool(description = "Get the public URL of the agent inside a sandbox.")]
    async fn get_agent_url(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_agent_url(params).await)
    }

    #[tool(description = "Get CPU, memory and disk usage of a sandbox.")]
    async fn get_system_metrics(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.get_system_metrics(params).await)
    }

    #[tool(description = "Get the environment variables of a sandbox.")]
    async fn env_get(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.env_get(params).await)
    }

    #[tool(
        description = "Set environment variables in a sandbox. merge=true (default) keeps existing variables; merge=false replaces them."
    )]
    async fn env_set(
        &self,
        Parameters(params): Parameters<EnvSetParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.env_set(params).await)
    }

    #[tool(description = "Remove all custom environment variables from a sandbox.")]
    async fn env_clear(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.env_clear(params).await)
    }

    #[tool(description = "Clear the execution cache of a sandbox.")]
    async fn cache_clear(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.cache_clear(params).await)
    }

    #[tool(description = "Get execution cache statistics of a sandbox.")]
    async fn cache_stats(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        text(self.tools.cache_stats(params).await)
    }
}

impl ServerHandler for SandboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Sandbox MCP bridge - create and manage cloud sandboxes, run code and commands, \
                 and work with files inside them. Authenticate with `Authorization: Bearer <api key>`."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            ..Default::default()
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credential = self.credential_for(context.extensions.get::<Parts>());
        debug!(
            tool = %request.name,
            authenticated = credential.is_some(),
            "Dispatching tool call"
        );

        let tcc = ToolCallContext::new(self, request, context);
        credential::establish(credential, self.tool_router.call(tcc)).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }
}

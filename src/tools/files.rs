//! Filesystem tools, served by the agent inside a sandbox.

use reqwest::Method;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{Action, SandboxTools, Validate, WORKSPACE_ROOT, require_non_empty, require_sandbox_id};
use crate::client::{ApiRequest, Target};
use crate::error::ToolError;

const FILE_READ: Action = Action {
    tool: "file_read",
    doing: "reading file",
    label: "File contents",
};
const FILE_WRITE: Action = Action {
    tool: "file_write",
    doing: "writing file",
    label: "File written",
};
const FILE_LIST: Action = Action {
    tool: "file_list",
    doing: "listing directory",
    label: "Directory listing",
};
const FILE_EXISTS: Action = Action {
    tool: "file_exists",
    doing: "checking file",
    label: "File status",
};
const FILE_REMOVE: Action = Action {
    tool: "file_remove",
    doing: "removing file",
    label: "File removed",
};
const FILE_MKDIR: Action = Action {
    tool: "file_mkdir",
    doing: "creating directory",
    label: "Directory created",
};

/// Input for tools that act on a single path.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FilePathParams {
    /// Sandbox holding the file.
    pub sandbox_id: String,
    /// Absolute path inside the sandbox.
    pub path: String,
}

impl Validate for FilePathParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        require_non_empty("path", &self.path)
    }
}

/// Input for `file_write`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FileWriteParams {
    /// Sandbox holding the file.
    pub sandbox_id: String,
    /// Absolute path inside the sandbox. Parent directories must exist.
    pub path: String,
    /// Text content to write. Replaces any existing content.
    pub content: String,
}

impl Validate for FileWriteParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        require_non_empty("path", &self.path)
    }
}

/// Input for `file_list`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FileListParams {
    /// Sandbox to inspect.
    pub sandbox_id: String,
    /// Directory to list. Defaults to `/workspace`.
    pub path: Option<String>,
}

impl Validate for FileListParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        match &self.path {
            Some(path) => require_non_empty("path", path),
            None => Ok(()),
        }
    }
}

fn agent(sandbox_id: &str, method: Method, op: &str) -> ApiRequest {
    ApiRequest::new(Target::Agent(sandbox_id.to_string()), method, &["files", op])
}

impl SandboxTools {
    /// `GET /files/read?path=`
    pub async fn file_read(&self, params: FilePathParams) -> String {
        self.run(&FILE_READ, &params, |p| {
            agent(&p.sandbox_id, Method::GET, "read").query("path", &p.path)
        })
        .await
    }

    /// `POST /files/write`
    pub async fn file_write(&self, params: FileWriteParams) -> String {
        self.run(&FILE_WRITE, &params, |p| {
            agent(&p.sandbox_id, Method::POST, "write")
                .json(json!({ "path": p.path, "content": p.content }))
        })
        .await
    }

    /// `GET /files/list?path=`
    pub async fn file_list(&self, params: FileListParams) -> String {
        self.run(&FILE_LIST, &params, |p| {
            agent(&p.sandbox_id, Method::GET, "list")
                .query("path", p.path.as_deref().unwrap_or(WORKSPACE_ROOT))
        })
        .await
    }

    /// `GET /files/exists?path=`
    pub async fn file_exists(&self, params: FilePathParams) -> String {
        self.run(&FILE_EXISTS, &params, |p| {
            agent(&p.sandbox_id, Method::GET, "exists").query("path", &p.path)
        })
        .await
    }

    /// `DELETE /files/remove?path=`
    pub async fn file_remove(&self, params: FilePathParams) -> String {
        self.run(&FILE_REMOVE, &params, |p| {
            agent(&p.sandbox_id, Method::DELETE, "remove").query("path", &p.path)
        })
        .await
    }

    /// `POST /files/mkdir`
    pub async fn file_mkdir(&self, params: FilePathParams) -> String {
        self.run(&FILE_MKDIR, &params, |p| {
            agent(&p.sandbox_id, Method::POST, "mkdir").json(json!({ "path": p.path }))
        })
        .await
    }
}

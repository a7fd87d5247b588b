//! Sandbox and template lifecycle tools. All of them talk to the control plane.

use std::collections::BTreeMap;

use reqwest::Method;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{Action, SandboxTools, Validate, require_non_empty, require_positive, require_sandbox_id};
use crate::client::{ApiRequest, Target};
use crate::error::ToolError;

/// Sandbox lifetime, in seconds, used when `create_sandbox` names none.
pub const DEFAULT_SANDBOX_TIMEOUT_SECS: u64 = 600;

const HEALTH_CHECK: Action = Action {
    tool: "health_check",
    doing: "checking API health",
    label: "API health",
};
const LIST_SANDBOXES: Action = Action {
    tool: "list_sandboxes",
    doing: "listing sandboxes",
    label: "Sandboxes",
};
const CREATE_SANDBOX: Action = Action {
    tool: "create_sandbox",
    doing: "creating sandbox",
    label: "Sandbox created",
};
const GET_SANDBOX: Action = Action {
    tool: "get_sandbox",
    doing: "getting sandbox",
    label: "Sandbox",
};
const DELETE_SANDBOX: Action = Action {
    tool: "delete_sandbox",
    doing: "deleting sandbox",
    label: "Sandbox deleted",
};
const RESUME_SANDBOX: Action = Action {
    tool: "resume_sandbox",
    doing: "resuming sandbox",
    label: "Sandbox resumed",
};
const UPDATE_SANDBOX_TIMEOUT: Action = Action {
    tool: "update_sandbox_timeout",
    doing: "updating sandbox timeout",
    label: "Sandbox timeout updated",
};
const LIST_TEMPLATES: Action = Action {
    tool: "list_templates",
    doing: "listing templates",
    label: "Templates",
};
const GET_TEMPLATE: Action = Action {
    tool: "get_template",
    doing: "getting template",
    label: "Template",
};

/// Input for `list_sandboxes`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListSandboxesParams {
    /// Maximum number of sandboxes to return.
    pub limit: Option<u32>,
    /// Only return sandboxes in this state (e.g. `running`, `paused`).
    pub status: Option<String>,
}

impl Validate for ListSandboxesParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_positive("limit", self.limit.map(u64::from))
    }
}

/// Input for `create_sandbox`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CreateSandboxParams {
    /// Template to boot the sandbox from (e.g. `code-interpreter`).
    pub template_id: String,
    /// Seconds before the sandbox is stopped. Defaults to 600.
    pub timeout_seconds: Option<u64>,
    /// Whether the sandbox may reach the internet. Defaults to true.
    pub internet_access: Option<bool>,
    /// Region to place the sandbox in.
    pub region: Option<String>,
    /// Environment variables set at boot.
    pub env_vars: Option<BTreeMap<String, String>>,
}

impl Validate for CreateSandboxParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_non_empty("template_id", &self.template_id)?;
        require_positive("timeout_seconds", self.timeout_seconds)
    }
}

/// Input for tools that address a sandbox on the control plane.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SandboxIdParams {
    /// Sandbox identifier.
    pub id: String,
}

impl Validate for SandboxIdParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("id", &self.id)
    }
}

/// Input for `update_sandbox_timeout`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct UpdateSandboxTimeoutParams {
    /// Sandbox identifier.
    pub id: String,
    /// New lifetime in seconds, counted from now.
    pub timeout_seconds: u64,
}

impl Validate for UpdateSandboxTimeoutParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("id", &self.id)?;
        require_positive("timeout_seconds", Some(self.timeout_seconds))
    }
}

/// Input for `list_templates`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTemplatesParams {
    /// Maximum number of templates to return.
    pub limit: Option<u32>,
    /// Comma-separated list of fields to include.
    pub fields: Option<String>,
}

impl Validate for ListTemplatesParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_positive("limit", self.limit.map(u64::from))
    }
}

/// Input for `get_template`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TemplateNameParams {
    /// Template name.
    pub name: String,
}

impl Validate for TemplateNameParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_non_empty("name", &self.name)
    }
}

impl SandboxTools {
    /// `GET /health`
    pub async fn health_check(&self) -> String {
        self.run(&HEALTH_CHECK, &(), |_| {
            ApiRequest::new(Target::ControlPlane, Method::GET, &["health"])
        })
        .await
    }

    /// `GET /v1/sandboxes`
    pub async fn list_sandboxes(&self, params: ListSandboxesParams) -> String {
        self.run(&LIST_SANDBOXES, &params, |p| {
            ApiRequest::new(Target::ControlPlane, Method::GET, &["v1", "sandboxes"])
                .query_opt("limit", p.limit)
                .query_opt("status", p.status.as_deref())
        })
        .await
    }

    /// `POST /v1/sandboxes`
    pub async fn create_sandbox(&self, params: CreateSandboxParams) -> String {
        self.run(&CREATE_SANDBOX, &params, |p| {
            let mut body = json!({
                "template_id": p.template_id,
                "timeout_seconds": p.timeout_seconds.unwrap_or(DEFAULT_SANDBOX_TIMEOUT_SECS),
                "internet_access": p.internet_access.unwrap_or(true),
            });
            if let Some(region) = &p.region {
                body["region"] = json!(region);
            }
            if let Some(env_vars) = &p.env_vars {
                body["env_vars"] = json!(env_vars);
            }
            ApiRequest::new(Target::ControlPlane, Method::POST, &["v1", "sandboxes"]).json(body)
        })
        .await
    }

    /// `GET /v1/sandboxes/{id}`
    pub async fn get_sandbox(&self, params: SandboxIdParams) -> String {
        self.run(&GET_SANDBOX, &params, |p| {
            ApiRequest::new(Target::ControlPlane, Method::GET, &["v1", "sandboxes", p.id.as_str()])
        })
        .await
    }

    /// `DELETE /v1/sandboxes/{id}`
    pub async fn delete_sandbox(&self, params: SandboxIdParams) -> String {
        self.run(&DELETE_SANDBOX, &params, |p| {
            ApiRequest::new(Target::ControlPlane, Method::DELETE, &["v1", "sandboxes", p.id.as_str()])
        })
        .await
    }

    /// `POST /v1/sandboxes/{id}/resume`
    pub async fn resume_sandbox(&self, params: SandboxIdParams) -> String {
        self.run(&RESUME_SANDBOX, &params, |p| {
            ApiRequest::new(
                Target::ControlPlane,
                Method::POST,
                &["v1", "sandboxes", p.id.as_str(), "resume"],
            )
        })
        .await
    }

    /// `PUT /v1/sandboxes/{id}/timeout`
    pub async fn update_sandbox_timeout(&self, params: UpdateSandboxTimeoutParams) -> String {
        self.run(&UPDATE_SANDBOX_TIMEOUT, &params, |p| {
            ApiRequest::new(
                Target::ControlPlane,
                Method::PUT,
                &["v1", "sandboxes", p.id.as_str(), "timeout"],
            )
            .json(json!({ "timeout_seconds": p.timeout_seconds }))
        })
        .await
    }

    /// `GET /v1/templates`
    pub async fn list_templates(&self, params: ListTemplatesParams) -> String {
        self.run(&LIST_TEMPLATES, &params, |p| {
            ApiRequest::new(Target::ControlPlane, Method::GET, &["v1", "templates"])
                .query_opt("limit", p.limit)
                .query_opt("fields", p.fields.as_deref())
        })
        .await
    }

    /// `GET /v1/templates/{name}`
    pub async fn get_template(&self, params: TemplateNameParams) -> String {
        self.run(&GET_TEMPLATE, &params, |p| {
            ApiRequest::new(Target::ControlPlane, Method::GET, &["v1", "templates", p.name.as_str()])
        })
        .await
    }
}

//! Agent health, VM details, public URLs and system metrics.

use reqwest::Method;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{Action, AgentParams, SandboxTools, Validate, require_sandbox_id};
use crate::client::{ApiRequest, Target};
use crate::error::ToolError;

const PING_VM: Action = Action {
    tool: "ping_vm",
    doing: "pinging sandbox agent",
    label: "Agent is reachable",
};
const GET_VM_INFO: Action = Action {
    tool: "get_vm_info",
    doing: "getting VM info",
    label: "VM info",
};
const GET_PREVIEW_URL: Action = Action {
    tool: "get_preview_url",
    doing: "getting preview URL",
    label: "Preview URL",
};
const GET_AGENT_URL: Action = Action {
    tool: "get_agent_url",
    doing: "getting agent URL",
    label: "Agent URL",
};
const GET_SYSTEM_METRICS: Action = Action {
    tool: "get_system_metrics",
    doing: "getting system metrics",
    label: "System metrics",
};
const LIST_SYSTEM_PROCESSES: Action = Action {
    tool: "list_system_processes",
    doing: "listing system processes",
    label: "System processes",
};

/// Input for `get_preview_url`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct PreviewUrlParams {
    /// Sandbox exposing the port.
    pub sandbox_id: String,
    /// Port a service inside the sandbox listens on.
    pub port: u16,
}

impl Validate for PreviewUrlParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        if self.port == 0 {
            return Err(ToolError::invalid("port", "must be between 1 and 65535"));
        }
        Ok(())
    }
}

fn preview(sandbox_id: &str, port: u16) -> ApiRequest {
    ApiRequest::new(
        Target::ControlPlane,
        Method::GET,
        &["v1", "sandboxes", sandbox_id, "preview"],
    )
    .query("port", port)
}

impl SandboxTools {
    /// `GET /ping` on the agent.
    pub async fn ping_vm(&self, params: AgentParams) -> String {
        self.run(&PING_VM, &params, |p| {
            ApiRequest::new(Target::Agent(p.sandbox_id.clone()), Method::GET, &["ping"])
        })
        .await
    }

    /// `GET /info` on the agent.
    pub async fn get_vm_info(&self, params: AgentParams) -> String {
        self.run(&GET_VM_INFO, &params, |p| {
            ApiRequest::new(Target::Agent(p.sandbox_id.clone()), Method::GET, &["info"])
        })
        .await
    }

    /// `GET /v1/sandboxes/{id}/preview?port=`
    pub async fn get_preview_url(&self, params: PreviewUrlParams) -> String {
        self.run(&GET_PREVIEW_URL, &params, |p| preview(&p.sandbox_id, p.port))
            .await
    }

    /// Preview URL of the agent's own port.
    pub async fn get_agent_url(&self, params: AgentParams) -> String {
        let port = self.client().config().agent_port;
        self.run(&GET_AGENT_URL, &params, |p| preview(&p.sandbox_id, port))
            .await
    }

    /// `GET /system` on the agent.
    pub async fn get_system_metrics(&self, params: AgentParams) -> String {
        self.run(&GET_SYSTEM_METRICS, &params, |p| {
            ApiRequest::new(Target::Agent(p.sandbox_id.clone()), Method::GET, &["system"])
        })
        .await
    }

    /// `GET /system/processes` on the agent.
    pub async fn list_system_processes(&self, params: AgentParams) -> String {
        self.run(&LIST_SYSTEM_PROCESSES, &params, |p| {
            ApiRequest::new(
                Target::Agent(p.sandbox_id.clone()),
                Method::GET,
                &["system", "processes"],
            )
        })
        .await
    }
}

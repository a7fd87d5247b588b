//! Environment variables and the agent's execution cache.

use std::collections::BTreeMap;

use reqwest::Method;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{Action, AgentParams, SandboxTools, Validate, require_sandbox_id};
use crate::client::{ApiRequest, Target};
use crate::error::ToolError;

const ENV_GET: Action = Action {
    tool: "env_get",
    doing: "getting environment variables",
    label: "Environment variables",
};
const ENV_SET: Action = Action {
    tool: "env_set",
    doing: "setting environment variables",
    label: "Environment variables updated",
};
const ENV_CLEAR: Action = Action {
    tool: "env_clear",
    doing: "clearing environment variables",
    label: "Environment variables cleared",
};
const CACHE_CLEAR: Action = Action {
    tool: "cache_clear",
    doing: "clearing cache",
    label: "Cache cleared",
};
const CACHE_STATS: Action = Action {
    tool: "cache_stats",
    doing: "getting cache stats",
    label: "Cache stats",
};

/// Input for `env_set`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct EnvSetParams {
    /// Sandbox to update.
    pub sandbox_id: String,
    /// Variables to set.
    pub env_vars: BTreeMap<String, String>,
    /// Merge into the existing environment (true, the default) or replace it.
    pub merge: Option<bool>,
}

impl Validate for EnvSetParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        if self.env_vars.keys().any(|k| k.trim().is_empty()) {
            return Err(ToolError::invalid("env_vars", "variable names must not be empty"));
        }
        Ok(())
    }
}

fn agent(sandbox_id: &str, method: Method, segments: &[&str]) -> ApiRequest {
    ApiRequest::new(Target::Agent(sandbox_id.to_string()), method, segments)
}

impl SandboxTools {
    /// `GET /env`
    pub async fn env_get(&self, params: AgentParams) -> String {
        self.run(&ENV_GET, &params, |p| agent(&p.sandbox_id, Method::GET, &["env"]))
            .await
    }

    /// `PATCH /env` when merging, `PUT /env` when replacing.
    pub async fn env_set(&self, params: EnvSetParams) -> String {
        self.run(&ENV_SET, &params, |p| {
            let method = if p.merge.unwrap_or(true) {
                Method::PATCH
            } else {
                Method::PUT
            };
            agent(&p.sandbox_id, method, &["env"]).json(json!({ "env_vars": p.env_vars }))
        })
        .await
    }

    /// `DELETE /env`
    pub async fn env_clear(&self, params: AgentParams) -> String {
        self.run(&ENV_CLEAR, &params, |p| agent(&p.sandbox_id, Method::DELETE, &["env"]))
            .await
    }

    /// `POST /cache/clear`
    pub async fn cache_clear(&self, params: AgentParams) -> String {
        self.run(&CACHE_CLEAR, &params, |p| {
            agent(&p.sandbox_id, Method::POST, &["cache", "clear"])
        })
        .await
    }

    /// `GET /cache/stats`
    pub async fn cache_stats(&self, params: AgentParams) -> String {
        self.run(&CACHE_STATS, &params, |p| {
            agent(&p.sandbox_id, Method::GET, &["cache", "stats"])
        })
        .await
    }
}

//! Code execution, shell commands and process management.
//!
//! `execute_code` is the only tool whose endpoint depends on its input: the
//! `mode` field selects one of four backends. Isolated runs go to the control
//! plane and need no sandbox; the other modes run inside an existing sandbox.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AgentParams, Action, DEFAULT_EXEC_TIMEOUT_SECS, SandboxTools, Validate, WORKSPACE_ROOT,
    require_non_empty, require_positive, require_sandbox_id,
};
use crate::client::{ApiRequest, Target};
use crate::error::ToolError;

/// Language used when `execute_code` names none.
pub const DEFAULT_LANGUAGE: &str = "python";

const EXECUTE_CODE: Action = Action {
    tool: "execute_code",
    doing: "executing code",
    label: "Execution result",
};
const RUN_COMMAND: Action = Action {
    tool: "run_command",
    doing: "running command",
    label: "Command result",
};
const LIST_PROCESSES: Action = Action {
    tool: "list_processes",
    doing: "listing processes",
    label: "Background processes",
};
const KILL_PROCESS: Action = Action {
    tool: "kill_process",
    doing: "killing process",
    label: "Process killed",
};

/// Where `execute_code` runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Throwaway sandbox managed by the control plane.
    #[default]
    Isolated,
    /// Inside an existing sandbox, sharing its state between runs.
    Persistent,
    /// Inside an existing sandbox, capturing rich outputs (plots, tables).
    Rich,
    /// Inside an existing sandbox, returning immediately with a process id.
    Background,
}

impl ExecutionMode {
    fn segments(self) -> &'static [&'static str] {
        match self {
            Self::Isolated => &["v1", "execute", "isolated"],
            Self::Persistent => &["execute"],
            Self::Rich => &["execute", "rich"],
            Self::Background => &["execute", "background"],
        }
    }
}

/// Input for `execute_code`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExecuteCodeParams {
    /// Source code to run.
    pub code: String,
    /// Language of `code`. Defaults to `python`.
    pub language: Option<String>,
    /// Execution backend. Defaults to `isolated`.
    pub mode: Option<ExecutionMode>,
    /// Sandbox to run in. Required for every mode except `isolated`.
    pub sandbox_id: Option<String>,
    /// Timeout in seconds. Defaults to 30.
    pub timeout: Option<u64>,
    /// Working directory inside the sandbox.
    pub working_dir: Option<String>,
    /// Extra environment variables for this run.
    pub env: Option<BTreeMap<String, String>>,
    /// Label for a background process.
    pub name: Option<String>,
}

impl ExecuteCodeParams {
    fn mode(&self) -> ExecutionMode {
        self.mode.unwrap_or_default()
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_EXEC_TIMEOUT_SECS)
    }

    /// Validates and builds the request for the selected mode.
    fn request(&self) -> Result<ApiRequest, ToolError> {
        self.validate()?;

        let mode = self.mode();
        let target = match (mode, self.sandbox_id.as_deref()) {
            (ExecutionMode::Isolated, _) => Target::ControlPlane,
            (_, Some(id)) => Target::Agent(id.to_string()),
            (_, None) => {
                return Err(ToolError::invalid(
                    "sandbox_id",
                    "required unless mode is `isolated`",
                ));
            }
        };

        let mut body = json!({
            "code": self.code,
            "language": self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE),
            "timeout": self.timeout_secs(),
        });
        insert_opt(&mut body, "env", self.env.as_ref().map(|env| json!(env)));
        if mode != ExecutionMode::Isolated {
            insert_opt(&mut body, "working_dir", self.working_dir.as_deref().map(Value::from));
        }
        if mode == ExecutionMode::Background {
            insert_opt(&mut body, "name", self.name.as_deref().map(Value::from));
        }

        Ok(ApiRequest::new(target, Method::POST, mode.segments())
            .json(body)
            .timeout(Duration::from_secs(self.timeout_secs())))
    }
}

impl Validate for ExecuteCodeParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_non_empty("code", &self.code)?;
        require_positive("timeout", self.timeout)?;
        if let Some(id) = &self.sandbox_id {
            require_sandbox_id("sandbox_id", id)?;
        }
        Ok(())
    }
}

/// Input for `run_command`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RunCommandParams {
    /// Sandbox to run in.
    pub sandbox_id: String,
    /// Shell command line.
    pub command: String,
    /// Timeout in seconds. Defaults to 30.
    pub timeout: Option<u64>,
    /// Working directory. Defaults to `/workspace`.
    pub working_dir: Option<String>,
    /// Extra environment variables for this command.
    pub env: Option<BTreeMap<String, String>>,
    /// Start the command in the background and return immediately.
    #[serde(default)]
    pub background: bool,
}

impl Validate for RunCommandParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        require_non_empty("command", &self.command)?;
        require_positive("timeout", self.timeout)
    }
}

/// Input for `kill_process`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct KillProcessParams {
    /// Sandbox the process runs in.
    pub sandbox_id: String,
    /// Process id as returned by a background execution.
    pub process_id: String,
}

impl Validate for KillProcessParams {
    fn validate(&self) -> Result<(), ToolError> {
        require_sandbox_id("sandbox_id", &self.sandbox_id)?;
        require_non_empty("process_id", &self.process_id)
    }
}

impl SandboxTools {
    /// `POST /v1/execute/isolated`, `/execute`, `/execute/rich` or
    /// `/execute/background`, depending on `mode`.
    pub async fn execute_code(&self, params: ExecuteCodeParams) -> String {
        self.send(&EXECUTE_CODE, params.request()).await
    }

    /// `POST /commands/run`, or `/commands/background` when `background` is set.
    pub async fn run_command(&self, params: RunCommandParams) -> String {
        self.run(&RUN_COMMAND, &params, |p| {
            let endpoint = if p.background { "background" } else { "run" };
            let timeout = p.timeout.unwrap_or(DEFAULT_EXEC_TIMEOUT_SECS);

            let mut body = json!({
                "command": p.command,
                "timeout": timeout,
                "working_dir": p.working_dir.as_deref().unwrap_or(WORKSPACE_ROOT),
            });
            insert_opt(&mut body, "env", p.env.as_ref().map(|env| json!(env)));

            ApiRequest::new(
                Target::Agent(p.sandbox_id.clone()),
                Method::POST,
                &["commands", endpoint],
            )
            .json(body)
            .timeout(Duration::from_secs(timeout))
        })
        .await
    }

    /// `GET /execute/processes`
    pub async fn list_processes(&self, params: AgentParams) -> String {
        self.run(&LIST_PROCESSES, &params, |p| {
            ApiRequest::new(
                Target::Agent(p.sandbox_id.clone()),
                Method::GET,
                &["execute", "processes"],
            )
        })
        .await
    }

    /// `DELETE /execute/kill?process_id=`
    pub async fn kill_process(&self, params: KillProcessParams) -> String {
        self.run(&KILL_PROCESS, &params, |p| {
            ApiRequest::new(
                Target::Agent(p.sandbox_id.clone()),
                Method::DELETE,
                &["execute", "kill"],
            )
            .query("process_id", &p.process_id)
        })
        .await
    }
}

fn insert_opt(body: &mut Value, key: &str, value: Option<Value>) {
    if let (Some(value), Some(map)) = (value, body.as_object_mut()) {
        map.insert(key.to_string(), value);
    }
}

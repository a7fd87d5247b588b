//! Integration tests for the tool catalogue.
//!
//! These tests verify:
//! - Each tool issues exactly one request to its documented endpoint
//! - Documented defaults are filled in for omitted fields
//! - Backend error statuses and transport failures come back as text
//! - Invalid arguments never reach the network

mod common;

use std::collections::BTreeMap;

use sandbox_mcp_bridge::client::{ApiClient, ApiConfig, ControlPlaneAuth};
use sandbox_mcp_bridge::tools::{
    AgentParams, CreateSandboxParams, EnvSetParams, ExecuteCodeParams, ExecutionMode,
    FileListParams, FilePathParams, FileWriteParams, KillProcessParams, ListTemplatesParams,
    PreviewUrlParams, RunCommandParams, SandboxIdParams, SandboxTools, UpdateSandboxTimeoutParams,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{as_caller, backend, received, tools_for};

const TOKEN: &str = "test-token";

fn agent(sandbox_id: &str) -> AgentParams {
    AgentParams {
        sandbox_id: sandbox_id.into(),
    }
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

// =============================================================================
// Sandbox Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_create_sandbox_applies_defaults() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/v1/sandboxes"))
        .and(body_json(json!({
            "template_id": "code-interpreter",
            "timeout_seconds": 600,
            "internet_access": true
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "sbx_new", "status": "running"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.create_sandbox(CreateSandboxParams {
            template_id: "code-interpreter".into(),
            ..Default::default()
        }),
    )
    .await;

    assert!(text.starts_with("Sandbox created:"), "{text}");
    assert!(text.contains("\"sbx_new\""), "{text}");
}

#[tokio::test]
async fn test_create_sandbox_forwards_optional_fields() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/v1/sandboxes"))
        .and(body_json(json!({
            "template_id": "node",
            "timeout_seconds": 60,
            "internet_access": false,
            "region": "eu-west",
            "env_vars": {"A": "1"}
        })))
        .respond_with(ok(json!({"id": "sbx_2"})))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.create_sandbox(CreateSandboxParams {
            template_id: "node".into(),
            timeout_seconds: Some(60),
            internet_access: Some(false),
            region: Some("eu-west".into()),
            env_vars: Some(BTreeMap::from([("A".to_string(), "1".to_string())])),
        }),
    )
    .await;

    assert!(text.starts_with("Sandbox created:"), "{text}");
}

#[tokio::test]
async fn test_delete_sandbox_not_found_is_text() {
    let (server, tools) = backend().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/sandboxes/sbx_1"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "sandbox sbx_1 not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.delete_sandbox(SandboxIdParams { id: "sbx_1".into() }),
    )
    .await;

    assert!(text.starts_with("Error deleting sandbox: "), "{text}");
    assert!(text.contains("404"), "{text}");
    assert!(text.contains("sandbox sbx_1 not found"), "{text}");
}

#[tokio::test]
async fn test_get_sandbox_is_idempotent() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/v1/sandboxes/sbx_1"))
        .respond_with(ok(json!({"id": "sbx_1", "status": "running"})))
        .expect(2)
        .mount(&server)
        .await;

    let params = SandboxIdParams { id: "sbx_1".into() };
    let first = as_caller(TOKEN, tools.get_sandbox(params.clone())).await;
    let second = as_caller(TOKEN, tools.get_sandbox(params)).await;
    assert_eq!(first, second);

    let requests = received(&server).await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, requests[1].url);
    assert_eq!(requests[0].method, requests[1].method);
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn test_resume_and_update_timeout() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/v1/sandboxes/sbx_1/resume"))
        .respond_with(ok(json!({"status": "running"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sandboxes/sbx_1/timeout"))
        .and(body_json(json!({"timeout_seconds": 1200})))
        .respond_with(ok(json!({"timeout_seconds": 1200})))
        .expect(1)
        .mount(&server)
        .await;

    let resumed = as_caller(
        TOKEN,
        tools.resume_sandbox(SandboxIdParams { id: "sbx_1".into() }),
    )
    .await;
    assert!(resumed.starts_with("Sandbox resumed:"), "{resumed}");

    let updated = as_caller(
        TOKEN,
        tools.update_sandbox_timeout(UpdateSandboxTimeoutParams {
            id: "sbx_1".into(),
            timeout_seconds: 1200,
        }),
    )
    .await;
    assert!(updated.starts_with("Sandbox timeout updated:"), "{updated}");
}

#[tokio::test]
async fn test_list_templates_passes_query() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/v1/templates"))
        .and(query_param("limit", "5"))
        .and(query_param("fields", "name,language"))
        .respond_with(ok(json!([{"name": "python"}])))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.list_templates(ListTemplatesParams {
            limit: Some(5),
            fields: Some("name,language".into()),
        }),
    )
    .await;
    assert!(text.starts_with("Templates:"), "{text}");
}

#[tokio::test]
async fn test_health_check() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ok(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(TOKEN, tools.health_check()).await;
    assert!(text.starts_with("API health:"), "{text}");
}

// =============================================================================
// Execution Tests
// =============================================================================

#[tokio::test]
async fn test_execute_code_default_timeout() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/v1/execute/isolated"))
        .and(body_json(json!({
            "code": "print(1)",
            "language": "python",
            "timeout": 30
        })))
        .respond_with(ok(json!({"stdout": "1\n", "exit_code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.execute_code(ExecuteCodeParams {
            code: "print(1)".into(),
            ..Default::default()
        }),
    )
    .await;
    assert!(text.starts_with("Execution result:"), "{text}");
}

#[tokio::test]
async fn test_execute_code_modes_hit_one_endpoint_each() {
    let cases = [
        (ExecutionMode::Persistent, "/agents/sbx_1/execute"),
        (ExecutionMode::Rich, "/agents/sbx_1/execute/rich"),
        (ExecutionMode::Background, "/agents/sbx_1/execute/background"),
    ];

    for (mode, endpoint) in cases {
        let (server, tools) = backend().await;

        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ok(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let text = as_caller(
            TOKEN,
            tools.execute_code(ExecuteCodeParams {
                code: "x = 1".into(),
                mode: Some(mode),
                sandbox_id: Some("sbx_1".into()),
                timeout: Some(10),
                ..Default::default()
            }),
        )
        .await;
        assert!(text.starts_with("Execution result:"), "{mode:?}: {text}");

        let requests = received(&server).await;
        assert_eq!(requests.len(), 1, "{mode:?}");
        let body: Value = requests[0].body_json().expect("json body");
        assert_eq!(body["timeout"], 10);
    }
}

#[tokio::test]
async fn test_execute_code_agent_mode_without_sandbox_is_rejected() {
    let (server, tools) = backend().await;

    let text = as_caller(
        TOKEN,
        tools.execute_code(ExecuteCodeParams {
            code: "x = 1".into(),
            mode: Some(ExecutionMode::Persistent),
            ..Default::default()
        }),
    )
    .await;

    assert!(text.starts_with("Error executing code: invalid argument `sandbox_id`"), "{text}");
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_run_command_defaults_and_background() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/commands/run"))
        .and(body_json(json!({
            "command": "ls -la",
            "timeout": 30,
            "working_dir": "/workspace"
        })))
        .respond_with(ok(json!({"stdout": "", "exit_code": 0})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/commands/background"))
        .respond_with(ok(json!({"process_id": "p1"})))
        .expect(1)
        .mount(&server)
        .await;

    let sync = as_caller(
        TOKEN,
        tools.run_command(RunCommandParams {
            sandbox_id: "sbx_1".into(),
            command: "ls -la".into(),
            ..Default::default()
        }),
    )
    .await;
    assert!(sync.starts_with("Command result:"), "{sync}");

    let background = as_caller(
        TOKEN,
        tools.run_command(RunCommandParams {
            sandbox_id: "sbx_1".into(),
            command: "sleep 100".into(),
            background: true,
            ..Default::default()
        }),
    )
    .await;
    assert!(background.contains("\"p1\""), "{background}");
}

#[tokio::test]
async fn test_process_tools() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/execute/processes"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/agents/sbx_1/execute/kill"))
        .and(query_param("process_id", "p1"))
        .respond_with(ok(json!({"killed": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/system/processes"))
        .respond_with(ok(json!([{"pid": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    as_caller(TOKEN, async {
        assert!(tools.list_processes(agent("sbx_1")).await.starts_with("Background processes:"));
        let killed = tools
            .kill_process(KillProcessParams {
                sandbox_id: "sbx_1".into(),
                process_id: "p1".into(),
            })
            .await;
        assert!(killed.starts_with("Process killed:"), "{killed}");
        assert!(
            tools
                .list_system_processes(agent("sbx_1"))
                .await
                .starts_with("System processes:")
        );
    })
    .await;
}

// =============================================================================
// File Tests
// =============================================================================

#[tokio::test]
async fn test_file_list_defaults_to_workspace() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/files/list"))
        .and(query_param("path", "/workspace"))
        .respond_with(ok(json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(
        TOKEN,
        tools.file_list(FileListParams {
            sandbox_id: "sbx_1".into(),
            path: None,
        }),
    )
    .await;
    assert!(text.starts_with("Directory listing:"), "{text}");
}

#[tokio::test]
async fn test_file_operations_use_documented_endpoints() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/files/read"))
        .and(query_param("path", "/workspace/a.txt"))
        .respond_with(ok(json!({"content": "hello"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/files/write"))
        .and(body_json(json!({"path": "/workspace/a.txt", "content": "hello"})))
        .respond_with(ok(json!({"written": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/agents/sbx_1/files/remove"))
        .and(query_param("path", "/workspace/a.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/files/mkdir"))
        .and(body_json(json!({"path": "/workspace/dir"})))
        .respond_with(ok(json!({"created": true})))
        .expect(1)
        .mount(&server)
        .await;

    let file = |p: &str| FilePathParams {
        sandbox_id: "sbx_1".into(),
        path: p.into(),
    };

    as_caller(TOKEN, async {
        let written = tools
            .file_write(FileWriteParams {
                sandbox_id: "sbx_1".into(),
                path: "/workspace/a.txt".into(),
                content: "hello".into(),
            })
            .await;
        assert!(written.starts_with("File written:"), "{written}");

        let read = tools.file_read(file("/workspace/a.txt")).await;
        assert!(read.contains("hello"), "{read}");

        let removed = tools.file_remove(file("/workspace/a.txt")).await;
        assert_eq!(removed, "File removed:\nnull");

        let made = tools.file_mkdir(file("/workspace/dir")).await;
        assert!(made.starts_with("Directory created:"), "{made}");
    })
    .await;
}

#[tokio::test]
async fn test_empty_path_is_rejected_locally() {
    let (server, tools) = backend().await;

    let text = as_caller(
        TOKEN,
        tools.file_read(FilePathParams {
            sandbox_id: "sbx_1".into(),
            path: String::new(),
        }),
    )
    .await;

    assert_eq!(
        text,
        "Error reading file: invalid argument `path`: must not be empty"
    );
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_hostile_sandbox_id_is_rejected_locally() {
    let (server, tools) = backend().await;

    let text = as_caller(TOKEN, tools.ping_vm(agent("evil.com/x"))).await;

    assert!(text.starts_with("Error pinging sandbox agent: invalid argument `sandbox_id`"), "{text}");
    assert!(received(&server).await.is_empty());
}

// =============================================================================
// VM, Environment and Cache Tests
// =============================================================================

#[tokio::test]
async fn test_vm_tools() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/ping"))
        .respond_with(ok(json!({"pong": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/info"))
        .respond_with(ok(json!({"agent_version": "1.0"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/system"))
        .respond_with(ok(json!({"cpu": 0.1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sandboxes/sbx_1/preview"))
        .and(query_param("port", "3000"))
        .respond_with(ok(json!({"url": "https://3000-sbx_1.example.dev"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sandboxes/sbx_1/preview"))
        .and(query_param("port", "7777"))
        .respond_with(ok(json!({"url": "https://7777-sbx_1.example.dev"})))
        .expect(1)
        .mount(&server)
        .await;

    as_caller(TOKEN, async {
        assert!(tools.ping_vm(agent("sbx_1")).await.starts_with("Agent is reachable:"));
        assert!(tools.get_vm_info(agent("sbx_1")).await.contains("agent_version"));
        assert!(tools.get_system_metrics(agent("sbx_1")).await.starts_with("System metrics:"));

        let preview = tools
            .get_preview_url(PreviewUrlParams {
                sandbox_id: "sbx_1".into(),
                port: 3000,
            })
            .await;
        assert!(preview.contains("3000-sbx_1"), "{preview}");

        let agent_url = tools.get_agent_url(agent("sbx_1")).await;
        assert!(agent_url.starts_with("Agent URL:"), "{agent_url}");
        assert!(agent_url.contains("7777-sbx_1"), "{agent_url}");
    })
    .await;
}

#[tokio::test]
async fn test_env_set_merge_and_replace() {
    let (server, tools) = backend().await;
    let vars = BTreeMap::from([("API_URL".to_string(), "http://x".to_string())]);

    Mock::given(method("PATCH"))
        .and(path("/agents/sbx_1/env"))
        .and(body_json(json!({"env_vars": {"API_URL": "http://x"}})))
        .respond_with(ok(json!({"API_URL": "http://x", "HOME": "/root"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/agents/sbx_1/env"))
        .and(body_json(json!({"env_vars": {"API_URL": "http://x"}})))
        .respond_with(ok(json!({"API_URL": "http://x"})))
        .expect(1)
        .mount(&server)
        .await;

    as_caller(TOKEN, async {
        let merged = tools
            .env_set(EnvSetParams {
                sandbox_id: "sbx_1".into(),
                env_vars: vars.clone(),
                merge: None,
            })
            .await;
        assert!(merged.starts_with("Environment variables updated:"), "{merged}");

        let replaced = tools
            .env_set(EnvSetParams {
                sandbox_id: "sbx_1".into(),
                env_vars: vars.clone(),
                merge: Some(false),
            })
            .await;
        assert!(replaced.starts_with("Environment variables updated:"), "{replaced}");
    })
    .await;
}

#[tokio::test]
async fn test_env_and_cache_tools() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/env"))
        .respond_with(ok(json!({"HOME": "/root"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/agents/sbx_1/env"))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/cache/clear"))
        .respond_with(ok(json!({"cleared": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/cache/stats"))
        .respond_with(ok(json!({"entries": 3})))
        .expect(1)
        .mount(&server)
        .await;

    as_caller(TOKEN, async {
        assert!(tools.env_get(agent("sbx_1")).await.contains("/root"));
        assert!(tools.env_clear(agent("sbx_1")).await.starts_with("Environment variables cleared:"));
        assert!(tools.cache_clear(agent("sbx_1")).await.starts_with("Cache cleared:"));
        assert!(tools.cache_stats(agent("sbx_1")).await.contains("\"entries\": 3"));
    })
    .await;
}

// =============================================================================
// Failure Rendering Tests
// =============================================================================

#[tokio::test]
async fn test_server_error_with_plain_text_body() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path("/agents/sbx_1/cache/stats"))
        .respond_with(ResponseTemplate::new(503).set_body_string("agent restarting"))
        .expect(1)
        .mount(&server)
        .await;

    let text = as_caller(TOKEN, tools.cache_stats(agent("sbx_1"))).await;
    assert_eq!(text, "Error getting cache stats: HTTP 503\nagent restarting");
}

#[tokio::test]
async fn test_unreachable_backend_is_text() {
    // Nothing listens on port 9 (discard) on loopback in test environments.
    let tools = tools_for("http://127.0.0.1:9", ControlPlaneAuth::ApiKey);

    let text = as_caller(
        TOKEN,
        tools.get_sandbox(SandboxIdParams { id: "sbx_1".into() }),
    )
    .await;

    assert!(
        text.starts_with("Failed to reach the sandbox API while getting sandbox: connection failed"),
        "{text}"
    );
    // The OS-level cause is part of the text, not just reqwest's summary.
    assert!(text.to_lowercase().contains("refused"), "{text}");
}

#[tokio::test]
async fn test_huge_timeout_is_text_not_panic() {
    let server = MockServer::start().await;
    // Default grace, so the tool timeout plus grace cannot be represented.
    let config = ApiConfig::new()
        .with_control_plane_url(server.uri())
        .with_agent_url_template(format!("{}/agents/{{sandbox_id}}", server.uri()));
    let tools = SandboxTools::new(ApiClient::new(config).expect("valid config"));

    let handle = tokio::spawn(as_caller(TOKEN, async move {
        let isolated = tools
            .execute_code(ExecuteCodeParams {
                code: "print(1)".into(),
                timeout: Some(u64::MAX),
                ..Default::default()
            })
            .await;
        let command = tools
            .run_command(RunCommandParams {
                sandbox_id: "sbx_1".into(),
                command: "true".into(),
                timeout: Some(u64::MAX),
                ..Default::default()
            })
            .await;
        (isolated, command)
    }));
    let (isolated, command) = handle.await.expect("tool call must not panic");

    assert!(
        isolated.starts_with("Error executing code: invalid argument `timeout`"),
        "{isolated}"
    );
    assert!(
        command.starts_with("Error running command: invalid argument `timeout`"),
        "{command}"
    );
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let (server, tools) = backend().await;

    Mock::given(method("POST"))
        .and(path("/agents/sbx_1/commands/run"))
        .respond_with(ok(json!({})).set_delay(std::time::Duration::from_secs(5)))
        .mount(&server)
        .await;

    // timeout 1s + 500ms grace from the test config
    let text = as_caller(
        TOKEN,
        tools.run_command(RunCommandParams {
            sandbox_id: "sbx_1".into(),
            command: "sleep 10".into(),
            timeout: Some(1),
            ..Default::default()
        }),
    )
    .await;

    assert!(
        text.starts_with("Failed to reach the sandbox API while running command: request timed out"),
        "{text}"
    );
}

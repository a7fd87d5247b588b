//! Integration tests for per-request credential isolation.
//!
//! These tests verify:
//! - Concurrent, interleaved requests only ever send their own credential
//! - Missing credentials short-circuit before any network traffic
//! - Credentials reach both the control plane and sandbox agents

mod common;

use std::time::Duration;

use sandbox_mcp_bridge::client::ControlPlaneAuth;
use sandbox_mcp_bridge::credential;
use sandbox_mcp_bridge::tools::{FilePathParams, SandboxIdParams};
use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, ResponseTemplate};

use common::{as_caller, backend, backend_with_auth, header, received};

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_share_credentials() {
    let (server, tools) = backend_with_auth(ControlPlaneAuth::Bearer).await;

    // The delay keeps many calls in flight at the same time.
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/sandboxes/sbx_[0-9]+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "running"}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let tools = tools.clone();
        handles.push(tokio::spawn(async move {
            as_caller(&format!("token-{i}"), async {
                for _ in 0..3 {
                    tools
                        .get_sandbox(SandboxIdParams {
                            id: format!("sbx_{i}"),
                        })
                        .await;
                    tokio::task::yield_now().await;
                }
            })
            .await;
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    let requests = received(&server).await;
    assert_eq!(requests.len(), 16 * 3);

    for request in &requests {
        let id = request
            .url
            .path()
            .rsplit('_')
            .next()
            .expect("path ends with an index");
        let expected = format!("Bearer token-{id}");
        assert_eq!(
            header(request, "authorization"),
            Some(expected.as_str()),
            "request for {} carried the wrong credential",
            request.url.path()
        );
    }
}

#[tokio::test]
async fn test_interleaved_requests_on_one_thread() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/agents/[a-z]+/files/read$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"content": "hi"}))
                .set_delay(Duration::from_millis(30)),
        )
        .mount(&server)
        .await;

    let read = |sandbox: &str| FilePathParams {
        sandbox_id: sandbox.into(),
        path: "/workspace/a.txt".into(),
    };

    // Both futures are polled by the same task, so they suspend and resume
    // around each other.
    let alice = as_caller("alice-token", async {
        tools.file_read(read("alice")).await;
        tokio::task::yield_now().await;
        tools.file_read(read("alice")).await
    });
    let bob = as_caller("bob-token", async {
        tools.file_read(read("bob")).await;
        tools.file_read(read("bob")).await
    });
    let (a, b) = tokio::join!(alice, bob);
    assert!(a.starts_with("File contents:"), "{a}");
    assert!(b.starts_with("File contents:"), "{b}");

    let requests = received(&server).await;
    assert_eq!(requests.len(), 4);
    for request in &requests {
        let expected = if request.url.path().starts_with("/agents/alice/") {
            "Bearer alice-token"
        } else {
            "Bearer bob-token"
        };
        assert_eq!(header(request, "authorization"), Some(expected));
    }
}

// =============================================================================
// Missing Credential Tests
// =============================================================================

#[tokio::test]
async fn test_missing_credential_makes_no_call() {
    let (server, tools) = backend().await;

    let text = tools
        .get_sandbox(SandboxIdParams { id: "sbx_1".into() })
        .await;

    assert!(text.starts_with("Error getting sandbox: missing authentication"), "{text}");
    assert!(received(&server).await.is_empty());
}

#[tokio::test]
async fn test_explicitly_absent_credential_makes_no_call() {
    let (server, tools) = backend().await;

    let text = credential::establish(None, tools.delete_sandbox(SandboxIdParams { id: "sbx_1".into() })).await;

    assert!(text.contains("missing authentication"), "{text}");
    assert!(received(&server).await.is_empty());
}

// =============================================================================
// Header Placement Tests
// =============================================================================

#[tokio::test]
async fn test_control_plane_uses_api_key_header_by_default() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path_regex("^/v1/sandboxes/sbx_1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sbx_1"})))
        .expect(1)
        .mount(&server)
        .await;

    as_caller("key-1", tools.get_sandbox(SandboxIdParams { id: "sbx_1".into() })).await;

    let requests = received(&server).await;
    assert_eq!(header(&requests[0], "x-api-key"), Some("key-1"));
    assert_eq!(header(&requests[0], "authorization"), None);
    assert_eq!(header(&requests[0], "content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_agent_always_uses_bearer() {
    let (server, tools) = backend().await;

    Mock::given(method("GET"))
        .and(path_regex("^/agents/sbx_1/files/exists$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exists": true})))
        .expect(1)
        .mount(&server)
        .await;

    as_caller(
        "key-1",
        tools.file_exists(FilePathParams {
            sandbox_id: "sbx_1".into(),
            path: "/tmp".into(),
        }),
    )
    .await;

    let requests = received(&server).await;
    assert_eq!(header(&requests[0], "authorization"), Some("Bearer key-1"));
    assert_eq!(header(&requests[0], "x-api-key"), None);
    assert_eq!(header(&requests[0], "content-type"), Some("application/json"));
}

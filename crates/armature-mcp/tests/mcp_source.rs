//! MCP source against a mock HTTP server.

use armature_core::{CancellationToken, ToolArgs, ToolError};
use armature_mcp::{McpToolSource, SESSION_HEADER};
use armature_tools::{SourceError, ToolRegistry, ToolSource};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rpc_result(result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": result})
}

fn sse_body(result: Value) -> Vec<u8> {
    format!(
        "event: message\ndata: {}\n\n",
        serde_json::to_string(&rpc_result(result)).unwrap()
    )
    .into_bytes()
}

fn tools_listing() -> Value {
    json!({
        "tools": [
            {
                "name": "read_file",
                "description": "Read a file",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Path to read"},
                        "limit": {"type": "integer"}
                    },
                    "required": ["path"]
                }
            },
            {
                "name": "list_dir",
                "description": "List a directory",
                "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}}
            }
        ]
    })
}

async fn mount_rpc(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer) {
    mount_rpc(
        server,
        "initialize",
        ResponseTemplate::new(200).set_body_json(rpc_result(json!({"protocolVersion": "2024-11-05"}))),
    )
    .await;
    mount_rpc(
        server,
        "tools/list",
        ResponseTemplate::new(200).set_body_json(rpc_result(tools_listing())),
    )
    .await;
}

fn source_for(server: &MockServer) -> McpToolSource {
    McpToolSource::builder(format!("{}/mcp", server.uri()))
        .name("files")
        .retry_base_delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn args(value: Value) -> ToolArgs {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn discovers_tools_with_parameters() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let source = source_for(&server);
    source.discover_tools(&CancellationToken::new()).await.unwrap();

    assert_eq!(source.tool_names().await, vec!["list_dir", "read_file"]);
    let tool = source.get_tool("read_file").await.unwrap();
    let descriptor = tool.descriptor();
    assert_eq!(descriptor.source, "files");
    let path = descriptor.parameter("path").unwrap();
    assert!(path.required);
    let limit = descriptor.parameter("limit").unwrap();
    assert_eq!(limit.param_type.as_str(), "number");
}

#[tokio::test]
async fn discovery_is_idempotent() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let mut first = source.list_tools().await;
    source.discover_tools(&cancel).await.unwrap();
    let mut second = source.list_tools().await;

    first.sort_by(|a, b| a.name.cmp(&b.name));
    second.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(first, second);
}

#[tokio::test]
async fn discovery_works_without_initialize() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "initialize",
        ResponseTemplate::new(404).set_body_string("unknown method"),
    )
    .await;
    mount_rpc(
        &server,
        "tools/list",
        ResponseTemplate::new(200).set_body_json(rpc_result(tools_listing())),
    )
    .await;

    let source = source_for(&server);
    source.discover_tools(&CancellationToken::new()).await.unwrap();
    assert_eq!(source.tool_names().await.len(), 2);
}

#[tokio::test]
async fn session_id_is_echoed_on_later_requests() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "initialize",
        ResponseTemplate::new(200)
            .insert_header(SESSION_HEADER, "sess-42")
            .set_body_json(rpc_result(json!({}))),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .and(header(SESSION_HEADER, "sess-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(tools_listing())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .and(header(SESSION_HEADER, "sess-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            json!({"content": [{"type": "text", "text": "a.txt\nb.txt"}]}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    assert_eq!(source.session_id().await.as_deref(), Some("sess-42"));

    let tool = source.get_tool("list_dir").await.unwrap();
    let result = tool.execute(args(json!({"path": "/"})), &cancel).await.unwrap();
    assert_eq!(result.content, "a.txt\nb.txt");
}

#[tokio::test]
async fn json_and_sse_framing_are_equivalent() {
    let payload = json!({
        "content": [{"type": "text", "text": "hello"}],
        "metadata": {"lines": 1}
    });

    let json_server = MockServer::start().await;
    mount_listing(&json_server).await;
    mount_rpc(
        &json_server,
        "tools/call",
        ResponseTemplate::new(200).set_body_json(rpc_result(payload.clone())),
    )
    .await;

    let sse_server = MockServer::start().await;
    mount_listing(&sse_server).await;
    mount_rpc(
        &sse_server,
        "tools/call",
        ResponseTemplate::new(200).set_body_raw(sse_body(payload), "text/event-stream"),
    )
    .await;

    let cancel = CancellationToken::new();
    let mut outcomes = Vec::new();
    for server in [&json_server, &sse_server] {
        let source = source_for(server);
        source.discover_tools(&cancel).await.unwrap();
        let tool = source.get_tool("read_file").await.unwrap();
        let result = tool
            .execute(args(json!({"path": "/etc/hosts"})), &cancel)
            .await
            .unwrap();
        outcomes.push((result.success, result.content, result.metadata.get("lines").cloned()));
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[0].1, "hello");
}

#[tokio::test]
async fn error_text_in_content_is_a_failure() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_rpc(
        &server,
        "tools/call",
        ResponseTemplate::new(200).set_body_json(rpc_result(
            json!({"content": [{"type": "text", "text": "Error: disk full"}]}),
        )),
    )
    .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let tool = source.get_tool("read_file").await.unwrap();
    let err = tool
        .execute(args(json!({"path": "/var/log"})), &cancel)
        .await
        .unwrap_err();

    let result = err.to_tool_result();
    assert!(!result.success);
    assert!(result.error.contains("disk full"));
    assert!(err.to_string().starts_with("MCP tool error:"));
}

#[tokio::test]
async fn json_rpc_error_is_a_failure() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_rpc(
        &server,
        "tools/call",
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "unknown path"}
        })),
    )
    .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let tool = source.get_tool("read_file").await.unwrap();
    let err = tool
        .execute(args(json!({"path": "/nope"})), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "MCP error: unknown path");
}

#[tokio::test]
async fn http_error_reports_status_and_body() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_rpc(
        &server,
        "tools/call",
        ResponseTemplate::new(404).set_body_string("no such route"),
    )
    .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let tool = source.get_tool("read_file").await.unwrap();
    let err = tool
        .execute(args(json!({"path": "/"})), &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "HTTP error 404: Not Found (response: no such route)"
    );
}

#[tokio::test]
async fn missing_required_arguments_never_reach_the_server() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let tool = source.get_tool("read_file").await.unwrap();
    let err = tool
        .execute(args(json!({"limit": 10})), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::InvalidArguments { .. }));
    assert!(err.to_string().contains("missing required parameters: [path]"));
}

#[tokio::test]
async fn retries_service_unavailable() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "initialize",
        ResponseTemplate::new(200).set_body_json(rpc_result(json!({}))),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_rpc(
        &server,
        "tools/list",
        ResponseTemplate::new(200).set_body_json(rpc_result(tools_listing())),
    )
    .await;

    let source = source_for(&server);
    source.discover_tools(&CancellationToken::new()).await.unwrap();
    assert_eq!(source.tool_names().await.len(), 2);
}

#[tokio::test]
async fn truncated_event_stream_is_reported() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_rpc(
        &server,
        "tools/call",
        ResponseTemplate::new(200)
            .set_body_raw(b"event: message\ndata: {\"jsonrpc\":".to_vec(), "text/event-stream"),
    )
    .await;

    let source = source_for(&server);
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let tool = source.get_tool("read_file").await.unwrap();
    let err = tool
        .execute(args(json!({"path": "/"})), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "SSE stream ended without complete message");
}

#[tokio::test]
async fn registry_executes_remote_tools() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_rpc(
        &server,
        "tools/call",
        ResponseTemplate::new(200).set_body_json(rpc_result(
            json!({"content": [{"type": "text", "text": "127.0.0.1 localhost"}]}),
        )),
    )
    .await;

    let registry = ToolRegistry::new();
    let cancel = CancellationToken::new();
    let added = registry
        .register_source(Arc::new(source_for(&server)), &cancel)
        .await
        .unwrap();
    assert_eq!(added, 2);

    let result = registry
        .execute_tool("read_file", args(json!({"path": "/etc/hosts"})), &cancel)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.content, "127.0.0.1 localhost");
    assert_eq!(result.metadata.get("source"), Some(&json!("files")));
}

#[tokio::test]
async fn unreachable_server_fails_registration() {
    let source = McpToolSource::builder("http://127.0.0.1:9/mcp")
        .name("down")
        .max_retries(0)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let registry = ToolRegistry::new();
    let err = registry
        .register_source(Arc::new(source), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("down"));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn malformed_entries_do_not_hide_the_rest() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "initialize",
        ResponseTemplate::new(200).set_body_json(rpc_result(json!({}))),
    )
    .await;
    mount_rpc(
        &server,
        "tools/list",
        ResponseTemplate::new(200).set_body_json(rpc_result(json!({
            "tools": [
                {"name": "good", "description": "Works", "inputSchema": {"type": "object"}},
                {"name": "odd", "description": null},
                {"description": "no name at all"},
                {"name": 42},
                "not an object"
            ]
        }))),
    )
    .await;

    let source = source_for(&server);
    source.discover_tools(&CancellationToken::new()).await.unwrap();

    assert_eq!(source.tool_names().await, vec!["good", "odd"]);
    let odd = source.get_tool("odd").await.unwrap();
    assert_eq!(odd.descriptor().description, "");
    assert!(odd.descriptor().parameters.is_empty());
}

#[tokio::test]
async fn sse_framed_listing_matches_json_listing() {
    let json_server = MockServer::start().await;
    mount_listing(&json_server).await;

    let sse_server = MockServer::start().await;
    mount_rpc(
        &sse_server,
        "initialize",
        ResponseTemplate::new(200).set_body_raw(sse_body(json!({})), "text/event-stream"),
    )
    .await;
    mount_rpc(
        &sse_server,
        "tools/list",
        ResponseTemplate::new(200).set_body_raw(sse_body(tools_listing()), "text/event-stream"),
    )
    .await;

    let cancel = CancellationToken::new();
    let mut listings = Vec::new();
    for server in [&json_server, &sse_server] {
        let source = source_for(server);
        source.discover_tools(&cancel).await.unwrap();
        let mut tools = source.list_tools().await;
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        listings.push(tools);
    }

    assert_eq!(listings[0].len(), 2);
    assert_eq!(listings[0], listings[1]);
}

#[tokio::test]
async fn failed_rediscovery_keeps_previous_tools() {
    let server = MockServer::start().await;
    mount_rpc(
        &server,
        "initialize",
        ResponseTemplate::new(200).set_body_json(rpc_result(json!({}))),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(tools_listing())))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_rpc(
        &server,
        "tools/list",
        ResponseTemplate::new(500).set_body_string("listing backend down"),
    )
    .await;

    let source = McpToolSource::builder(format!("{}/mcp", server.uri()))
        .name("files")
        .max_retries(0)
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    source.discover_tools(&cancel).await.unwrap();
    let before = source.tool_names().await;
    assert_eq!(before, vec!["list_dir", "read_file"]);

    let err = source.discover_tools(&cancel).await.unwrap_err();
    assert!(err.to_string().contains("HTTP error 500"));
    assert_eq!(source.tool_names().await, before);
    assert!(source.get_tool("read_file").await.is_some());
}

/// Serves error headers for every request, then never finishes the body.
async fn stalled_error_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 404 Not Found\r\ncontent-type: text/plain\r\ncontent-length: 64\r\n\r\npartial",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });
    format!("http://{}/mcp", addr)
}

#[tokio::test]
async fn stalled_error_body_is_bounded_by_the_timeout() {
    let source = McpToolSource::builder(stalled_error_server().await)
        .name("stalled")
        .max_retries(0)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        source.discover_tools(&CancellationToken::new()),
    )
    .await
    .expect("discovery should not hang on a stalled body");

    let err = outcome.unwrap_err();
    assert!(err.to_string().contains("HTTP error 404"));
    assert!(source.tool_names().await.is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_a_stalled_error_body() {
    let source = McpToolSource::builder(stalled_error_server().await)
        .name("stalled")
        .max_retries(0)
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), source.discover_tools(&cancel))
        .await
        .expect("cancellation should end discovery");
    assert!(matches!(outcome, Err(SourceError::Cancelled { .. })));
}

//! End-to-end tests over the JSON-RPC surface: handshake, session gate,
//! approval gate, read/search contracts, and response ordering.

use scout::approval::PromptAnswer;
use scout::approval::prompt::ScriptedPrompter;
use scout::config::Config;
use scout::server::{Server, transport};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn test_server(root: &Path, answers: Vec<PromptAnswer>) -> Server {
    let config_path = root.join("scout-config.json");
    std::fs::write(
        &config_path,
        json!({ "allowed_paths": [root.to_str().unwrap()] }).to_string(),
    )
    .unwrap();
    let config = Config::load(&config_path, true).unwrap();
    Server::new(
        config,
        config_path,
        true,
        Arc::new(ScriptedPrompter::new(answers)),
    )
}

async fn rpc(server: &Server, request: Value) -> Value {
    let response = transport::handle_line(server, &request.to_string())
        .await
        .expect("expected a response");
    serde_json::from_str(&response).unwrap()
}

async fn call(server: &Server, name: &str, arguments: Value) -> (bool, String) {
    let response = rpc(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
        }),
    )
    .await;
    let result = &response["result"];
    (
        result["isError"].as_bool().expect("isError flag"),
        result["content"][0]["text"].as_str().unwrap_or_default().to_string(),
    )
}

async fn start_session(server: &Server) -> String {
    let (is_error, text) = call(server, "start_session", json!({})).await;
    assert!(!is_error, "start_session failed: {text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    body["session_token"].as_str().unwrap().to_string()
}

async fn approval_token(server: &Server, session: &str, files: Value) -> String {
    let (is_error, text) = call(
        server,
        "request_approval",
        json!({ "session_token": session, "files": files }),
    )
    .await;
    assert!(!is_error, "request_approval failed: {text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    body["approval_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_initialize_handshake() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let response = rpc(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05" },
        }),
    )
    .await;

    assert_eq!(response["id"], 7);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "scout");
    assert!(response["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_initialize_rejects_version_mismatch() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let response = rpc(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "1999-01-01" },
        }),
    )
    .await;

    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn test_ping_unknown_method_and_parse_error() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let pong = rpc(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
    assert!(pong["result"].is_object());

    let unknown = rpc(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "nope"})).await;
    assert_eq!(unknown["error"]["code"], -32601);

    let garbled = transport::handle_line(&server, "{not json").await.unwrap();
    let garbled: Value = serde_json::from_str(&garbled).unwrap();
    assert_eq!(garbled["error"]["code"], -32700);
}

#[tokio::test]
async fn test_notifications_are_ignored() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let response = transport::handle_line(
        &server,
        &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
    )
    .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_tools_list_is_complete_and_gated() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let response = rpc(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
    let tools = response["result"]["tools"].as_array().unwrap();

    assert_eq!(tools.len(), 20);
    assert_eq!(tools[0]["name"], "start_session");

    for tool in tools {
        let name = tool["name"].as_str().unwrap();
        let required = tool["inputSchema"]["required"].as_array().unwrap();
        let has_session = required.iter().any(|r| r == "session_token");
        if name == "start_session" {
            assert!(!has_session);
        } else {
            assert!(has_session, "{name} must require session_token");
        }
    }
}

#[tokio::test]
async fn test_start_session_then_read() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), "hello scout\n").unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "read_files",
        json!({
            "session_token": session,
            "paths": [root.path().join("a.txt").to_str().unwrap()],
        }),
    )
    .await;

    assert!(!is_error, "read_files failed: {text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    let entry = body
        .as_object()
        .unwrap()
        .values()
        .next()
        .expect("one entry");
    assert_eq!(entry["content"], "hello scout\n");
}

#[tokio::test]
async fn test_unauthorized_path_is_denied() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "read_files",
        json!({ "session_token": session, "paths": ["/etc/passwd"] }),
    )
    .await;

    assert!(is_error);
    assert!(text.contains("access denied"), "got: {text}");
    assert!(!text.contains(root.path().to_str().unwrap()), "must not leak roots");
}

#[tokio::test]
async fn test_every_tool_requires_a_session() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);

    let names: Vec<String> = server
        .registry()
        .iter()
        .map(|t| t.name().to_string())
        .filter(|n| n != "start_session")
        .collect();

    for name in names {
        let (is_error, text) = call(&server, &name, json!({})).await;
        assert!(is_error, "{name} ran without a session");
        assert!(
            text.contains("invalid or expired session token"),
            "{name}: {text}"
        );

        let (is_error, text) =
            call(&server, &name, json!({ "session_token": "deadbeef" })).await;
        assert!(is_error, "{name} accepted a bogus session");
        assert!(
            text.contains("invalid or expired session token"),
            "{name}: {text}"
        );
    }
}

#[tokio::test]
async fn test_mutation_requires_approval_token() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("f.txt");
    std::fs::write(&target, "before\n").unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "update_file",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "new_content": "after\n",
        }),
    )
    .await;

    assert!(is_error);
    assert!(text.contains("approval required"), "got: {text}");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "before\n");
}

#[tokio::test]
async fn test_approval_denied_by_user() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("f.txt");
    std::fs::write(&target, "before\n").unwrap();
    let server = test_server(root.path(), vec![PromptAnswer::No]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "request_approval",
        json!({
            "session_token": session,
            "files": [{
                "path": target.to_str().unwrap(),
                "action": "update",
                "purpose": "rewrite",
            }],
        }),
    )
    .await;

    assert!(is_error);
    assert!(text.contains("denied by user"), "got: {text}");
}

#[tokio::test]
async fn test_approved_update_applies_once() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("f.txt");
    std::fs::write(&target, "before\n").unwrap();
    let server = test_server(root.path(), vec![PromptAnswer::Yes]);
    let session = start_session(&server).await;

    let token = approval_token(
        &server,
        &session,
        json!([{
            "path": target.to_str().unwrap(),
            "action": "update",
            "purpose": "rewrite",
        }]),
    )
    .await;

    let (is_error, text) = call(
        &server,
        "update_file",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "new_content": "after\n",
            "approval_token": token,
        }),
    )
    .await;
    assert!(!is_error, "update_file failed: {text}");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "after\n");

    // Single use: the same token must not authorize a second write.
    let (is_error, text) = call(
        &server,
        "update_file",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "new_content": "again\n",
            "approval_token": token,
        }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("already used"), "got: {text}");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "after\n");
}

#[tokio::test]
async fn test_disjoint_approval_is_rejected() {
    let root = TempDir::new().unwrap();
    let approved = root.path().join("approved.txt");
    let other = root.path().join("other.txt");
    std::fs::write(&approved, "a\n").unwrap();
    std::fs::write(&other, "b\n").unwrap();
    let server = test_server(root.path(), vec![PromptAnswer::Yes]);
    let session = start_session(&server).await;

    let token = approval_token(
        &server,
        &session,
        json!([{
            "path": approved.to_str().unwrap(),
            "action": "update",
            "purpose": "edit",
        }]),
    )
    .await;

    let (is_error, text) = call(
        &server,
        "update_file",
        json!({
            "session_token": session,
            "filepath": other.to_str().unwrap(),
            "new_content": "changed\n",
            "approval_token": token,
        }),
    )
    .await;

    assert!(is_error);
    assert!(text.contains("does not cover"), "got: {text}");
    assert_eq!(std::fs::read_to_string(&other).unwrap(), "b\n");
}

#[tokio::test]
async fn test_preview_needs_no_approval() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("f.txt");
    std::fs::write(&target, "one\ntwo\n").unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "delete_file_lines",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "start_line": 1,
            "end_line": 1,
            "preview_only": true,
        }),
    )
    .await;

    assert!(!is_error, "preview failed: {text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["status"], "preview");
    assert!(body["diff"].as_str().unwrap().contains("-one"));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "one\ntwo\n");
}

#[tokio::test]
async fn test_line_edit_round_trip_through_tools() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("ten.txt");
    let original: String = (1..=10).map(|i| format!("line{i}\n")).collect();
    std::fs::write(&target, &original).unwrap();
    let server = test_server(root.path(), vec![PromptAnswer::Yes, PromptAnswer::Yes]);
    let session = start_session(&server).await;

    let token = approval_token(
        &server,
        &session,
        json!([{ "path": target.to_str().unwrap(), "action": "update", "purpose": "insert" }]),
    )
    .await;
    let (is_error, text) = call(
        &server,
        "insert_file_lines",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "line_number": 3,
            "new_content": "X\n",
            "approval_token": token,
        }),
    )
    .await;
    assert!(!is_error, "insert failed: {text}");

    let token = approval_token(
        &server,
        &session,
        json!([{ "path": target.to_str().unwrap(), "action": "update", "purpose": "remove" }]),
    )
    .await;
    let (is_error, text) = call(
        &server,
        "delete_file_lines",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "start_line": 3,
            "end_line": 3,
            "approval_token": token,
        }),
    )
    .await;
    assert!(!is_error, "delete failed: {text}");

    assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
}

#[tokio::test]
async fn test_search_order_is_sorted_preorder() {
    let root = TempDir::new().unwrap();
    let base = root.path().join("tree");
    std::fs::create_dir_all(base.join("b")).unwrap();
    std::fs::create_dir_all(base.join("a")).unwrap();
    std::fs::write(base.join("a/1"), "").unwrap();
    std::fs::write(base.join("a/2"), "").unwrap();
    std::fs::write(base.join("b/1"), "").unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    let (is_error, text) = call(
        &server,
        "search_files",
        json!({
            "session_token": session,
            "filepath": base.to_str().unwrap(),
            "recursive": true,
        }),
    )
    .await;
    assert!(!is_error, "search failed: {text}");

    let body: Value = serde_json::from_str(&text).unwrap();
    let canonical = base.canonicalize().unwrap();
    let relative: Vec<String> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            Path::new(e["path"].as_str().unwrap())
                .strip_prefix(&canonical)
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    assert_eq!(relative, vec!["a", "a/1", "a/2", "b", "b/1"]);
}

#[tokio::test]
async fn test_create_and_delete_with_approval() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("fresh.txt");
    let server = test_server(root.path(), vec![PromptAnswer::Yes, PromptAnswer::Yes]);
    let session = start_session(&server).await;

    let token = approval_token(
        &server,
        &session,
        json!([{ "path": target.to_str().unwrap(), "action": "create", "purpose": "new file" }]),
    )
    .await;
    let (is_error, text) = call(
        &server,
        "create_file",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "new_content": "fresh\n",
            "approval_token": token,
        }),
    )
    .await;
    assert!(!is_error, "create failed: {text}");
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "fresh\n");

    let token = approval_token(
        &server,
        &session,
        json!([{ "path": target.to_str().unwrap(), "action": "delete", "purpose": "cleanup" }]),
    )
    .await;
    let (is_error, text) = call(
        &server,
        "delete_file",
        json!({
            "session_token": session,
            "filepath": target.to_str().unwrap(),
            "approval_token": token,
        }),
    )
    .await;
    assert!(!is_error, "delete failed: {text}");
    assert!(!target.exists());
}

#[tokio::test]
async fn test_response_order_and_id_round_trip() {
    let root = TempDir::new().unwrap();
    let server = Arc::new(test_server(root.path(), vec![]));

    let (client, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { transport::serve(&server, server_read, server_write).await })
    };

    let (client_read, mut client_write) = tokio::io::split(client);
    let frames = [
        json!({"jsonrpc": "2.0", "id": "A", "method": "initialize",
               "params": {"protocolVersion": "2024-11-05"}}),
        json!({"jsonrpc": "2.0", "id": "B", "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": "C", "method": "ping"}),
    ];
    for frame in &frames {
        use tokio::io::AsyncWriteExt;
        client_write
            .write_all(format!("{frame}\n").as_bytes())
            .await
            .unwrap();
    }
    drop(client_write);

    use tokio::io::AsyncBufReadExt;
    let mut lines = tokio::io::BufReader::new(client_read).lines();
    let mut ids = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        let response: Value = serde_json::from_str(&line).unwrap();
        ids.push(response["id"].as_str().unwrap().to_string());
    }

    assert_eq!(ids, vec!["A", "B", "C"]);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_reload_config_keeps_sessions() {
    let root = TempDir::new().unwrap();
    let server = test_server(root.path(), vec![]);
    let session = start_session(&server).await;

    server.reload_config().await.unwrap();

    let (is_error, text) = call(
        &server,
        "get_config",
        json!({ "session_token": session }),
    )
    .await;
    assert!(!is_error, "session lost across reload: {text}");
}

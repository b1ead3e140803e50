// MCP client behaviour against in-memory servers
//
// Covers server discovery, tool-name routing across servers, pagination,
// prompts and resources, and error surfacing.

mod common;

use rust_mcp_sdk::schema::RpcError;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{connect, FakeSession};
use wikiask::tools::mcp::content::{first_prompt_text, resource_text, tool_result_text};
use wikiask::tools::mcp::{McpClient, McpConnection, McpError, McpServerConfig};
use wikiask::tools::{ToolBackend, ToolUse};

#[tokio::test]
async fn test_connection_reads_server_details() {
    let session = Arc::new(FakeSession::wikipedia());
    let conn = connect("wikipedia", session.clone()).await;

    assert_eq!(conn.name(), "wikipedia");
    assert_eq!(conn.server_info().name, "wikipedia");
    assert_eq!(conn.server_info().version, "0.3.0");
    assert_eq!(conn.instructions(), Some("Search before answering."));
    assert_eq!(conn.list_tools().len(), 1);
    assert_eq!(session.calls("tools/list").len(), 1);
}

#[tokio::test]
async fn test_session_without_handshake_is_rejected() {
    let session = Arc::new(FakeSession::new());
    let err = McpConnection::from_session("early".to_string(), session, Duration::from_secs(5))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<McpError>(),
        Some(McpError::NotInitialized(name)) if name == "early"
    ));
}

#[tokio::test]
async fn test_tools_not_listed_without_capability() {
    let session = Arc::new(FakeSession::new().with_capabilities(json!({})));
    let conn = connect("bare", session.clone()).await;

    assert!(conn.list_tools().is_empty());
    assert!(session.calls("tools/list").is_empty());
    assert!(conn.list_prompts().await.unwrap().is_empty());
    assert!(conn.list_resources().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tool_list_follows_cursor() {
    let session = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .on("tools/list", |params| {
                let cursor = params.as_ref().and_then(|p| p["cursor"].as_str());
                Ok(match cursor {
                    None => json!({"tools": [{"name": "search", "inputSchema": {"type": "object"}}], "nextCursor": "page2"}),
                    Some("page2") => json!({"tools": [{"name": "fetch_article", "inputSchema": {"type": "object"}}]}),
                    Some(other) => panic!("unexpected cursor {}", other),
                })
            }),
    );

    let conn = connect("paged", session.clone()).await;
    let names: Vec<&str> = conn.list_tools().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["search", "fetch_article"]);
    assert_eq!(session.calls("tools/list").len(), 2);
}

#[tokio::test]
async fn test_duplicate_tool_names_get_server_prefix() {
    let tools = json!([
        {"name": "search", "description": "Search", "inputSchema": {"type": "object"}},
        {"name": "summarize", "inputSchema": {"type": "object"}}
    ]);
    let wiki = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(tools.clone())
            .on("tools/call", |_| Ok(json!({"content": [{"type": "text", "text": "from wiki"}]}))),
    );
    let news = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(json!([{"name": "search", "inputSchema": {"type": "object"}}]))
            .on("tools/call", |_| Ok(json!({"content": [{"type": "text", "text": "from news"}]}))),
    );

    let client = McpClient::from_connections(vec![
        connect("wiki", wiki.clone()).await,
        connect("news", news.clone()).await,
    ])
    .await;

    let names: Vec<String> = client.list_tools().await.into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["news_search", "summarize", "wiki_search"]);

    let result = client.execute_tool("news_search", json!({})).await.unwrap();
    assert_eq!(tool_result_text(&result), "from news");

    // The server receives its own tool name
    let call = wiki.calls("tools/call");
    assert!(call.is_empty());
    client.execute_tool("wiki_search", json!({"q": 1})).await.unwrap();
    let call = wiki.calls("tools/call");
    assert_eq!(call[0].as_ref().unwrap()["name"], "search");
}

#[tokio::test]
async fn test_prefixed_name_never_shadows_existing_tool() {
    let reply = |text: &'static str| {
        move |_: Option<serde_json::Value>| {
            Ok::<_, RpcError>(json!({"content": [{"type": "text", "text": text}]}))
        }
    };
    let wiki = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(json!([{"name": "search", "inputSchema": {"type": "object"}}]))
            .on("tools/call", reply("wiki search")),
    );
    let news = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(json!([{"name": "search", "inputSchema": {"type": "object"}}]))
            .on("tools/call", reply("news search")),
    );
    // A bare tool whose name equals the prefixed form of wiki's search
    let archive = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(json!([{"name": "wiki_search", "inputSchema": {"type": "object"}}]))
            .on("tools/call", reply("archive wiki_search")),
    );

    let client = McpClient::from_connections(vec![
        connect("wiki", wiki).await,
        connect("news", news).await,
        connect("archive", archive).await,
    ])
    .await;

    let names: Vec<String> = client.list_tools().await.into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["news_search", "wiki_search", "wiki_search_2"]);

    for (exposed, expected) in [
        ("wiki_search", "archive wiki_search"),
        ("wiki_search_2", "wiki search"),
        ("news_search", "news search"),
    ] {
        let result = client.execute_tool(exposed, json!({})).await.unwrap();
        assert_eq!(tool_result_text(&result), expected);
    }
}

#[tokio::test]
async fn test_unknown_tool_is_typed_error() {
    let client = McpClient::from_connections(vec![
        connect("wikipedia", Arc::new(FakeSession::wikipedia())).await,
    ])
    .await;

    let err = client.execute_tool("delete_everything", json!({})).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<McpError>(),
        Some(McpError::UnknownTool(name)) if name == "delete_everything"
    ));
}

#[tokio::test]
async fn test_backend_maps_is_error_to_error_result() {
    let client = McpClient::from_connections(vec![
        connect("wikipedia", Arc::new(FakeSession::wikipedia())).await,
    ])
    .await;

    let ok = client
        .call(&ToolUse::new("call_1", "search_wikipedia", json!({"query": "Rust"})))
        .await
        .unwrap();
    assert!(!ok.is_error);
    assert_eq!(ok.content, "Summary of Rust");
    assert_eq!(ok.tool_use_id, "call_1");

    let failed = client
        .call(&ToolUse::new("call_2", "search_wikipedia", json!({"query": ""})))
        .await
        .unwrap();
    assert!(failed.is_error);
    assert_eq!(failed.content, "query must not be empty");
}

#[tokio::test]
async fn test_rpc_error_carries_code_and_message() {
    let session = Arc::new(
        FakeSession::new()
            .with_capabilities(json!({"tools": {}}))
            .with_tools(json!([{"name": "flaky", "inputSchema": {"type": "object"}}]))
            .on("tools/call", |_| Err(RpcError::invalid_params().with_message("Invalid params"))),
    );
    let client = McpClient::from_connections(vec![connect("flaky", session).await]).await;

    let err = client.execute_tool("flaky", json!({})).await.unwrap_err();
    let rendered = format!("{:#}", err);
    assert!(rendered.contains("-32602"));
    assert!(rendered.contains("Invalid params"));
}

#[tokio::test]
async fn test_prompts_and_resources_are_aggregated() {
    let client = McpClient::from_connections(vec![
        connect("wikipedia", Arc::new(FakeSession::wikipedia())).await,
        connect(
            "plain",
            Arc::new(FakeSession::new().with_capabilities(json!({}))),
        )
        .await,
    ])
    .await;

    let prompts = client.list_prompts().await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].server, "wikipedia");
    assert_eq!(prompts[0].prompt.arguments[0].name, "topic");

    let found = client.find_prompt("highlight_sections").await.unwrap();
    let mut args = std::collections::HashMap::new();
    args.insert("topic".to_string(), "Alan Turing".to_string());
    let result = client
        .get_prompt(&found.server, "highlight_sections", args)
        .await
        .unwrap();
    assert_eq!(
        first_prompt_text(&result),
        Some("Highlight the key sections of Alan Turing")
    );

    let missing = client.find_prompt("nope").await.unwrap_err();
    assert!(matches!(
        missing.downcast_ref::<McpError>(),
        Some(McpError::UnknownPrompt(_))
    ));

    let resources = client.list_resources().await.unwrap();
    assert_eq!(resources.len(), 2);
    let read = client
        .read_resource(&resources[1].server, &resources[1].resource.uri)
        .await
        .unwrap();
    assert_eq!(
        resource_text(&read.contents[0]),
        Some("Contents of wiki://on_this_day")
    );
}

#[tokio::test]
async fn test_disconnect_shuts_down_sessions() {
    let session = Arc::new(FakeSession::wikipedia());
    let client =
        McpClient::from_connections(vec![connect("wikipedia", session.clone()).await]).await;

    client.disconnect_all().await.unwrap();
    assert!(session.is_closed());
    assert!(client.list_tools().await.is_empty());
    assert!(client.list_servers().await.is_empty());
}

#[tokio::test]
async fn test_from_config_fails_when_no_server_starts() {
    let mut servers = BTreeMap::new();
    servers.insert(
        "missing".to_string(),
        McpServerConfig::stdio("wikiask-no-such-binary-7f3a", vec![]),
    );

    let err = McpClient::from_config(&servers).await.err().unwrap();
    assert!(format!("{:#}", err).contains("missing"));
}

#[tokio::test]
async fn test_from_config_skips_disabled_servers() {
    let mut disabled = McpServerConfig::stdio("wikiask-no-such-binary-7f3a", vec![]);
    disabled.enabled = false;
    let mut servers = BTreeMap::new();
    servers.insert("off".to_string(), disabled);

    let client = McpClient::from_config(&servers).await.unwrap();
    assert!(client.list_servers().await.is_empty());
}

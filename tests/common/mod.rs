// Shared fakes for integration tests
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use rust_mcp_sdk::error::{McpSdkError, SdkResult};
use rust_mcp_sdk::schema::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
    InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult,
    ReadResourceRequestParams, ReadResourceResult, RpcError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wikiask::providers::{ContentBlock, LlmProvider, ProviderRequest, ProviderResponse};
use wikiask::tools::mcp::{McpConnection, McpSession};

type Handler = Box<dyn Fn(Option<Value>) -> Result<Value, RpcError> + Send + Sync>;

/// In-memory MCP server answering requests by method name
pub struct FakeSession {
    handlers: HashMap<String, Handler>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    closed: AtomicBool,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn on<F>(mut self, method: &str, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.handlers.insert(method.to_string(), Box::new(handler));
        self
    }

    /// Answer `initialize` advertising the given capabilities
    pub fn with_capabilities(self, capabilities: Value) -> Self {
        self.on("initialize", move |_| {
            Ok(json!({
                "protocolVersion": "2025-06-18",
                "capabilities": capabilities.clone(),
                "serverInfo": {"name": "fake", "version": "1.0"}
            }))
        })
    }

    pub fn with_tools(self, tools: Value) -> Self {
        self.on("tools/list", move |_| Ok(json!({ "tools": tools.clone() })))
    }

    /// A Wikipedia-like server with one tool, one prompt and two resources
    pub fn wikipedia() -> Self {
        Self::new()
            .on("initialize", |_| {
                Ok(json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": {"tools": {}, "prompts": {}, "resources": {}},
                    "serverInfo": {"name": "wikipedia", "version": "0.3.0"},
                    "instructions": "Search before answering."
                }))
            })
            .with_tools(json!([{
                "name": "search_wikipedia",
                "description": "Search Wikipedia for an article",
                "inputSchema": {
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }
            }]))
            .on("tools/call", |params| {
                let params = params.unwrap_or_default();
                let query = params["arguments"]["query"].as_str().unwrap_or_default().to_string();
                if query.is_empty() {
                    return Ok(json!({
                        "content": [{"type": "text", "text": "query must not be empty"}],
                        "isError": true
                    }));
                }
                Ok(json!({
                    "content": [{"type": "text", "text": format!("Summary of {}", query)}]
                }))
            })
            .on("prompts/list", |_| {
                Ok(json!({"prompts": [{
                    "name": "highlight_sections",
                    "description": "Key sections of an article",
                    "arguments": [{"name": "topic", "required": true}]
                }]}))
            })
            .on("prompts/get", |params| {
                let params = params.unwrap_or_default();
                let topic = params["arguments"]["topic"].as_str().unwrap_or_default().to_string();
                Ok(json!({"messages": [{
                    "role": "user",
                    "content": {"type": "text", "text": format!("Highlight the key sections of {}", topic)}
                }]}))
            })
            .on("resources/list", |_| {
                Ok(json!({"resources": [
                    {"uri": "wiki://featured", "name": "featured"},
                    {"uri": "wiki://on_this_day", "name": "on_this_day", "mimeType": "text/plain"}
                ]}))
            })
            .on("resources/read", |params| {
                let params = params.unwrap_or_default();
                let uri = params["uri"].as_str().unwrap_or_default().to_string();
                Ok(json!({"contents": [{"uri": uri, "text": format!("Contents of {}", uri)}]}))
            })
    }

    pub fn calls(&self, method: &str) -> Vec<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));
        match self.handlers.get(method) {
            Some(handler) => handler(params),
            None => Err(RpcError::method_not_found().with_message(format!("Method not found: {}", method))),
        }
    }

    fn request<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: Option<P>) -> SdkResult<T> {
        let params = params.map(|p| serde_json::to_value(p).unwrap());
        let value = self.dispatch(method, params)?;
        serde_json::from_value(value).map_err(|e| {
            McpSdkError::from(RpcError::internal_error().with_message(e.to_string()))
        })
    }
}

fn cursor_params(cursor: Option<String>) -> Option<Value> {
    cursor.map(|c| json!({ "cursor": c }))
}

#[async_trait]
impl McpSession for FakeSession {
    fn server_details(&self) -> Option<InitializeResult> {
        self.request::<Value, _>("initialize", None).ok()
    }

    async fn tool_page(&self, cursor: Option<String>) -> SdkResult<ListToolsResult> {
        self.request("tools/list", cursor_params(cursor))
    }

    async fn call_tool(&self, params: CallToolRequestParams) -> SdkResult<CallToolResult> {
        self.request("tools/call", Some(params))
    }

    async fn prompt_page(&self, cursor: Option<String>) -> SdkResult<ListPromptsResult> {
        self.request("prompts/list", cursor_params(cursor))
    }

    async fn get_prompt(&self, params: GetPromptRequestParams) -> SdkResult<GetPromptResult> {
        self.request("prompts/get", Some(params))
    }

    async fn resource_page(&self, cursor: Option<String>) -> SdkResult<ListResourcesResult> {
        self.request("resources/list", cursor_params(cursor))
    }

    async fn read_resource(&self, params: ReadResourceRequestParams) -> SdkResult<ReadResourceResult> {
        self.request("resources/read", Some(params))
    }

    async fn shut_down(&self) -> SdkResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub async fn connect(name: &str, session: Arc<FakeSession>) -> McpConnection {
    McpConnection::from_session(name.to_string(), session, Duration::from_secs(5))
        .await
        .expect("fake server should initialize")
}

/// Replays canned responses and records every request
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

pub fn text_reply(text: &str) -> ProviderResponse {
    reply(vec![ContentBlock::text(text)])
}

pub fn tool_reply(id: &str, name: &str, input: Value) -> ProviderResponse {
    reply(vec![ContentBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }])
}

fn reply(content: Vec<ContentBlock>) -> ProviderResponse {
    ProviderResponse {
        id: "resp".to_string(),
        model: "scripted-model".to_string(),
        content,
        stop_reason: None,
        role: "assistant".to_string(),
        provider: "scripted".to_string(),
    }
}

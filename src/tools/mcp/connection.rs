// MCP connection wrapper for a single server

use anyhow::{Context, Result};
use rust_mcp_sdk::error::{McpSdkError, SdkResult};
use rust_mcp_sdk::mcp_client::client_runtime::create_client;
use rust_mcp_sdk::mcp_client::{
    ClientHandler, ClientRuntime, McpClientOptions, ToMcpClientHandler,
};
use rust_mcp_sdk::schema::{
    CallToolRequestParams, CallToolResult, ClientCapabilities, GetPromptRequestParams,
    GetPromptResult, Implementation, InitializeRequestParams, Prompt, ProtocolVersion,
    ReadResourceRequestParams, ReadResourceResult, Resource, RpcError, ServerCapabilities, Tool,
};
use rust_mcp_sdk::{McpClient as SdkClient, StdioTransport, TransportOptions};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::config::{McpServerConfig, TransportType};
use super::error::McpError;
use super::session::McpSession;

/// Upper bound on pages fetched for one list request
const MAX_LIST_PAGES: usize = 50;

/// Routes server stderr into debug logs instead of the terminal
struct ServerLogHandler {
    server: String,
}

#[async_trait::async_trait]
impl ClientHandler for ServerLogHandler {
    async fn handle_process_error(
        &self,
        error_message: String,
        _runtime: &dyn SdkClient,
    ) -> std::result::Result<(), RpcError> {
        tracing::debug!("[{}] {}", self.server, error_message.trim_end());
        Ok(())
    }
}

/// What this client announces during the initialize handshake
fn client_details() -> InitializeRequestParams {
    InitializeRequestParams {
        protocol_version: ProtocolVersion::V2025_06_18.into(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Question answering over MCP tools".to_string()),
            icons: vec![],
            title: None,
            website_url: None,
        },
        meta: None,
    }
}

/// Spawn `command` and run the initialize handshake
async fn launch(
    name: &str,
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
    timeout: Duration,
) -> std::result::Result<Arc<ClientRuntime>, McpError> {
    let transport = StdioTransport::create_with_server_launch(
        command,
        args.to_vec(),
        (!env.is_empty()).then(|| env.clone()),
        TransportOptions { timeout },
    )
    .map_err(|e| McpError::from_sdk(name, "launch", timeout, e.into()))?;

    let handler = ServerLogHandler {
        server: name.to_string(),
    };
    let client = create_client(McpClientOptions {
        client_details: client_details(),
        transport,
        handler: handler.to_mcp_client_handler(),
        task_store: None,
        server_task_store: None,
    });

    if let Err(e) = client.clone().start().await {
        let _ = SdkClient::shut_down(client.as_ref()).await;
        return Err(McpError::from_sdk(name, "initialize", timeout, e));
    }

    Ok(client)
}

/// A single initialized MCP server connection
pub struct McpConnection {
    name: String,
    session: Arc<dyn McpSession>,
    timeout: Duration,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    /// Tool list discovered at connect time
    tools: Vec<Tool>,
}

impl McpConnection {
    /// Launch and initialize the server described by `config`
    pub async fn connect(name: String, config: &McpServerConfig) -> Result<Self> {
        config
            .validate(&name)
            .context("Invalid MCP server configuration")?;

        match config.transport {
            TransportType::Stdio => {
                let command = config
                    .command
                    .as_deref()
                    .context("STDIO transport requires command")?;

                tracing::debug!(
                    "Launching MCP server '{}': {} {}",
                    name,
                    command,
                    config.args.join(" ")
                );

                let timeout = config.request_timeout();
                let client = launch(&name, command, &config.args, &config.env, timeout)
                    .await
                    .with_context(|| format!("MCP server '{}' failed to initialize", name))?;

                Self::from_session(name, client, timeout).await
            }
            TransportType::Sse => anyhow::bail!("SSE transport not supported"),
        }
    }

    /// Wrap a session whose handshake has completed and discover its tools
    pub async fn from_session(
        name: String,
        session: Arc<dyn McpSession>,
        timeout: Duration,
    ) -> Result<Self> {
        let details = session
            .server_details()
            .ok_or_else(|| McpError::NotInitialized(name.clone()))?;

        let mut conn = Self {
            name,
            session,
            timeout,
            server_info: details.server_info,
            capabilities: details.capabilities,
            instructions: details.instructions,
            tools: Vec::new(),
        };

        conn.refresh_tools().await?;

        tracing::info!(
            "Connected to MCP server '{}' ({} {}) with {} tools",
            conn.name,
            conn.server_info.name,
            conn.server_info.version,
            conn.tools.len()
        );

        Ok(conn)
    }

    /// Re-fetch the tool list
    pub async fn refresh_tools(&mut self) -> Result<()> {
        self.tools = if self.capabilities.tools.is_some() {
            let session = &self.session;
            self.paginate("tools/list", |cursor| async move {
                let page = session.tool_page(cursor).await?;
                Ok::<_, McpSdkError>((page.tools, page.next_cursor))
            })
            .await
            .context("Failed to list tools")?
        } else {
            Vec::new()
        };
        Ok(())
    }

    /// Get the list of available tools
    pub fn list_tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Usage hints the server sent during initialization
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => anyhow::bail!(
                "Arguments for tool '{}' must be a JSON object, got {}",
                tool_name,
                other
            ),
        };
        let params = CallToolRequestParams {
            name: tool_name.to_string(),
            arguments: Some(arguments),
            meta: None,
            task: None,
        };
        self.session
            .call_tool(params)
            .await
            .map_err(|e| self.error("tools/call", e))
    }

    /// Prompts offered by the server (empty when the capability is absent)
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        if self.capabilities.prompts.is_none() {
            return Ok(Vec::new());
        }
        let session = &self.session;
        self.paginate("prompts/list", |cursor| async move {
            let page = session.prompt_page(cursor).await?;
            Ok::<_, McpSdkError>((page.prompts, page.next_cursor))
        })
        .await
    }

    pub async fn get_prompt(
        &self,
        prompt_name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let params = GetPromptRequestParams {
            name: prompt_name.to_string(),
            arguments: Some(arguments),
            meta: None,
        };
        self.session
            .get_prompt(params)
            .await
            .map_err(|e| self.error("prompts/get", e))
    }

    /// Resources offered by the server (empty when the capability is absent)
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        if self.capabilities.resources.is_none() {
            return Ok(Vec::new());
        }
        let session = &self.session;
        self.paginate("resources/list", |cursor| async move {
            let page = session.resource_page(cursor).await?;
            Ok::<_, McpSdkError>((page.resources, page.next_cursor))
        })
        .await
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let params = ReadResourceRequestParams {
            uri: uri.to_string(),
            meta: None,
        };
        self.session
            .read_resource(params)
            .await
            .map_err(|e| self.error("resources/read", e))
    }

    /// Terminate the server process
    pub async fn shutdown(&self) -> Result<()> {
        self.session
            .shut_down()
            .await
            .map_err(|e| self.error("shutdown", e))
    }

    fn error(&self, method: &str, error: McpSdkError) -> anyhow::Error {
        McpError::from_sdk(&self.name, method, self.timeout, error).into()
    }

    /// Follow `nextCursor` until the list is exhausted
    async fn paginate<T, F, Fut>(&self, method: &str, fetch: F) -> Result<Vec<T>>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = SdkResult<(Vec<T>, Option<String>)>>,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let (mut batch, next) = fetch(cursor.take())
                .await
                .map_err(|e| self.error(method, e))?;
            items.append(&mut batch);

            match next {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(items),
            }
        }

        tracing::warn!(
            "MCP server '{}' returned more than {} pages for {}",
            self.name,
            MAX_LIST_PAGES,
            method
        );
        Ok(items)
    }
}

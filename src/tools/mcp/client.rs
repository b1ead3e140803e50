// MCP client coordinator - manages multiple server connections

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use rust_mcp_sdk::schema::{CallToolResult, GetPromptResult, Prompt, ReadResourceResult, Resource};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::config::McpServerConfig;
use super::connection::McpConnection;
use super::content::{tool_result_failed, tool_result_text};
use super::error::McpError;
use crate::tools::executor::ToolBackend;
use crate::tools::types::{ToolDefinition, ToolInputSchema, ToolResult, ToolUse};

/// A prompt together with the server that offers it
#[derive(Debug, Clone)]
pub struct ServerPrompt {
    pub server: String,
    pub prompt: Prompt,
}

/// A resource together with the server that offers it
#[derive(Debug, Clone)]
pub struct ServerResource {
    pub server: String,
    pub resource: Resource,
}

/// Where an exposed tool name is executed
#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolRoute {
    server: String,
    tool: String,
}

/// MCP client that manages multiple server connections
pub struct McpClient {
    /// Active server connections (name -> connection), ordered by name
    connections: RwLock<BTreeMap<String, McpConnection>>,
    /// Exposed tool name -> owning server and real tool name
    routes: RwLock<HashMap<String, ToolRoute>>,
}

impl McpClient {
    /// Build from already-initialized connections
    pub async fn from_connections(connections: Vec<McpConnection>) -> Self {
        let client = Self {
            connections: RwLock::new(
                connections
                    .into_iter()
                    .map(|c| (c.name().to_string(), c))
                    .collect(),
            ),
            routes: RwLock::new(HashMap::new()),
        };
        client.rebuild_routes().await;
        client
    }

    /// Connect to every enabled server from configuration.
    ///
    /// Servers that fail to start are logged and skipped; it is an error
    /// only when none of the enabled servers could be reached.
    pub async fn from_config(servers: &BTreeMap<String, McpServerConfig>) -> Result<Self> {
        let enabled: Vec<_> = servers
            .iter()
            .filter(|(name, config)| {
                if !config.enabled {
                    tracing::debug!("Skipping disabled MCP server '{}'", name);
                }
                config.enabled
            })
            .collect();

        // Start servers concurrently
        let attempts = join_all(
            enabled
                .iter()
                .map(|(name, config)| McpConnection::connect((*name).clone(), config)),
        )
        .await;

        let mut connections = Vec::new();
        let mut failures = Vec::new();
        for ((name, _), attempt) in enabled.iter().zip(attempts) {
            match attempt {
                Ok(conn) => connections.push(conn),
                Err(e) => {
                    tracing::warn!("Failed to connect to MCP server '{}': {:#}", name, e);
                    failures.push(format!("{}: {:#}", name, e));
                }
            }
        }

        if connections.is_empty() && !failures.is_empty() {
            anyhow::bail!(
                "Could not connect to any MCP server:\n  {}",
                failures.join("\n  ")
            );
        }

        Ok(Self::from_connections(connections).await)
    }

    /// Recompute exposed tool names.
    ///
    /// A tool keeps its own name when no other server offers the same one;
    /// otherwise it is exposed as `<server>_<tool>`. If that prefixed name
    /// is itself taken, a numeric suffix is appended until it is unique.
    async fn rebuild_routes(&self) {
        let connections = self.connections.read().await;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for conn in connections.values() {
            for tool in conn.list_tools() {
                *counts.entry(tool.name.as_str()).or_default() += 1;
            }
        }

        // Unique names are claimed first so a prefixed name never displaces them
        let mut routes = HashMap::new();
        for (server, conn) in connections.iter() {
            for tool in conn.list_tools() {
                if counts[tool.name.as_str()] == 1 {
                    routes.insert(
                        tool.name.clone(),
                        ToolRoute {
                            server: server.clone(),
                            tool: tool.name.clone(),
                        },
                    );
                }
            }
        }

        for (server, conn) in connections.iter() {
            for tool in conn.list_tools() {
                if counts[tool.name.as_str()] == 1 {
                    continue;
                }
                let prefixed = format!("{}_{}", server, tool.name);
                let mut exposed = prefixed.clone();
                let mut suffix = 2;
                while routes.contains_key(&exposed) {
                    exposed = format!("{}_{}", prefixed, suffix);
                    suffix += 1;
                }
                if exposed != prefixed {
                    tracing::warn!(
                        "Tool '{}' from MCP server '{}' clashes with an existing '{}'; exposing it as '{}'",
                        tool.name,
                        server,
                        prefixed,
                        exposed
                    );
                }
                routes.insert(
                    exposed,
                    ToolRoute {
                        server: server.clone(),
                        tool: tool.name.clone(),
                    },
                );
            }
        }

        *self.routes.write().await = routes;
    }

    /// List all available tools from all connected servers
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let connections = self.connections.read().await;
        let routes = self.routes.read().await;

        let mut tools: Vec<ToolDefinition> = routes
            .iter()
            .filter_map(|(exposed, route)| {
                let conn = connections.get(&route.server)?;
                let tool = conn.list_tools().iter().find(|t| t.name == route.tool)?;
                Some(ToolDefinition {
                    name: exposed.clone(),
                    description: tool
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("Tool from MCP server '{}'", route.server)),
                    input_schema: ToolInputSchema::from_json_schema(
                        &serde_json::to_value(&tool.input_schema)
                            .unwrap_or_else(|_| json!({"type": "object"})),
                    ),
                })
            })
            .collect();

        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Execute a tool on the server that owns it
    pub async fn execute_tool(&self, tool_name: &str, params: Value) -> Result<CallToolResult> {
        let route = self
            .routes
            .read()
            .await
            .get(tool_name)
            .cloned()
            .ok_or_else(|| McpError::UnknownTool(tool_name.to_string()))?;

        tracing::debug!(
            "Executing MCP tool '{}' on server '{}'",
            route.tool,
            route.server
        );

        let connections = self.connections.read().await;
        let conn = connections
            .get(&route.server)
            .ok_or_else(|| McpError::UnknownServer(route.server.clone()))?;

        conn.call_tool(&route.tool, params)
            .await
            .with_context(|| format!("Failed to execute MCP tool '{}'", tool_name))
    }

    /// Prompts from every server, in server order
    pub async fn list_prompts(&self) -> Result<Vec<ServerPrompt>> {
        let connections = self.connections.read().await;
        let mut prompts = Vec::new();

        for (server, conn) in connections.iter() {
            let listed = conn
                .list_prompts()
                .await
                .with_context(|| format!("Failed to list prompts from '{}'", server))?;
            prompts.extend(listed.into_iter().map(|prompt| ServerPrompt {
                server: server.clone(),
                prompt,
            }));
        }

        Ok(prompts)
    }

    /// Look up a prompt by name; the first server offering it wins
    pub async fn find_prompt(&self, name: &str) -> Result<ServerPrompt> {
        self.list_prompts()
            .await?
            .into_iter()
            .find(|p| p.prompt.name == name)
            .ok_or_else(|| McpError::UnknownPrompt(name.to_string()).into())
    }

    pub async fn get_prompt(
        &self,
        server: &str,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult> {
        let connections = self.connections.read().await;
        let conn = connections
            .get(server)
            .ok_or_else(|| McpError::UnknownServer(server.to_string()))?;
        conn.get_prompt(name, arguments).await
    }

    /// Resources from every server, in server order
    pub async fn list_resources(&self) -> Result<Vec<ServerResource>> {
        let connections = self.connections.read().await;
        let mut resources = Vec::new();

        for (server, conn) in connections.iter() {
            let listed = conn
                .list_resources()
                .await
                .with_context(|| format!("Failed to list resources from '{}'", server))?;
            resources.extend(listed.into_iter().map(|resource| ServerResource {
                server: server.clone(),
                resource,
            }));
        }

        Ok(resources)
    }

    pub async fn read_resource(&self, server: &str, uri: &str) -> Result<ReadResourceResult> {
        let connections = self.connections.read().await;
        let conn = connections
            .get(server)
            .ok_or_else(|| McpError::UnknownServer(server.to_string()))?;
        conn.read_resource(uri).await
    }

    /// Get list of connected server names
    pub async fn list_servers(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Server-provided usage hints, keyed by server name
    pub async fn instructions(&self) -> Vec<(String, String)> {
        self.connections
            .read()
            .await
            .iter()
            .filter_map(|(name, conn)| {
                conn.instructions()
                    .map(|text| (name.clone(), text.to_string()))
            })
            .collect()
    }

    /// Disconnect from all servers
    pub async fn disconnect_all(&self) -> Result<()> {
        let mut connections = self.connections.write().await;

        for (name, conn) in std::mem::take(&mut *connections) {
            if let Err(e) = conn.shutdown().await {
                tracing::warn!("Failed to shutdown MCP server '{}': {}", name, e);
            }
        }
        self.routes.write().await.clear();

        tracing::info!("Disconnected from all MCP servers");
        Ok(())
    }
}

#[async_trait]
impl ToolBackend for McpClient {
    async fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_tools().await
    }

    async fn call(&self, tool_use: &ToolUse) -> Result<ToolResult> {
        let result = self
            .execute_tool(&tool_use.name, tool_use.input.clone())
            .await?;

        let text = tool_result_text(&result);
        Ok(if tool_result_failed(&result) {
            ToolResult::error(tool_use.id.clone(), text)
        } else {
            ToolResult::success(tool_use.id.clone(), text)
        })
    }
}

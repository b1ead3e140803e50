// MCP (Model Context Protocol) integration
//
// Connects to external MCP servers and exposes their tools, prompts and
// resources.
//
// Architecture:
// - McpClient: Manages multiple server connections and tool-name routing
// - McpConnection: One initialized server
// - McpSession: Requests against a running rust-mcp-sdk client runtime
// - McpServerConfig: Configuration for MCP servers
//
// Usage:
// ```rust
// let mcp_client = McpClient::from_config(&config.mcp_servers).await?;
// let tools = mcp_client.list_tools().await;
// let result = mcp_client.execute_tool("search_wikipedia", params).await?;
// ```

pub mod client;
pub mod config;
pub mod connection;
pub mod content;
pub mod error;
pub mod session;

pub use client::{McpClient, ServerPrompt, ServerResource};
pub use config::{McpServerConfig, TransportType};
pub use connection::McpConnection;
pub use error::McpError;
pub use session::McpSession;

// MCP server configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::constants::{DEFAULT_MCP_ARGS, DEFAULT_MCP_COMMAND, DEFAULT_MCP_TIMEOUT_SECS};

/// MCP server configuration
///
/// ```toml
/// [mcp_servers.wikipedia]
/// transport = "stdio"
/// command = "python"
/// args = ["mcp_server.py"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Transport type (stdio or sse)
    #[serde(default)]
    pub transport: TransportType,

    /// Command to execute (for STDIO transport)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Command arguments (for STDIO transport)
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the server process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// URL (for SSE transport)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_MCP_TIMEOUT_SECS
}

/// Transport type for MCP servers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Standard I/O transport (local process)
    #[default]
    Stdio,
    /// HTTP + Server-Sent Events transport (remote server)
    Sse,
}

impl McpServerConfig {
    /// A stdio server launched with `command args...`
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            transport: TransportType::Stdio,
            command: Some(command.into()),
            args,
            env: HashMap::new(),
            url: None,
            enabled: true,
            timeout_secs: DEFAULT_MCP_TIMEOUT_SECS,
        }
    }

    /// The Wikipedia lookup server used when nothing is configured
    pub fn default_wikipedia() -> Self {
        Self::stdio(
            DEFAULT_MCP_COMMAND,
            DEFAULT_MCP_ARGS.iter().map(|a| a.to_string()).collect(),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self, name: &str) -> anyhow::Result<()> {
        match self.transport {
            TransportType::Stdio => {
                if self.command.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    anyhow::bail!(
                        "MCP server '{}': STDIO transport requires 'command' field",
                        name
                    );
                }
            }
            TransportType::Sse => {
                anyhow::bail!(
                    "MCP server '{}': SSE transport is not supported, use 'stdio'",
                    name
                );
            }
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("MCP server '{}': timeout_secs must be greater than 0", name);
        }
        Ok(())
    }
}

// Typed errors surfaced by the MCP layer

use rust_mcp_sdk::error::McpSdkError;
use rust_mcp_sdk::schema::schema_utils::{SdkError, SdkErrorCodes};
use rust_mcp_sdk::TransportError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    /// The server answered with a JSON-RPC error object
    #[error("MCP server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("MCP request '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    /// The server process exited or closed stdout
    #[error("MCP server '{0}' closed the connection")]
    Closed(String),

    /// Any other failure reported by the MCP runtime
    #[error("MCP request '{method}' to '{server}' failed: {message}")]
    Sdk {
        server: String,
        method: String,
        message: String,
    },

    #[error("MCP server '{0}' did not complete initialization")]
    NotInitialized(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Prompt '{0}' not found")]
    UnknownPrompt(String),

    #[error("Resource '{0}' not found")]
    UnknownResource(String),

    #[error("MCP server '{0}' is not connected")]
    UnknownServer(String),
}

impl McpError {
    /// Classify a runtime error for the request `method` sent to `server`
    pub fn from_sdk(server: &str, method: &str, timeout: Duration, error: McpSdkError) -> Self {
        match error {
            McpSdkError::RpcError(rpc)
            | McpSdkError::Transport(TransportError::JsonrpcError(rpc)) => McpError::Rpc {
                code: rpc.code,
                message: rpc.message,
            },
            McpSdkError::Transport(TransportError::Sdk(sdk)) | McpSdkError::SdkError(sdk) => {
                Self::from_sdk_code(server, method, timeout, sdk)
            }
            McpSdkError::Transport(TransportError::ChannelClosed(_)) => {
                McpError::Closed(server.to_string())
            }
            other => McpError::Sdk {
                server: server.to_string(),
                method: method.to_string(),
                message: other.to_string(),
            },
        }
    }

    fn from_sdk_code(server: &str, method: &str, timeout: Duration, error: SdkError) -> Self {
        if error.code == i64::from(SdkErrorCodes::REQUEST_TIMEOUT) {
            McpError::Timeout {
                method: method.to_string(),
                timeout,
            }
        } else if error.code == i64::from(SdkErrorCodes::CONNECTION_CLOSED) {
            McpError::Closed(server.to_string())
        } else {
            McpError::Sdk {
                server: server.to_string(),
                method: method.to_string(),
                message: error.message,
            }
        }
    }
}

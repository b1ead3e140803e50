// Tool execution system
//
// The model's tools come from MCP servers; this module turns their
// catalogue into model-facing definitions and runs the calls.

pub mod executor;
pub mod mcp;
pub mod types;

pub use executor::{ToolBackend, ToolExecutor};
pub use types::{ToolDefinition, ToolInputSchema, ToolResult, ToolUse};

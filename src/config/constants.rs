// Project-wide constants
//
// Centralised here so defaults have one source of truth. Import via
// `use crate::config::constants::*;`.

/// Directory under `$HOME` holding `config.toml`
pub const CONFIG_DIR: &str = ".wikiask";
pub const CONFIG_FILE: &str = "config.toml";

// Environment variables
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_OPENAI_API_KEY: &str = "API_KEY";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_MODEL: &str = "WIKIASK_MODEL";

/// Root of the OpenAI-compatible server; `/v1/chat/completions` is appended.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const DEFAULT_OPENAI_MODEL: &str = "Qwen2.5-7B-Instruct";
pub const DEFAULT_OPENAI_TEMPERATURE: f32 = 0.0;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_TEMPERATURE: f32 = 0.1;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that uses tools to search Wikipedia.";

/// Tool rounds per question before the model is asked to answer without tools
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Default maximum tokens per model response.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Conversation history budget (estimated tokens) sent with each request
pub const DEFAULT_CONTEXT_LIMIT_TOKENS: usize = 32_000;

/// Name of the MCP server used when none is configured
pub const DEFAULT_MCP_SERVER_NAME: &str = "wikipedia";
pub const DEFAULT_MCP_COMMAND: &str = "python";
pub const DEFAULT_MCP_ARGS: &[&str] = &["mcp_server.py"];

/// Per-request timeout for MCP calls, in seconds
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 60;

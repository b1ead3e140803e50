// Configuration structs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::constants::{
    DEFAULT_CONTEXT_LIMIT_TOKENS, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TOOL_ROUNDS,
    DEFAULT_MCP_SERVER_NAME, DEFAULT_SYSTEM_PROMPT,
};
use super::provider::ProviderConfig;
use crate::tools::mcp::McpServerConfig;

/// Conversation loop settings (`[agent]` table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// Tool rounds allowed per question
    pub max_tool_rounds: usize,
    /// Maximum tokens per model response
    pub max_tokens: u32,
    /// History budget sent with each request
    pub context_limit_tokens: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            max_tokens: DEFAULT_MAX_TOKENS,
            context_limit_tokens: DEFAULT_CONTEXT_LIMIT_TOKENS,
        }
    }
}

impl AgentConfig {
    fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            anyhow::bail!("agent.max_tokens must be greater than 0");
        }
        if self.context_limit_tokens == 0 {
            anyhow::bail!("agent.context_limit_tokens must be greater than 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted model that answers questions
    pub provider: ProviderConfig,

    /// MCP (Model Context Protocol) server configurations, by name
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    pub agent: AgentConfig,
}

impl Config {
    /// Defaults around a provider: the stock Wikipedia server and agent settings
    pub fn new(provider: ProviderConfig) -> Self {
        let mut mcp_servers = BTreeMap::new();
        mcp_servers.insert(
            DEFAULT_MCP_SERVER_NAME.to_string(),
            McpServerConfig::default_wikipedia(),
        );

        Self {
            provider,
            mcp_servers,
            agent: AgentConfig::default(),
        }
    }

    /// Command-line flags take precedence over everything else
    pub fn apply_overrides(&mut self, model: Option<String>, base_url: Option<String>) {
        if let Some(model) = model {
            self.provider.model = Some(model);
        }
        if let Some(base_url) = base_url {
            self.provider.base_url = Some(base_url);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.provider
            .validate()
            .context("Invalid [provider] configuration")?;

        let enabled = self.mcp_servers.values().filter(|s| s.enabled).count();
        if enabled == 0 {
            anyhow::bail!("No MCP servers are enabled; at least one is needed for tools");
        }
        for (name, server) in &self.mcp_servers {
            if server.enabled {
                server.validate(name)?;
            }
        }

        self.agent.validate()
    }
}

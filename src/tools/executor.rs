// Tool execution engine
//
// Runs the tool calls a model asked for and turns every outcome, including
// failures, into a result the model can read.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::tools::types::{ToolDefinition, ToolResult, ToolUse};

/// Something that can advertise and execute tools
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Tool catalogue to advertise to the model
    async fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute one tool call
    async fn call(&self, tool_use: &ToolUse) -> Result<ToolResult>;
}

/// Tool executor - manages tool execution lifecycle
#[derive(Clone)]
pub struct ToolExecutor {
    backend: Arc<dyn ToolBackend>,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn ToolBackend>) -> Self {
        Self { backend }
    }

    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        self.backend.definitions().await
    }

    /// Execute a single tool use. Never fails: backend errors become
    /// error results so the model can react to them.
    #[instrument(skip(self, tool_use), fields(tool = %tool_use.name, id = %tool_use.id))]
    pub async fn execute_tool(&self, tool_use: &ToolUse) -> ToolResult {
        info!("Executing tool: {}", tool_use.name);

        match self.backend.call(tool_use).await {
            Ok(result) => {
                if result.is_error {
                    warn!("Tool reported an error: {}", result.content);
                } else {
                    debug!("Tool returned {} bytes", result.content.len());
                }
                result
            }
            Err(e) => {
                warn!("Tool execution failed: {:#}", e);
                ToolResult::error(tool_use.id.clone(), format!("Execution error: {:#}", e))
            }
        }
    }

    /// Execute multiple tool uses in sequence, preserving order
    #[instrument(skip(self, tool_uses), fields(count = tool_uses.len()))]
    pub async fn execute_all(&self, tool_uses: &[ToolUse]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(tool_uses.len());
        for tool_use in tool_uses {
            results.push(self.execute_tool(tool_use).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ToolInputSchema;
    use serde_json::json;

    struct MockBackend;

    #[async_trait]
    impl ToolBackend for MockBackend {
        async fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "search_wikipedia".to_string(),
                description: "Search Wikipedia".to_string(),
                input_schema: ToolInputSchema::simple(vec![("query", "Search terms")]),
            }]
        }

        async fn call(&self, tool_use: &ToolUse) -> Result<ToolResult> {
            match tool_use.input["query"].as_str() {
                Some("fail") => anyhow::bail!("server went away"),
                Some("missing") => Ok(ToolResult::error(
                    tool_use.id.clone(),
                    "No article found".to_string(),
                )),
                Some(q) => Ok(ToolResult::success(
                    tool_use.id.clone(),
                    format!("Article about {}", q),
                )),
                None => anyhow::bail!("query is required"),
            }
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(MockBackend))
    }

    #[tokio::test]
    async fn test_successful_tool_call() {
        let result = executor()
            .execute_tool(&ToolUse::new("call_1", "search_wikipedia", json!({"query": "Rust"})))
            .await;
        assert_eq!(result, ToolResult::success("call_1".into(), "Article about Rust".into()));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_error_result() {
        let result = executor()
            .execute_tool(&ToolUse::new("call_2", "search_wikipedia", json!({"query": "fail"})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.tool_use_id, "call_2");
        assert!(result.content.contains("server went away"));
    }

    #[tokio::test]
    async fn test_tool_reported_error_is_kept() {
        let result = executor()
            .execute_tool(&ToolUse::new("call_3", "search_wikipedia", json!({"query": "missing"})))
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "No article found");
    }

    #[tokio::test]
    async fn test_execute_all_preserves_order() {
        let uses = vec![
            ToolUse::new("a", "search_wikipedia", json!({"query": "Ada"})),
            ToolUse::new("b", "search_wikipedia", json!({})),
            ToolUse::new("c", "search_wikipedia", json!({"query": "Babbage"})),
        ];
        let results = executor().execute_all(&uses).await;
        let ids: Vec<_> = results.iter().map(|r| r.tool_use_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(results[1].is_error);
    }

    #[tokio::test]
    async fn test_definitions_pass_through() {
        let defs = executor().definitions().await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "search_wikipedia");
    }
}

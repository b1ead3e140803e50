// Question answering loop
//
// One persistent conversation per process. Each question runs
// chat -> tools -> chat until the model answers in plain text.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::providers::{sanitize_messages, LlmProvider, Message, ProviderRequest, ProviderResponse};
use crate::tools::{ToolDefinition, ToolExecutor, ToolResult};

/// A model with tools and a running conversation
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    config: AgentConfig,
    temperature: Option<f32>,
    history: Vec<Message>,
}

impl Agent {
    pub fn new(provider: Arc<dyn LlmProvider>, executor: ToolExecutor, config: AgentConfig) -> Self {
        Self {
            provider,
            executor,
            config,
            temperature: None,
            history: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask a question in the ongoing conversation and return the answer.
    ///
    /// A failed question leaves no trace in the history.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            anyhow::bail!("Question is empty");
        }

        let checkpoint = self.history.len();
        self.history.push(Message::user(question));

        match self.run_turn().await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                self.history.truncate(checkpoint);
                sanitize_messages(&mut self.history);
                Err(e)
            }
        }
    }

    /// Forget the conversation
    pub fn reset(&mut self) {
        debug!("Clearing {} messages of history", self.history.len());
        self.history.clear();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    async fn run_turn(&mut self) -> Result<String> {
        let tools = self.executor.definitions().await;
        let max_rounds = self.config.max_tool_rounds;

        for round in 1..=max_rounds {
            let response = self.chat(Some(&tools)).await?;

            if !response.has_tool_uses() {
                info!("Answered after {} model call(s)", round);
                return self.finish(response);
            }

            let tool_uses = response.tool_uses();
            debug!("Round {}/{}: {} tool call(s)", round, max_rounds, tool_uses.len());

            let results = self.executor.execute_all(&tool_uses).await;
            self.history.push(response.to_message());
            self.history.push(Message::with_content(
                "user",
                results.iter().map(ToolResult::to_content_block).collect(),
            ));
        }

        if max_rounds > 0 {
            warn!(
                "Reached {} tool rounds, asking for an answer without tools",
                max_rounds
            );
        }
        let response = self.chat(None).await?;
        self.finish(response)
    }

    async fn chat(&self, tools: Option<&[ToolDefinition]>) -> Result<ProviderResponse> {
        let mut request = ProviderRequest::new(self.history.clone())
            .with_system(self.config.system_prompt.clone())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.temperature);
        if let Some(tools) = tools {
            request = request.with_tools(tools.to_vec());
        }

        let dropped = request.truncate_to_context_limit(self.config.context_limit_tokens);
        if dropped > 0 {
            debug!("Dropped {} old messages to fit the context limit", dropped);
        }

        self.provider
            .send_message(&request)
            .await
            .with_context(|| format!("Request to {} failed", self.provider.name()))
    }

    /// Record the model's final turn and return its text
    fn finish(&mut self, response: ProviderResponse) -> Result<String> {
        if response.has_tool_uses() {
            warn!("Ignoring tool calls in a response sent without tools");
        }

        let answer = response.text();
        if answer.trim().is_empty() {
            anyhow::bail!(
                "Model returned an empty answer (stop reason: {})",
                response.stop_reason.as_deref().unwrap_or("unknown")
            );
        }

        self.history.push(Message::assistant(answer.clone()));
        Ok(answer)
    }
}

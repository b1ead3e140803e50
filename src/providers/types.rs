// Unified request/response types for multi-provider LLM support
//
// These types abstract over provider-specific formats (OpenAI-compatible, Gemini)
// so the agent loop works with one conversation representation.

use crate::tools::types::{ToolDefinition, ToolUse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// "user" or "assistant"
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_content("user", vec![ContentBlock::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_content("assistant", vec![ContentBlock::text(text)])
    }

    pub fn with_content(role: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }

    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content block - supports text, tool_use, and tool_result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Check if this is a tool use block
    pub fn is_tool_use(&self) -> bool {
        matches!(self, ContentBlock::ToolUse { .. })
    }

    /// Check if this is a tool result block
    pub fn is_tool_result(&self) -> bool {
        matches!(self, ContentBlock::ToolResult { .. })
    }

    /// Extract text from text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Unified request format for all LLM providers
///
/// Each provider implementation transforms this into its own API format.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    pub messages: Vec<Message>,

    /// Model name (empty = provider default)
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// System prompt (sent as a leading system message for OpenAI-compatible
    /// providers, as `systemInstruction` for Gemini)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: String::new(),
            max_tokens: 4096,
            system: None,
            tools: None,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach tools; an empty list is treated as "no tools"
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Remove orphaned tool_use blocks from the end of the conversation.
    ///
    /// When a turn fails mid-loop the history may end with an assistant
    /// message whose tool calls never got results. Both providers reject
    /// such histories, so the orphaned tail is trimmed.
    pub fn sanitize_messages(&mut self) {
        sanitize_messages(&mut self.messages);
    }

    /// Truncate conversation history to fit within a context window.
    ///
    /// Uses a 3-chars-per-token estimate. Drops the oldest messages first and
    /// always keeps the last one. Returns the number of messages dropped.
    ///
    /// The budget is `token_limit - system_prompt_tokens - max_tokens`.
    ///
    /// The kept history never opens with a tool-result turn. When the newest
    /// exchange alone is over budget, it is kept from the question that
    /// started it and its tool results are shortened instead.
    pub fn truncate_to_context_limit(&mut self, token_limit: usize) -> usize {
        let system_tokens = self.system.as_deref().map(|s| s.len() / 3).unwrap_or(0);
        let budget = token_limit
            .saturating_sub(system_tokens)
            .saturating_sub(self.max_tokens as usize);

        let costs: Vec<usize> = self.messages.iter().map(estimate_message_tokens).collect();
        if costs.iter().sum::<usize>() <= budget {
            return 0;
        }

        // Newest messages have priority
        let mut running = 0usize;
        let mut keep_from = self.messages.len();
        for i in (0..self.messages.len()).rev() {
            if running + costs[i] > budget {
                break;
            }
            running += costs[i];
            keep_from = i;
        }
        keep_from = keep_from.min(self.messages.len().saturating_sub(1));

        // A tool result cut off from its tool_use cannot open the history.
        // Skip ahead to the next question, or back up to the one that
        // opened this exchange when there is none.
        if self.messages.get(keep_from).is_some_and(is_tool_result_turn) {
            let next_question = (keep_from..self.messages.len()).find(|&i| is_question(&self.messages[i]));
            let opening_question = (0..keep_from).rev().find(|&i| is_question(&self.messages[i]));
            keep_from = next_question
                .or(opening_question)
                .unwrap_or_else(|| keep_from.saturating_sub(1));
        }

        let before = self.messages.len();
        self.messages.drain(..keep_from);

        shorten_tool_results(&mut self.messages, budget);

        before - self.messages.len()
    }
}

/// Suffix appended to tool output shortened to fit the context window
const TRUNCATION_MARKER: &str = "\n[... truncated to fit the context window]";

/// Tool output is never shortened below this many bytes
const MIN_TOOL_RESULT_CHARS: usize = 200;

/// Shorten the largest tool results until the history fits `budget`
fn shorten_tool_results(messages: &mut [Message], budget: usize) {
    let total: usize = messages.iter().map(estimate_message_tokens).sum();
    let mut excess = total.saturating_sub(budget) * 3;
    if excess == 0 {
        return;
    }

    let mut results: Vec<&mut String> = messages
        .iter_mut()
        .flat_map(|msg| msg.content.iter_mut())
        .filter_map(|block| match block {
            ContentBlock::ToolResult { content, .. } => Some(content),
            _ => None,
        })
        .collect();
    results.sort_by_key(|content| std::cmp::Reverse(content.len()));

    for content in results {
        if excess == 0 {
            break;
        }
        let removable = content.len().saturating_sub(MIN_TOOL_RESULT_CHARS);
        let cut = (excess + TRUNCATION_MARKER.len()).min(removable);
        if cut <= TRUNCATION_MARKER.len() {
            continue;
        }

        let mut end = content.len() - cut;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        content.truncate(end);
        content.push_str(TRUNCATION_MARKER);
        excess = excess.saturating_sub(cut - TRUNCATION_MARKER.len());
    }
}

/// Trim trailing assistant turns whose tool calls have no matching results.
pub fn sanitize_messages(messages: &mut Vec<Message>) {
    while let Some(last_assistant) = messages.iter().rposition(|m| m.role == "assistant") {
        let tool_use_ids: Vec<&str> = messages[last_assistant]
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();

        if tool_use_ids.is_empty() {
            break;
        }

        let next = last_assistant + 1;
        let all_matched = messages.get(next).is_some_and(|reply| {
            tool_use_ids.iter().all(|id| {
                reply.content.iter().any(
                    |b| matches!(b, ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == id),
                )
            })
        });

        if all_matched {
            break;
        }

        if messages.get(next).is_some_and(is_tool_result_turn) {
            messages.remove(next);
        }
        messages.remove(last_assistant);
    }
}

fn is_tool_result_turn(msg: &Message) -> bool {
    msg.role == "user" && !msg.content.is_empty() && msg.content.iter().all(|b| b.is_tool_result())
}

/// A user turn that asks something rather than answering tool calls
fn is_question(msg: &Message) -> bool {
    msg.role == "user" && !msg.content.iter().any(|b| b.is_tool_result())
}

/// Rough token cost of a message (3 chars/token plus structural overhead)
fn estimate_message_tokens(msg: &Message) -> usize {
    let chars: usize = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => text.len(),
            ContentBlock::ToolUse { name, input, .. } => name.len() + input.to_string().len(),
            ContentBlock::ToolResult { content, .. } => content.len(),
        })
        .sum();
    (chars / 3).max(1) + 4
}

/// Unified response format from LLM providers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub role: String,
    /// Provider name ("openai", "gemini")
    pub provider: String,
}

impl ProviderResponse {
    /// Extract text from the response
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_tool_uses(&self) -> bool {
        self.content.iter().any(|block| block.is_tool_use())
    }

    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Convert to Message for conversation history
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role.clone(),
            content: self.content.clone(),
        }
    }
}

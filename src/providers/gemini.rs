// Google Gemini API provider implementation
//
// Gemini has a different message format compared to OpenAI, requiring
// custom conversion logic: roles are "user"/"model", tool calls carry no
// ids, and function responses are matched back by function name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use super::error::ApiError;
use super::retry::{with_retry, RetryPolicy};
use super::types::{ContentBlock, ProviderRequest, ProviderResponse};
use super::LlmProvider;

const REQUEST_TIMEOUT_SECS: u64 = 60;
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// JSON-schema keywords the function-declaration schema dialect rejects
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &[
    "$schema",
    "$id",
    "$ref",
    "$defs",
    "additionalProperties",
    "default",
    "examples",
    "title",
];

/// Google Gemini API provider
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    retry: RetryPolicy,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            default_model: "gemini-2.0-flash".to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Create with custom default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Convert ProviderRequest to Gemini API format
    fn to_gemini_request(&self, request: &ProviderRequest) -> GeminiRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        // functionResponse must name the function, not the synthetic call id
        let call_names: HashMap<&str, &str> = request
            .messages
            .iter()
            .flat_map(|msg| msg.content.iter())
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, .. } => Some((id.as_str(), name.as_str())),
                _ => None,
            })
            .collect();

        let contents: Vec<GeminiContent> = request
            .messages
            .iter()
            .filter_map(|msg| {
                // Gemini uses "model" instead of "assistant"
                let role = if msg.role == "assistant" { "model" } else { "user" };

                let parts: Vec<GeminiPart> = msg
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } if text.is_empty() => None,
                        ContentBlock::Text { text } => Some(GeminiPart::Text { text: text.clone() }),
                        ContentBlock::ToolUse { name, input, .. } => Some(GeminiPart::FunctionCall {
                            function_call: GeminiFunctionCall {
                                name: name.clone(),
                                args: input.clone(),
                            },
                        }),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            is_error,
                        } => {
                            let name = call_names
                                .get(tool_use_id.as_str())
                                .map(|n| n.to_string())
                                .unwrap_or_else(|| tool_use_id.clone());
                            let response = if is_error.unwrap_or(false) {
                                serde_json::json!({ "error": content })
                            } else {
                                serde_json::json!({ "content": content })
                            };
                            Some(GeminiPart::FunctionResponse {
                                function_response: GeminiFunctionResponse { name, response },
                            })
                        }
                    })
                    .collect();

                if parts.is_empty() {
                    None
                } else {
                    Some(GeminiContent {
                        role: role.to_string(),
                        parts,
                    })
                }
            })
            .collect();

        let tools = request.tools.as_ref().map(|tool_defs| {
            vec![GeminiTools {
                function_declarations: tool_defs
                    .iter()
                    .map(|tool| {
                        let parameters = match serde_json::to_value(&tool.input_schema) {
                            Ok(value) => gemini_parameters(value),
                            Err(e) => {
                                tracing::warn!(
                                    "Failed to convert tool schema for '{}': {}",
                                    tool.name,
                                    e
                                );
                                None
                            }
                        };

                        GeminiFunctionDeclaration {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters,
                        }
                    })
                    .collect(),
            }]
        });

        let system_instruction = request.system.as_ref().map(|system| GeminiSystemInstruction {
            parts: vec![GeminiPart::Text {
                text: system.clone(),
            }],
        });

        GeminiRequest {
            model,
            contents,
            system_instruction,
            tools,
            generation_config: Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: Some(request.max_tokens),
            }),
        }
    }

    /// Convert Gemini response to ProviderResponse
    fn from_gemini_response(
        &self,
        response: GeminiResponse,
        model: String,
    ) -> Result<ProviderResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates in response")?;

        let mut content = Vec::new();

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        content.push(ContentBlock::Text { text });
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    // Gemini doesn't provide tool call IDs
                    let unique_id = format!("gemini_{}_{}", function_call.name, Uuid::new_v4());
                    content.push(ContentBlock::ToolUse {
                        id: unique_id,
                        name: function_call.name,
                        input: if function_call.args.is_null() {
                            serde_json::json!({})
                        } else {
                            function_call.args
                        },
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
            }
        }

        Ok(ProviderResponse {
            id: response
                .response_id
                .unwrap_or_else(|| "gemini-response".to_string()),
            model,
            content,
            stop_reason: candidate.finish_reason,
            role: "assistant".to_string(),
            provider: "gemini".to_string(),
        })
    }

    /// Send a single message request (no retry)
    async fn send_message_once(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let gemini_request = self.to_gemini_request(request);
        let model = gemini_request.model.clone();

        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        tracing::debug!("Sending request to Gemini API: {:?}", gemini_request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ApiError::new("Gemini", status.as_u16(), error_body).into());
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        tracing::debug!("Received response: {:?}", gemini_response);

        self.from_gemini_response(gemini_response, model)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        with_retry(self.retry, || self.send_message_once(request)).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Strip keywords Gemini rejects; a parameterless tool sends no schema at all
fn gemini_parameters(mut schema: Value) -> Option<Value> {
    strip_unsupported(&mut schema);
    let has_properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| !props.is_empty());
    has_properties.then_some(schema)
}

fn strip_unsupported(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in UNSUPPORTED_SCHEMA_KEYS {
                map.remove(*key);
            }
            for (key, child) in map.iter_mut() {
                // Property names are user data, not keywords
                if key == "properties" {
                    if let Value::Object(props) = child {
                        props.values_mut().for_each(strip_unsupported);
                    }
                } else {
                    strip_unsupported(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_unsupported),
        _ => {}
    }
}

// Gemini API types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip)]
    model: String, // Used in URL, not in body
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String, // "user" or "model"
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part kinds this client never produces (inline data, code execution)
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    response_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

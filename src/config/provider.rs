// Model provider entry

use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{
    DEFAULT_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_TEMPERATURE, DEFAULT_OPENAI_MODEL,
    DEFAULT_OPENAI_TEMPERATURE, ENV_GOOGLE_API_KEY, ENV_OPENAI_API_KEY,
};
use crate::providers::gemini::GEMINI_BASE_URL;

/// Which hosted API answers the questions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any server speaking the OpenAI chat completions API
    Openai,
    Gemini,
}

impl ProviderKind {
    /// Environment variable that supplies this provider's key
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Openai => ENV_OPENAI_API_KEY,
            Self::Gemini => ENV_GOOGLE_API_KEY,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Openai => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// The `[provider]` table.
///
/// ```toml
/// [provider]
/// type = "openai"
/// api_key = "EMPTY"
/// base_url = "http://localhost:8000"
/// model = "Qwen2.5-7B-Instruct"
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Openai,
            api_key: api_key.into(),
            model: None,
            base_url: Some(base_url.into()),
            temperature: None,
        }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Gemini,
            api_key: api_key.into(),
            model: None,
            base_url: None,
            temperature: None,
        }
    }

    pub fn model(&self) -> &str {
        match (&self.model, self.kind) {
            (Some(model), _) => model,
            (None, ProviderKind::Openai) => DEFAULT_OPENAI_MODEL,
            (None, ProviderKind::Gemini) => DEFAULT_GEMINI_MODEL,
        }
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.kind) {
            (Some(url), _) => url,
            (None, ProviderKind::Openai) => DEFAULT_BASE_URL,
            (None, ProviderKind::Gemini) => GEMINI_BASE_URL,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(match self.kind {
            ProviderKind::Openai => DEFAULT_OPENAI_TEMPERATURE,
            ProviderKind::Gemini => DEFAULT_GEMINI_TEMPERATURE,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!(
                "No API key for the {} provider. Set {} or 'api_key' under [provider].",
                self.kind,
                self.kind.api_key_env()
            );
        }
        if self.model().trim().is_empty() {
            anyhow::bail!("Provider model name cannot be empty");
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("Provider temperature must be between 0.0 and 2.0, got {}", t);
            }
        }
        Ok(())
    }
}

// Keys stay out of debug logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model())
            .field("base_url", &self.base_url())
            .field("temperature", &self.temperature())
            .finish()
    }
}

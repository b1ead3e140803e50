// Provider factory
//
// Creates the LLM provider described by configuration

use anyhow::Result;
use std::sync::Arc;

use super::gemini::GeminiProvider;
use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::{ProviderConfig, ProviderKind};

/// Create an `LlmProvider` from the `[provider]` configuration
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    tracing::debug!("Creating {} provider (model {})", config.kind, config.model());

    let provider: Arc<dyn LlmProvider> = match config.kind {
        ProviderKind::Openai => Arc::new(
            OpenAIProvider::new(config.api_key.clone(), config.base_url())?
                .with_model(config.model()),
        ),
        ProviderKind::Gemini => Arc::new(
            GeminiProvider::new(config.api_key.clone())?
                .with_base_url(config.base_url())
                .with_model(config.model()),
        ),
    };

    Ok(provider)
}

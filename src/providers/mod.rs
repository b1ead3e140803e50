// Multi-provider LLM support
//
// This module provides an abstraction layer over the hosted model APIs
// (OpenAI-compatible servers and Gemini) behind a unified interface.

use anyhow::Result;
use async_trait::async_trait;

pub mod error;
pub mod retry;
pub mod types;

// Provider implementations
pub mod gemini;
pub mod openai;

// Provider factory
pub mod factory;

// Re-export commonly used types
pub use error::ApiError;
pub use factory::create_provider;
pub use retry::RetryPolicy;
pub use types::{sanitize_messages, ContentBlock, Message, ProviderRequest, ProviderResponse};

/// Trait for LLM providers
///
/// All providers implement this trait, providing a unified interface for
/// sending a conversation and receiving the model's complete reply.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and get a complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Get the provider name (e.g., "openai", "gemini")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}

//! Text-completion delegate interface
//!
//! The memory engine treats the model endpoint as a black box behind
//! [`LLMProvider`]: an ordered message list goes in, completion text comes
//! back. Sessions and the summarizer receive their delegate as an explicit
//! `Arc<dyn LLMProvider>` handle at construction; there is no shared global
//! client.

use async_trait::async_trait;

use crate::conversation::Message;
use crate::error::Result;

pub mod factory;
pub mod providers;

pub use factory::LLMProviderFactory;

/// Request to a text-completion delegate
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Ordered messages transmitted for this call
    pub messages: Vec<Message>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,

    /// Stop sequences
    pub stop_sequences: Vec<String>,
}

impl LLMRequest {
    /// Build a request from an outgoing view's messages.
    pub fn from_view(messages: &[Message]) -> Self {
        Self {
            messages: messages.to_vec(),
            temperature: None,
            max_tokens: None,
            stop_sequences: Vec::new(),
        }
    }

    /// Build a single-instruction request (summarizer path).
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            temperature: None,
            max_tokens: None,
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a text-completion delegate
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content
    pub content: String,

    /// Token usage reported by the provider, when available
    pub usage: Option<TokenUsage>,
}

/// Provider-reported token usage
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Trait for text-completion delegate implementations.
///
/// Implementors handle the actual endpoint calls (Groq, OpenAI, test mocks).
/// Failures are opaque to the engine, which maps them to a failed turn or a
/// summarization fallback.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a structured request.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

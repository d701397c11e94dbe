//! Groq provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::error::{MnemeError, Result};
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, ModelInfo, TokenUsage};

/// Groq provider (fast, cost-effective, the default for interactive chat).
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqProvider {
    /// Create a new Groq provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Groq API key
    /// * `model` - Model name (e.g., "llama-3.1-8b-instant")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `GROQ_API_KEY` - API key (required)
    /// - `GROQ_MODEL` - Model name (optional, defaults to "llama-3.1-8b-instant")
    ///
    /// # Errors
    ///
    /// Returns an error if GROQ_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").map_err(|_| {
            MnemeError::Configuration("GROQ_API_KEY environment variable not set".to_string())
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("GROQ_MODEL").ok())
            .unwrap_or_else(|| "llama-3.1-8b-instant".to_string());

        Ok(Self::new(api_key, model))
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Serialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    usage: Option<GroqUsage>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqMessageResponse,
}

#[derive(Deserialize)]
struct GroqMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct GroqUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

fn convert_messages(messages: &[Message]) -> Vec<GroqMessage> {
    messages
        .iter()
        .map(|m| GroqMessage {
            role: m.role.wire_role().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl LLMProvider for GroqProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let groq_request = GroqRequest {
            model: self.model.clone(),
            messages: convert_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: if request.stop_sequences.is_empty() {
                None
            } else {
                Some(request.stop_sequences.clone())
            },
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&groq_request)
            .send()
            .await
            .map_err(|e| {
                MnemeError::GenerationFailed(format!("Failed to send request to Groq: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MnemeError::GenerationFailed(format!(
                "Groq API error ({}): {}",
                status, text
            )));
        }

        let groq_response: GroqResponse = response.json().await.map_err(|e| {
            MnemeError::GenerationFailed(format!("Failed to parse Groq response: {}", e))
        })?;

        if groq_response.choices.is_empty() {
            return Err(MnemeError::GenerationFailed(
                "Groq API returned no choices".to_string(),
            ));
        }

        let content = groq_response.choices[0].message.content.clone();
        let usage = groq_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LLMResponse { content, usage })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "groq".to_string(),
            model_name: self.model.clone(),
        }
    }
}

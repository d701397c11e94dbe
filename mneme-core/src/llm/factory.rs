//! Factory for creating completion providers from configuration

use std::sync::Arc;

use crate::config::{LLMProviderConfig, ProviderKind};
use crate::error::Result;
use crate::llm::providers::{GroqProvider, OpenAiProvider};
use crate::llm::LLMProvider;

/// Factory for creating completion providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create a provider from configuration.
    ///
    /// API keys come from the config when present, otherwise from the
    /// provider's environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing
    /// API key).
    pub fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        let model = if config.model.is_empty() {
            None
        } else {
            Some(config.model.clone())
        };

        match config.provider {
            ProviderKind::Groq => {
                let provider = if let Some(api_key) = &config.api_key {
                    let model = model
                        .or_else(|| std::env::var("GROQ_MODEL").ok())
                        .unwrap_or_else(|| "llama-3.1-8b-instant".to_string());
                    GroqProvider::new(api_key.clone(), model)
                } else {
                    GroqProvider::from_env(model)?
                };
                Ok(Arc::new(provider))
            }

            ProviderKind::OpenAi => {
                let provider = if let Some(api_key) = &config.api_key {
                    let model = model
                        .or_else(|| std::env::var("OPENAI_MODEL").ok())
                        .unwrap_or_else(|| "gpt-4o-mini".to_string());

                    if let Some(base_url) = &config.base_url {
                        OpenAiProvider::with_base_url(api_key.clone(), model, base_url.clone())
                    } else {
                        OpenAiProvider::new(api_key.clone(), model)
                    }
                } else {
                    OpenAiProvider::from_env(model)?
                };
                Ok(Arc::new(provider))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_groq_with_config_key() {
        let config = LLMProviderConfig {
            provider: ProviderKind::Groq,
            model: "llama-3.1-8b-instant".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().provider, "groq");
    }

    #[test]
    fn test_create_openai_with_base_url() {
        let config = LLMProviderConfig {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some("https://proxy.internal/v1".to_string()),
        };

        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().provider, "openai");
    }
}

//! Configuration types for the memory engine

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conversation::MemoryPolicy;
use crate::error::{MnemeError, Result};

/// Main configuration for the memory engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MnemeConfig {
    /// Conversation store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Memory policy selection and sizing
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Completion provider configuration (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LLMProviderConfig>,
}

/// Conversation store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Volatile store, nothing survives the process
    Memory,

    /// SQLite-backed durable store
    Sqlite {
        /// Database file path
        db_path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            db_path: PathBuf::from("./data/mneme.db"),
        }
    }
}

/// Memory policy selection and sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Active policy: "stuffing", "trimming", or "summarization"
    pub active: String,

    /// Message window for the trimming policy
    pub trimming_window_size: usize,

    /// Token budget that triggers summarization
    pub summarization_max_tokens: usize,

    /// Messages kept verbatim after the summary
    pub summarization_tail_size: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            active: "stuffing".to_string(),
            trimming_window_size: 8,
            summarization_max_tokens: 1000,
            summarization_tail_size: 6,
        }
    }
}

impl PolicyConfig {
    /// Resolve the configured selector into a policy value.
    ///
    /// # Errors
    ///
    /// `UnknownPolicy` for an unrecognized selector, `Configuration` for
    /// zero sizing values.
    pub fn to_policy(&self) -> Result<MemoryPolicy> {
        MemoryPolicy::from_name(
            &self.active,
            self.trimming_window_size,
            self.summarization_max_tokens,
            self.summarization_tail_size,
        )
    }
}

/// Session behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// System prompt opening every outgoing view
    pub system_prompt: String,

    /// Completion delegate timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Summarizer delegate timeout
    #[serde(with = "humantime_serde")]
    pub summarizer_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful AI assistant.".to_string(),
            request_timeout: Duration::from_secs(60),
            summarizer_timeout: Duration::from_secs(30),
        }
    }
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: ProviderKind,

    /// Model name (empty selects the provider default)
    #[serde(default)]
    pub model: String,

    /// API key (if needed, prefer env vars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for compatible endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Completion provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    OpenAi,
}

/// Builder for MnemeConfig
pub struct ConfigBuilder {
    config: MnemeConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: MnemeConfig::default(),
        }
    }

    /// Set store configuration
    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    /// Set policy configuration
    pub fn policy(mut self, config: PolicyConfig) -> Self {
        self.config.policy = config;
        self
    }

    /// Set session configuration
    pub fn session(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Set provider configuration
    pub fn llm(mut self, config: LLMProviderConfig) -> Self {
        self.config.llm = Some(config);
        self
    }

    /// Build the configuration
    pub fn build(self) -> MnemeConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MnemeConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (mneme.toml or path from MNEME_CONFIG_PATH)
    /// 3. Environment variable overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is invalid or the result
    /// fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            providers::{Env, Format, Toml},
            Figment,
        };

        let mut figment = Figment::new()
            .merge(Toml::file("mneme.toml"))
            .merge(Env::prefixed("MNEME_").split("_"));

        if let Ok(path) = std::env::var("MNEME_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: MnemeConfig = figment.extract().map_err(|e| {
            MnemeError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            providers::{Format, Toml},
            Figment,
        };

        let config: MnemeConfig = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                MnemeError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        // Policy selector and sizing are checked together
        self.policy.to_policy()?;

        if self.session.system_prompt.trim().is_empty() {
            return Err(MnemeError::Configuration(
                "session.system_prompt must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MnemeConfig::default();
        assert_eq!(config.policy.active, "stuffing");
        assert_eq!(config.policy.trimming_window_size, 8);
        assert_eq!(config.policy.summarization_max_tokens, 1000);
        assert_eq!(config.policy.summarization_tail_size, 6);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_default_policy_resolves() {
        let config = MnemeConfig::default();
        assert_eq!(config.policy.to_policy().unwrap(), MemoryPolicy::Stuffing);
    }

    #[test]
    fn test_policy_selector_mapping() {
        let mut policy = PolicyConfig::default();
        policy.active = "summarization".to_string();

        assert_eq!(
            policy.to_policy().unwrap(),
            MemoryPolicy::Summarization {
                max_tokens: 1000,
                tail_size: 6
            }
        );
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let mut config = MnemeConfig::default();
        config.policy.active = "episodic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = MnemeConfig::default();
        config.policy.active = "trimming".to_string();
        config.policy.trimming_window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mneme.toml");
        std::fs::write(
            &path,
            r#"
            [policy]
            active = "trimming"
            trimming_window_size = 4
            summarization_max_tokens = 500
            summarization_tail_size = 2

            [store]
            type = "memory"

            [llm]
            provider = "groq"
            model = "llama-3.1-8b-instant"
            "#,
        )
        .unwrap();

        let config = MnemeConfig::from_file(&path).unwrap();
        assert_eq!(
            config.policy.to_policy().unwrap(),
            MemoryPolicy::Trimming { window_size: 4 }
        );
        assert!(matches!(config.store, StoreConfig::Memory));
        assert_eq!(config.llm.unwrap().provider, ProviderKind::Groq);
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .store(StoreConfig::Memory)
            .policy(PolicyConfig {
                active: "trimming".to_string(),
                ..Default::default()
            })
            .build();

        assert!(matches!(config.store, StoreConfig::Memory));
        assert_eq!(config.policy.active, "trimming");
    }
}

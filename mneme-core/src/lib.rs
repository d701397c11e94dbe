//! # Mneme - Context-Window Memory for Multi-Turn Conversations
//!
//! Mneme (Μνήμη) manages the working context sent to a text-completion
//! endpoint across conversations whose full history would exceed the model's
//! usable input budget:
//!
//! - Durable, append-only conversation store (nothing said is ever lost)
//! - Interchangeable memory policies: stuffing, trimming, summarization
//! - Token accounting with an exact tokenizer and an estimation fallback
//! - Per-turn token metrics and cross-policy comparison
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mneme_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(SqliteStore::open("./data/mneme.db").await?);
//!     let llm = Arc::new(GroqProvider::from_env(None::<String>)?);
//!
//!     let session = ConversationSession::builder("my-session", store, llm)
//!         .policy(MemoryPolicy::Trimming { window_size: 8 })
//!         .build()?;
//!
//!     session.start().await?;
//!     let answer = session.ask("What is a context window?").await?;
//!     println!("{answer}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Each turn flows store → policy → accountant → delegate → store → metrics.
//! Policies are pure view builders: they decide what the model sees for one
//! call and never touch the persisted record, so the same stored
//! conversation can be replayed under any policy.

pub mod accounting;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod store;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::accounting::{CountingMode, TokenAccountant};
    pub use crate::config::{
        ConfigBuilder, LLMProviderConfig, MnemeConfig, PolicyConfig, ProviderKind, SessionConfig,
        StoreConfig,
    };
    pub use crate::conversation::{
        generate_session_id, render_transcript, ConversationSession, MemoryPolicy, Message,
        MessageRole, OutgoingView, SessionBuilder, SessionState, Summarizer,
    };
    pub use crate::error::{MnemeError, Result};
    pub use crate::llm::{
        LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse, ModelInfo, TokenUsage,
    };
    pub use crate::llm::providers::{GroqProvider, OpenAiProvider};
    pub use crate::metrics::{MetricsRecorder, PolicyTotals, TurnMetrics};
    pub use crate::store::{ConversationStore, InMemoryStore, SqliteStore};
}

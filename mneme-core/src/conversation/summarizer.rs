//! Conversation history summarizer
//!
//! Compresses an older message range into one bounded condensation via a
//! text-completion delegate. Only the summarization policy calls this; a
//! failed or empty result is reported as an error so the caller can degrade
//! to trimming instead of aborting the turn.

use std::sync::Arc;
use std::time::Duration;

use crate::conversation::{render_transcript, Message};
use crate::error::{MnemeError, Result};
use crate::llm::{LLMProvider, LLMRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Summarizer over a completion delegate
pub struct Summarizer {
    llm: Arc<dyn LLMProvider>,
    timeout: Duration,
    max_tokens: usize,
}

impl Summarizer {
    /// Create a summarizer with the default timeout.
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            llm,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: 300,
        }
    }

    /// Set the delegate timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Condense older messages into a short natural-language summary.
    ///
    /// Best-effort bound of ~200 words; the delegate is instructed, not
    /// policed. Timeouts, transport errors, and empty output all surface as
    /// `Summarization` errors.
    pub async fn summarize(&self, older: &[Message]) -> Result<String> {
        let transcript = render_transcript(older);

        let prompt = format!(
            "Provide a concise summary of this conversation history:\n\n\
             {transcript}\n\
             Focus on main topics and key information. Keep under 200 words."
        );

        let request = LLMRequest::from_prompt(prompt)
            .with_temperature(0.3)
            .with_max_tokens(self.max_tokens);

        let response = tokio::time::timeout(self.timeout, self.llm.generate_request(&request))
            .await
            .map_err(|_| MnemeError::Summarization("summarizer delegate timed out".to_string()))?
            .map_err(|e| MnemeError::Summarization(e.to_string()))?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(MnemeError::Summarization(
                "summarizer returned empty result".to_string(),
            ));
        }

        Ok(summary.to_string())
    }
}

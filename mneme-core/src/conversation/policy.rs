//! Memory policies for outgoing view construction
//!
//! A policy is a function from (full history, system prompt, budget
//! parameters) to the message view actually transmitted for one turn. The
//! store is never mutated here; anything a policy drops disappears from the
//! view only.

use serde::{Deserialize, Serialize};

use crate::accounting::TokenAccountant;
use crate::conversation::{Message, Summarizer};
use crate::error::{MnemeError, Result};

/// Memory policy, selected once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MemoryPolicy {
    /// Replay everything; monotonically growing cost, the comparison baseline
    Stuffing,
    /// Keep the last `window_size` messages (users and assistants both count)
    Trimming { window_size: usize },
    /// Condense older messages once the budget is exceeded, keep a recent tail
    Summarization { max_tokens: usize, tail_size: usize },
}

impl MemoryPolicy {
    /// Resolve a policy selector against its sizing parameters.
    ///
    /// # Errors
    ///
    /// `UnknownPolicy` for an unrecognized name; `Configuration` for zero
    /// sizing values.
    pub fn from_name(
        name: &str,
        window_size: usize,
        max_tokens: usize,
        tail_size: usize,
    ) -> Result<Self> {
        let policy = match name {
            "stuffing" => MemoryPolicy::Stuffing,
            "trimming" => MemoryPolicy::Trimming { window_size },
            "summarization" => MemoryPolicy::Summarization {
                max_tokens,
                tail_size,
            },
            other => return Err(MnemeError::UnknownPolicy(other.to_string())),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check sizing parameters are positive.
    pub fn validate(&self) -> Result<()> {
        match self {
            MemoryPolicy::Stuffing => Ok(()),
            MemoryPolicy::Trimming { window_size } if *window_size == 0 => Err(
                MnemeError::Configuration("trimming window_size must be positive".to_string()),
            ),
            MemoryPolicy::Summarization {
                max_tokens,
                tail_size,
            } if *max_tokens == 0 || *tail_size == 0 => Err(MnemeError::Configuration(
                "summarization max_tokens and tail_size must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Policy name used as the metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            MemoryPolicy::Stuffing => "stuffing",
            MemoryPolicy::Trimming { .. } => "trimming",
            MemoryPolicy::Summarization { .. } => "summarization",
        }
    }

    /// Build the outgoing view for one turn.
    ///
    /// `history` is the persisted conversation *excluding* the current user
    /// message, which is appended last so no policy ever sees its own target
    /// message in the older pool.
    ///
    /// Summarization degrades to trimming (with `window_size = tail_size`)
    /// when its delegate fails; the turn is never aborted for that.
    pub async fn build_view(
        &self,
        system_prompt: &Message,
        history: &[Message],
        current: &Message,
        accountant: &TokenAccountant,
        summarizer: Option<&Summarizer>,
    ) -> OutgoingView {
        match self {
            MemoryPolicy::Stuffing => OutgoingView::plain(stuffing(system_prompt, history, current)),

            MemoryPolicy::Trimming { window_size } => {
                OutgoingView::plain(trimming(system_prompt, history, current, *window_size))
            }

            MemoryPolicy::Summarization {
                max_tokens,
                tail_size,
            } => {
                summarization(
                    system_prompt,
                    history,
                    current,
                    *max_tokens,
                    *tail_size,
                    accountant,
                    summarizer,
                )
                .await
            }
        }
    }
}

/// The exact ordered message set transmitted for one turn. Ephemeral; never
/// persisted.
#[derive(Debug, Clone)]
pub struct OutgoingView {
    /// Ordered messages: one system message first, prior context, current
    /// user message last
    pub messages: Vec<Message>,

    /// Whether a synthetic summary was inserted
    pub summarized: bool,

    /// Whether the summarizer failed and the view fell back to trimming
    pub degraded: bool,
}

impl OutgoingView {
    fn plain(messages: Vec<Message>) -> Self {
        Self {
            messages,
            summarized: false,
            degraded: false,
        }
    }
}

fn stuffing(system_prompt: &Message, history: &[Message], current: &Message) -> Vec<Message> {
    let mut view = Vec::with_capacity(history.len() + 2);
    view.push(system_prompt.clone());
    view.extend_from_slice(history);
    view.push(current.clone());
    view
}

fn trimming(
    system_prompt: &Message,
    history: &[Message],
    current: &Message,
    window_size: usize,
) -> Vec<Message> {
    let start = history.len().saturating_sub(window_size);
    stuffing(system_prompt, &history[start..], current)
}

async fn summarization(
    system_prompt: &Message,
    history: &[Message],
    current: &Message,
    max_tokens: usize,
    tail_size: usize,
    accountant: &TokenAccountant,
    summarizer: Option<&Summarizer>,
) -> OutgoingView {
    // Budget check against the full candidate before deciding to compact
    let mut candidate = Vec::with_capacity(history.len() + 1);
    candidate.push(system_prompt.clone());
    candidate.extend_from_slice(history);

    if accountant.count_view(&candidate) <= max_tokens {
        candidate.push(current.clone());
        return OutgoingView::plain(candidate);
    }

    if history.len() <= tail_size {
        // Over budget but nothing older than the tail to fold
        return OutgoingView::plain(stuffing(system_prompt, history, current));
    }

    let split = history.len() - tail_size;
    let (older, recent) = history.split_at(split);

    let fallback = |reason: String| {
        tracing::warn!(reason = %reason, "summarization failed, falling back to trimming");
        OutgoingView {
            messages: trimming(system_prompt, history, current, tail_size),
            summarized: false,
            degraded: true,
        }
    };

    let Some(summarizer) = summarizer else {
        return fallback("no summarizer delegate configured".to_string());
    };

    match summarizer.summarize(older).await {
        Ok(summary) => {
            let mut view = Vec::with_capacity(recent.len() + 3);
            view.push(system_prompt.clone());
            view.push(Message::synthetic_summary(format!(
                "Summary of earlier conversation: {summary}"
            )));
            view.extend_from_slice(recent);
            view.push(current.clone());

            tracing::debug!(
                folded = older.len(),
                kept = recent.len(),
                "inserted synthetic summary"
            );

            OutgoingView {
                messages: view,
                summarized: true,
                degraded: false,
            }
        }
        Err(err) => fallback(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageRole;
    use crate::error::Result;
    use crate::llm::{LLMProvider, LLMRequest, LLMResponse};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        async fn generate_request(&self, _request: &LLMRequest) -> Result<LLMResponse> {
            Ok(LLMResponse {
                content: self.0.to_string(),
                usage: None,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn generate_request(&self, _request: &LLMRequest) -> Result<LLMResponse> {
            Err(MnemeError::GenerationFailed("boom".to_string()))
        }
    }

    fn prior_turns(n: usize) -> Vec<Message> {
        let mut history = Vec::new();
        for i in 0..n {
            history.push(Message::user(format!("Question {i}")));
            history.push(Message::assistant(format!("Answer {i}")));
        }
        history
    }

    fn parts() -> (Message, Message) {
        (
            Message::system("You are a helpful assistant."),
            Message::user("What happens next?"),
        )
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        let err = MemoryPolicy::from_name("vector_rag", 8, 1000, 6).unwrap_err();
        assert!(matches!(err, MnemeError::UnknownPolicy(_)));
    }

    #[test]
    fn test_from_name_rejects_zero_sizes() {
        assert!(MemoryPolicy::from_name("trimming", 0, 1000, 6).is_err());
        assert!(MemoryPolicy::from_name("summarization", 8, 0, 6).is_err());
        assert!(MemoryPolicy::from_name("summarization", 8, 1000, 0).is_err());
        assert!(MemoryPolicy::from_name("stuffing", 0, 0, 0).is_ok());
    }

    #[tokio::test]
    async fn test_stuffing_keeps_everything() {
        let (system, current) = parts();
        let history = prior_turns(3);
        let accountant = TokenAccountant::estimated();

        let view = MemoryPolicy::Stuffing
            .build_view(&system, &history, &current, &accountant, None)
            .await;

        assert_eq!(view.messages.len(), 8);
        assert_eq!(view.messages[0].role, MessageRole::System);
        assert_eq!(view.messages.last().unwrap().content, current.content);
        assert!(!view.summarized && !view.degraded);
    }

    #[tokio::test]
    async fn test_trimming_below_threshold_equals_stuffing() {
        let (system, current) = parts();
        let history = prior_turns(3); // 6 messages
        let accountant = TokenAccountant::estimated();

        let trimmed = MemoryPolicy::Trimming { window_size: 8 }
            .build_view(&system, &history, &current, &accountant, None)
            .await;
        let stuffed = MemoryPolicy::Stuffing
            .build_view(&system, &history, &current, &accountant, None)
            .await;

        let contents =
            |v: &OutgoingView| v.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>();
        assert_eq!(contents(&trimmed), contents(&stuffed));
    }

    #[tokio::test]
    async fn test_trimming_window_scenario() {
        // 10 prior turn pairs, window 8: the 11th-turn view is system + last
        // 8 of the 20 prior messages + current question.
        let (system, current) = parts();
        let history = prior_turns(10);
        let accountant = TokenAccountant::estimated();

        let view = MemoryPolicy::Trimming { window_size: 8 }
            .build_view(&system, &history, &current, &accountant, None)
            .await;

        assert_eq!(view.messages.len(), 10);
        assert_eq!(view.messages[0].role, MessageRole::System);
        assert_eq!(view.messages[1].content, "Question 6");
        assert_eq!(view.messages[8].content, "Answer 9");
        assert_eq!(view.messages[9].content, current.content);
    }

    #[tokio::test]
    async fn test_summarization_under_budget_is_stuffing() {
        let (system, current) = parts();
        let history = prior_turns(2);
        let accountant = TokenAccountant::estimated();
        let summarizer = Summarizer::new(Arc::new(FixedProvider("should not be called")));

        let view = MemoryPolicy::Summarization {
            max_tokens: 100_000,
            tail_size: 6,
        }
        .build_view(&system, &history, &current, &accountant, Some(&summarizer))
        .await;

        assert!(!view.summarized);
        assert_eq!(view.messages.len(), 6);
    }

    #[tokio::test]
    async fn test_summarization_folds_older_messages() {
        // 7 prior turn pairs = 14 messages, tail of 6, budget of 1 token:
        // view = system + summary + last 6 + current question.
        let (system, current) = parts();
        let history = prior_turns(7);
        let accountant = TokenAccountant::estimated();
        let summarizer = Summarizer::new(Arc::new(FixedProvider("They warmed up.")));

        let view = MemoryPolicy::Summarization {
            max_tokens: 1,
            tail_size: 6,
        }
        .build_view(&system, &history, &current, &accountant, Some(&summarizer))
        .await;

        assert!(view.summarized);
        assert_eq!(view.messages.len(), 9);
        assert_eq!(view.messages[0].role, MessageRole::System);
        assert_eq!(view.messages[1].role, MessageRole::SyntheticSummary);
        assert!(view.messages[1]
            .content
            .starts_with("Summary of earlier conversation:"));
        assert_eq!(view.messages[2].content, "Question 4");
        assert_eq!(view.messages[7].content, "Answer 6");
        assert_eq!(view.messages[8].content, current.content);
    }

    #[tokio::test]
    async fn test_summarization_short_history_not_summarized() {
        let (system, current) = parts();
        let history = prior_turns(2); // 4 messages <= tail 6
        let accountant = TokenAccountant::estimated();
        let summarizer = Summarizer::new(Arc::new(FixedProvider("unused")));

        let view = MemoryPolicy::Summarization {
            max_tokens: 1,
            tail_size: 6,
        }
        .build_view(&system, &history, &current, &accountant, Some(&summarizer))
        .await;

        assert!(!view.summarized);
        assert_eq!(view.messages.len(), 6);
    }

    #[tokio::test]
    async fn test_summarizer_failure_degrades_to_trimming() {
        let (system, current) = parts();
        let history = prior_turns(7);
        let accountant = TokenAccountant::estimated();
        let summarizer = Summarizer::new(Arc::new(FailingProvider));

        let policy = MemoryPolicy::Summarization {
            max_tokens: 1,
            tail_size: 6,
        };
        let view = policy
            .build_view(&system, &history, &current, &accountant, Some(&summarizer))
            .await;

        assert!(view.degraded);
        assert!(!view.summarized);

        let trimmed = MemoryPolicy::Trimming { window_size: 6 }
            .build_view(&system, &history, &current, &accountant, None)
            .await;

        let contents =
            |v: &OutgoingView| v.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>();
        assert_eq!(contents(&view), contents(&trimmed));
    }

    #[tokio::test]
    async fn test_empty_history_any_policy() {
        let (system, current) = parts();
        let accountant = TokenAccountant::estimated();
        let summarizer = Summarizer::new(Arc::new(FixedProvider("unused")));

        for policy in [
            MemoryPolicy::Stuffing,
            MemoryPolicy::Trimming { window_size: 8 },
            MemoryPolicy::Summarization {
                max_tokens: 1000,
                tail_size: 6,
            },
        ] {
            let view = policy
                .build_view(&system, &[], &current, &accountant, Some(&summarizer))
                .await;
            assert_eq!(view.messages.len(), 2, "policy {}", policy.name());
            assert_eq!(view.messages[0].role, MessageRole::System);
            assert_eq!(view.messages[1].role, MessageRole::User);
        }
    }
}

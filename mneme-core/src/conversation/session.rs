//! Conversation session orchestration
//!
//! One session drives one stored conversation through turns: append the user
//! message, let the active policy shape the outgoing view, call the
//! completion delegate, append the response, record token metrics. Turns
//! within a session are strictly sequential; the turn state lives behind a
//! mutex so concurrent `ask` calls on a shared session serialize instead of
//! interleaving.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::accounting::TokenAccountant;
use crate::conversation::{Message, MessageRole, MemoryPolicy, OutgoingView, Summarizer};
use crate::error::{MnemeError, Result};
use crate::llm::{LLMProvider, LLMRequest};
use crate::metrics::{MetricsRecorder, TurnMetrics};
use crate::store::ConversationStore;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Session turn state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Ready for the next turn
    Idle,
    /// A delegate call is in flight
    AwaitingResponse,
    /// Session has been closed; the store entry remains
    Closed,
}

#[derive(Debug)]
struct TurnState {
    state: SessionState,
    started: bool,
    turn_index: usize,
}

/// Generate a timestamped session id for unnamed sessions.
pub fn generate_session_id() -> String {
    format!("chat_{}", Utc::now().format("%Y%m%d_%H%M%S"))
}

/// A conversation session bound to one store entry, one policy, and one
/// completion delegate
pub struct ConversationSession {
    id: String,
    system_prompt: Message,
    policy: MemoryPolicy,
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LLMProvider>,
    summarizer: Option<Summarizer>,
    accountant: TokenAccountant,
    metrics: Arc<MetricsRecorder>,
    request_timeout: Duration,
    turn: Mutex<TurnState>,
}

/// Builder for [`ConversationSession`]
pub struct SessionBuilder {
    id: String,
    system_prompt: String,
    policy: MemoryPolicy,
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LLMProvider>,
    summarizer_llm: Option<Arc<dyn LLMProvider>>,
    accountant: Option<TokenAccountant>,
    metrics: Option<Arc<MetricsRecorder>>,
    request_timeout: Duration,
    summarizer_timeout: Option<Duration>,
}

impl SessionBuilder {
    /// Select the memory policy (default: stuffing).
    pub fn policy(mut self, policy: MemoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Use a dedicated delegate for summarization calls. Defaults to the
    /// session's own delegate.
    pub fn summarizer_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.summarizer_llm = Some(llm);
        self
    }

    /// Provide the token accountant (default: exact with estimation
    /// fallback).
    pub fn accountant(mut self, accountant: TokenAccountant) -> Self {
        self.accountant = Some(accountant);
        self
    }

    /// Share a metrics recorder across sessions.
    pub fn metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Timeout for the completion delegate call.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Timeout for summarizer delegate calls.
    pub fn summarizer_timeout(mut self, timeout: Duration) -> Self {
        self.summarizer_timeout = Some(timeout);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Fails with `UnknownPolicy`/`Configuration` when the policy parameters
    /// are invalid; this is the construction-time check, `ask` never
    /// re-validates.
    pub fn build(self) -> Result<ConversationSession> {
        self.policy.validate()?;

        let summarizer = match self.policy {
            MemoryPolicy::Summarization { .. } => {
                let delegate = self.summarizer_llm.unwrap_or_else(|| Arc::clone(&self.llm));
                let mut summarizer = Summarizer::new(delegate);
                if let Some(timeout) = self.summarizer_timeout {
                    summarizer = summarizer.with_timeout(timeout);
                }
                Some(summarizer)
            }
            _ => None,
        };

        Ok(ConversationSession {
            id: self.id,
            system_prompt: Message::system(self.system_prompt),
            policy: self.policy,
            store: self.store,
            llm: self.llm,
            summarizer,
            accountant: self.accountant.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
            request_timeout: self.request_timeout,
            turn: Mutex::new(TurnState {
                state: SessionState::Idle,
                started: false,
                turn_index: 0,
            }),
        })
    }
}

impl ConversationSession {
    /// Start building a session.
    pub fn builder(
        id: impl Into<String>,
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn LLMProvider>,
    ) -> SessionBuilder {
        SessionBuilder {
            id: id.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            policy: MemoryPolicy::Stuffing,
            store,
            llm,
            summarizer_llm: None,
            accountant: None,
            metrics: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            summarizer_timeout: None,
        }
    }

    /// Start (or resume) the session. Returns the number of messages already
    /// stored under this id.
    pub async fn start(&self) -> Result<usize> {
        let history = self.store.full_history(&self.id).await?;

        let mut turn = self.turn.lock().await;
        if turn.state == SessionState::Closed {
            return Err(MnemeError::NoActiveSession);
        }

        turn.started = true;
        turn.turn_index = history
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();

        if history.is_empty() {
            tracing::info!(session = %self.id, "started new session");
        } else {
            tracing::info!(
                session = %self.id,
                messages = history.len(),
                "resumed existing session"
            );
        }

        Ok(history.len())
    }

    /// Run one turn: persist the user message, build the policy view, call
    /// the delegate, persist and return the response.
    ///
    /// On delegate failure the user message stays persisted and no assistant
    /// message is appended, so retrying the turn does not duplicate it.
    pub async fn ask(&self, user_input: &str) -> Result<String> {
        let mut turn = self.turn.lock().await;

        if !turn.started || turn.state != SessionState::Idle {
            return Err(MnemeError::NoActiveSession);
        }

        // Durable first; the turn may fail after this point and retry safely.
        let current = self
            .store
            .append(&self.id, MessageRole::User, user_input)
            .await?;

        let full = self.store.full_history(&self.id).await?;
        // The just-appended user message is never part of the older pool.
        let history = &full[..full.len().saturating_sub(1)];

        let view = self
            .policy
            .build_view(
                &self.system_prompt,
                history,
                &current,
                &self.accountant,
                self.summarizer.as_ref(),
            )
            .await;

        let prompt_tokens = self.accountant.count_view(&view.messages);
        tracing::debug!(
            session = %self.id,
            policy = self.policy.name(),
            turn = turn.turn_index,
            prompt_tokens,
            view_len = view.messages.len(),
            degraded = view.degraded,
            "built outgoing view"
        );

        turn.state = SessionState::AwaitingResponse;

        let request = LLMRequest::from_view(&view.messages);
        let outcome =
            tokio::time::timeout(self.request_timeout, self.llm.generate_request(&request)).await;

        let response = match outcome {
            Err(_) => {
                turn.state = SessionState::Idle;
                return Err(MnemeError::GenerationFailed(
                    "completion delegate timed out".to_string(),
                ));
            }
            Ok(Err(err)) => {
                turn.state = SessionState::Idle;
                return Err(MnemeError::GenerationFailed(err.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        if let Err(err) = self
            .store
            .append(&self.id, MessageRole::Assistant, &response.content)
            .await
        {
            turn.state = SessionState::Idle;
            return Err(err);
        }

        let response_tokens = self.accountant.count(&response.content);
        self.metrics
            .record(
                &self.id,
                self.policy.name(),
                TurnMetrics {
                    turn_index: turn.turn_index,
                    prompt_tokens,
                    response_tokens,
                    counting_mode: self.accountant.mode(),
                },
            )
            .await;

        turn.turn_index += 1;
        turn.state = SessionState::Idle;

        Ok(response.content)
    }

    /// Build the view a turn with this question would transmit, without
    /// persisting anything or calling the delegate. For inspection and
    /// replaying a stored conversation under another policy.
    pub async fn preview(&self, user_input: &str) -> Result<OutgoingView> {
        let history = self.store.full_history(&self.id).await?;
        let current = Message::user(user_input);

        Ok(self
            .policy
            .build_view(
                &self.system_prompt,
                &history,
                &current,
                &self.accountant,
                self.summarizer.as_ref(),
            )
            .await)
    }

    /// Close the session. The stored conversation remains.
    pub async fn close(&self) {
        let mut turn = self.turn.lock().await;
        turn.state = SessionState::Closed;
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Active policy.
    pub fn policy(&self) -> MemoryPolicy {
        self.policy
    }

    /// Current turn state.
    pub async fn state(&self) -> SessionState {
        self.turn.lock().await.state
    }

    /// Completed turn count.
    pub async fn turn_count(&self) -> usize {
        self.turn.lock().await.turn_index
    }

    /// Shared metrics recorder.
    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    /// Full stored history for this session.
    pub async fn history(&self) -> Result<Vec<Message>> {
        self.store.full_history(&self.id).await
    }
}

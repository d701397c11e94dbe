//! Message model for persisted conversations and outgoing views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Generated condensation of an older message range. Never produced by
    /// the model or the user; only the summarization policy emits these.
    SyntheticSummary,
}

impl MessageRole {
    /// Role string as transmitted to the completion endpoint. Synthetic
    /// summaries travel as system messages.
    pub fn wire_role(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::SyntheticSummary => "system",
        }
    }

    /// Human-readable label for transcript rendering.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::System => "System",
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::SyntheticSummary => "Summary",
        }
    }

    /// Parse a stored role tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "system" => Some(MessageRole::System),
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            "synthetic_summary" => Some(MessageRole::SyntheticSummary),
            _ => None,
        }
    }

    /// Stored role tag (inverse of [`MessageRole::parse`]).
    pub fn tag(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::SyntheticSummary => "synthetic_summary",
        }
    }
}

/// A single conversation message. Immutable once created.
///
/// Persisted messages carry the sequence number the store assigned; messages
/// built only for an outgoing view (system prompt, synthetic summary, the
/// current question before it is appended) carry sequence 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create an ephemeral message (sequence assigned by the store on append).
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn synthetic_summary(content: impl Into<String>) -> Self {
        Self::new(MessageRole::SyntheticSummary, content)
    }

    /// Rebuild a message from its stored fields.
    pub fn from_stored(
        role: MessageRole,
        content: String,
        sequence: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            role,
            content,
            sequence,
            created_at,
        }
    }
}

/// Render messages as a flat transcript, one `Label: content` block per
/// message. Used as summarizer input and for final-prompt inspection.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(message.role.label());
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_role_mapping() {
        assert_eq!(MessageRole::System.wire_role(), "system");
        assert_eq!(MessageRole::User.wire_role(), "user");
        assert_eq!(MessageRole::Assistant.wire_role(), "assistant");
        assert_eq!(MessageRole::SyntheticSummary.wire_role(), "system");
    }

    #[test]
    fn test_role_tag_roundtrip() {
        for role in [
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::SyntheticSummary,
        ] {
            assert_eq!(MessageRole::parse(role.tag()), Some(role));
        }
        assert_eq!(MessageRole::parse("tool"), None);
    }

    #[test]
    fn test_ephemeral_message_has_no_sequence() {
        let msg = Message::user("Hello");
        assert_eq!(msg.sequence, 0);
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_render_transcript() {
        let messages = vec![
            Message::user("What is Rust?"),
            Message::assistant("A systems language."),
        ];

        let transcript = render_transcript(&messages);
        assert_eq!(
            transcript,
            "User: What is Rust?\nAssistant: A systems language.\n"
        );
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::synthetic_summary("Earlier we discussed Rust.");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("synthetic_summary"));

        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.role, MessageRole::SyntheticSummary);
    }
}

//! In-memory store for testing and throwaway sessions

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::ConversationStore;
use crate::conversation::{Message, MessageRole};
use crate::error::Result;

/// In-memory conversation store
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Total message count across all sessions
    pub fn message_count(&self) -> usize {
        let sessions = self.sessions.read().unwrap();
        sessions.values().map(|m| m.len()).sum()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, session_id: &str, role: MessageRole, content: &str) -> Result<Message> {
        let mut sessions = self.sessions.write().unwrap();
        let history = sessions.entry(session_id.to_string()).or_default();

        let message = Message::from_stored(
            role,
            content.to_string(),
            history.len() as u64 + 1,
            Utc::now(),
        );
        history.push(message.clone());

        Ok(message)
    }

    async fn full_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().unwrap();
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_assigns_sequence() {
        let store = InMemoryStore::new();

        let first = store
            .append("s1", MessageRole::User, "Hello")
            .await
            .unwrap();
        let second = store
            .append("s1", MessageRole::Assistant, "Hi!")
            .await
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemoryStore::new();
        let history = store.full_history("nope").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_sequences_independent_per_session() {
        let store = InMemoryStore::new();

        store.append("a", MessageRole::User, "one").await.unwrap();
        let b = store.append("b", MessageRole::User, "one").await.unwrap();

        assert_eq!(b.sequence, 1);
    }

    #[tokio::test]
    async fn test_list_sessions_sorted() {
        let store = InMemoryStore::new();

        store.append("beta", MessageRole::User, "x").await.unwrap();
        store.append("alpha", MessageRole::User, "y").await.unwrap();

        assert_eq!(store.list_sessions().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_history_preserves_order() {
        let store = InMemoryStore::new();

        for i in 0..5 {
            store
                .append("s", MessageRole::User, &format!("msg {i}"))
                .await
                .unwrap();
        }

        let history = store.full_history("s").await.unwrap();
        assert_eq!(history.len(), 5);
        for (i, msg) in history.iter().enumerate() {
            assert_eq!(msg.sequence, i as u64 + 1);
            assert_eq!(msg.content, format!("msg {i}"));
        }
    }
}

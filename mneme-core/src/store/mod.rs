//! Durable conversation history
//!
//! The store is the append-only record of everything said in a session.
//! Memory policies only ever read snapshots of it; discarding happens in the
//! outgoing view they build, never here. Backends implement the
//! [`ConversationStore`] trait:
//!
//! - [`InMemoryStore`] for tests and throwaway runs
//! - [`SqliteStore`] for durable, per-session history

use async_trait::async_trait;

use crate::conversation::{Message, MessageRole};
use crate::error::Result;

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Append-only, queryable-by-session conversation record.
///
/// Implementations must be safe for concurrent access across distinct
/// session ids; within one session, callers serialize turns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a message, assigning the next sequence number for the session.
    ///
    /// The write is durable before this returns. Fails with
    /// `StoreUnavailable` if the backing medium cannot be written.
    async fn append(&self, session_id: &str, role: MessageRole, content: &str) -> Result<Message>;

    /// Full ordered history for a session. An unknown id yields an empty
    /// history (a new session), not an error.
    async fn full_history(&self, session_id: &str) -> Result<Vec<Message>>;

    /// All known session ids.
    async fn list_sessions(&self) -> Result<Vec<String>>;
}

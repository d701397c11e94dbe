//! SQLite-backed conversation store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::ConversationStore;
use crate::conversation::{Message, MessageRole};
use crate::error::{MnemeError, Result};

/// Durable conversation store over a single SQLite database file.
///
/// Connections are opened per operation on the blocking pool, so the store
/// is safe to share across sessions with distinct ids.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (and initialize) a store at the given path. Parent directories
    /// are created as needed.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };

        store
            .with_connection(|connection| {
                connection
                    .execute_batch(
                        r#"
                        CREATE TABLE IF NOT EXISTS messages (
                            session_id TEXT NOT NULL,
                            sequence INTEGER NOT NULL,
                            role TEXT NOT NULL,
                            content TEXT NOT NULL,
                            created_at TEXT NOT NULL,
                            PRIMARY KEY (session_id, sequence)
                        );
                        CREATE INDEX IF NOT EXISTS idx_messages_session
                            ON messages (session_id);
                        "#,
                    )
                    .map_err(store_err)
            })
            .await?;

        Ok(store)
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn with_connection<T, F>(&self, func: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = open_connection(&db_path)?;
            func(&mut connection)
        })
        .await
        .map_err(|error| MnemeError::StoreUnavailable(error.to_string()))?
    }
}

fn open_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MnemeError::StoreUnavailable(e.to_string()))?;
        }
    }

    let connection = Connection::open(db_path).map_err(store_err)?;
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .map_err(store_err)?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .map_err(store_err)?;
    Ok(connection)
}

fn store_err(error: rusqlite::Error) -> MnemeError {
    MnemeError::StoreUnavailable(error.to_string())
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(&self, session_id: &str, role: MessageRole, content: &str) -> Result<Message> {
        let session_id = session_id.to_string();
        let content = content.to_string();
        let created_at = Utc::now();

        self.with_connection(move |connection| {
            let tx = connection.transaction().map_err(store_err)?;

            let sequence: u64 = tx
                .query_row(
                    "SELECT COALESCE(MAX(sequence), 0) + 1 FROM messages WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .map_err(store_err)?;

            tx.execute(
                "INSERT INTO messages (session_id, sequence, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, sequence, role.tag(), content, created_at],
            )
            .map_err(store_err)?;

            tx.commit().map_err(store_err)?;

            Ok(Message::from_stored(role, content, sequence, created_at))
        })
        .await
    }

    async fn full_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let session_id = session_id.to_string();

        self.with_connection(move |connection| {
            let mut stmt = connection
                .prepare(
                    "SELECT role, content, sequence, created_at FROM messages
                     WHERE session_id = ?1 ORDER BY sequence",
                )
                .map_err(store_err)?;

            let rows = stmt
                .query_map(params![session_id], |row| {
                    let role_tag: String = row.get(0)?;
                    let content: String = row.get(1)?;
                    let sequence: u64 = row.get(2)?;
                    let created_at: DateTime<Utc> = row.get(3)?;
                    Ok((role_tag, content, sequence, created_at))
                })
                .map_err(store_err)?;

            let mut messages = Vec::new();
            for row in rows {
                let (role_tag, content, sequence, created_at) = row.map_err(store_err)?;
                let role = MessageRole::parse(&role_tag).ok_or_else(|| {
                    MnemeError::StoreUnavailable(format!("unknown role tag in store: {role_tag}"))
                })?;
                messages.push(Message::from_stored(role, content, sequence, created_at));
            }

            Ok(messages)
        })
        .await
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        self.with_connection(|connection| {
            let mut stmt = connection
                .prepare("SELECT DISTINCT session_id FROM messages ORDER BY session_id")
                .map_err(store_err)?;

            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(store_err)?;

            let mut ids = Vec::new();
            for row in rows {
                ids.push(row.map_err(store_err)?);
            }
            Ok(ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_test_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteStore::open(dir.path().join("history.db"))
            .await
            .expect("Failed to open store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let (_dir, store) = open_test_store().await;

        store
            .append("s1", MessageRole::User, "Hello")
            .await
            .unwrap();
        store
            .append("s1", MessageRole::Assistant, "Hi there!")
            .await
            .unwrap();

        let history = store.full_history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 1);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].sequence, 2);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .append("persistent", MessageRole::User, "remember me")
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        let history = store.full_history("persistent").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "remember me");
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty_not_error() {
        let (_dir, store) = open_test_store().await;
        let history = store.full_history("never-seen").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_list_sessions() {
        let (_dir, store) = open_test_store().await;

        store.append("b", MessageRole::User, "x").await.unwrap();
        store.append("a", MessageRole::User, "y").await.unwrap();
        store.append("a", MessageRole::Assistant, "z").await.unwrap();

        assert_eq!(store.list_sessions().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_role_tags_roundtrip_through_store() {
        let (_dir, store) = open_test_store().await;

        for role in [
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::SyntheticSummary,
        ] {
            store.append("roles", role, "content").await.unwrap();
        }

        let history = store.full_history("roles").await.unwrap();
        assert_eq!(history[3].role, MessageRole::SyntheticSummary);
    }
}

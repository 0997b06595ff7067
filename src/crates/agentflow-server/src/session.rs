//! Session & History (spec §4.11): a per-caller, append-only conversation
//! log with a bounded recall window, stored separately from workflow state
//! so multiple workflows may share one session.

use crate::db::connection::DatabasePool;
use crate::db::repositories::SessionRepository;
use crate::{OrchestratorError, Result};
use agentflow_core::messages::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of most-recent messages fed into a new workflow's
/// initial state.
pub const DEFAULT_RECALL_WINDOW: usize = 10;

/// On-wire shape stored in the `sessions.messages` JSON column. Plain
/// `{role, content}` pairs rather than the full `Message` type, since tool
/// calls are not meaningful once a turn has completed and been recalled.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    role: String,
    content: String,
}

impl From<&Message> for StoredMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: role_to_str(m.role).to_string(),
            content: m.text().unwrap_or_default().to_string(),
        }
    }
}

fn role_to_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::Human => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

fn stored_to_message(stored: &StoredMessage) -> Message {
    match stored.role.as_str() {
        "system" => Message::system(stored.content.clone()),
        "assistant" => Message::ai(stored.content.clone()),
        "tool" => Message::tool(stored.content.clone(), String::new()),
        _ => Message::human(stored.content.clone()),
    }
}

/// Allocates session ids for callers that don't supply their own and applies
/// the bounded-recall window on read/write.
pub struct SessionManager {
    pool: DatabasePool,
    recall_window: usize,
}

impl SessionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            recall_window: DEFAULT_RECALL_WINDOW,
        }
    }

    pub fn with_recall_window(mut self, window: usize) -> Self {
        self.recall_window = window;
        self
    }

    /// Allocate a fresh session id; used when the caller supplies none.
    pub fn allocate_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Load the session's recalled messages (already trimmed to the window
    /// at write time, so no further trimming needed here).
    pub async fn recall(&self, session_id: &str) -> Result<Vec<Message>> {
        let session = SessionRepository::get_or_create(&self.pool, session_id).await?;
        let stored: Vec<StoredMessage> = serde_json::from_str(&session.messages)
            .map_err(|e| OrchestratorError::General(format!("corrupt session history: {e}")))?;
        Ok(stored.iter().map(stored_to_message).collect())
    }

    /// Append `new_messages` to the session's history, trimming to the
    /// recall window afterward, and persist.
    pub async fn append(&self, session_id: &str, new_messages: &[Message]) -> Result<()> {
        let session = SessionRepository::get_or_create(&self.pool, session_id).await?;
        let mut stored: Vec<StoredMessage> = serde_json::from_str(&session.messages)
            .map_err(|e| OrchestratorError::General(format!("corrupt session history: {e}")))?;

        stored.extend(new_messages.iter().map(StoredMessage::from));

        if stored.len() > self.recall_window {
            let drop = stored.len() - self.recall_window;
            stored.drain(0..drop);
        }

        let json = serde_json::to_string(&stored)?;
        SessionRepository::save_messages(&self.pool, session_id, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;

    async fn setup() -> DatabasePool {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        let pool = conn.pool().clone();
        sqlx::query(
            "CREATE TABLE sessions (
                session_id TEXT PRIMARY KEY NOT NULL,
                messages TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn recall_on_fresh_session_is_empty() {
        let pool = setup().await;
        let mgr = SessionManager::new(pool);
        let messages = mgr.recall("sess-1").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn append_then_recall_round_trips() {
        let pool = setup().await;
        let mgr = SessionManager::new(pool);
        mgr.append("sess-1", &[Message::human("hello")]).await.unwrap();
        mgr.append("sess-1", &[Message::ai("hi there")]).await.unwrap();

        let recalled = mgr.recall("sess-1").await.unwrap();
        assert_eq!(recalled.len(), 2);
        assert_eq!(recalled[0].text().unwrap(), "hello");
        assert_eq!(recalled[1].text().unwrap(), "hi there");
    }

    #[tokio::test]
    async fn recall_window_bounds_history() {
        let pool = setup().await;
        let mgr = SessionManager::new(pool).with_recall_window(3);
        for i in 0..5 {
            mgr.append("sess-1", &[Message::human(format!("msg {i}"))])
                .await
                .unwrap();
        }
        let recalled = mgr.recall("sess-1").await.unwrap();
        assert_eq!(recalled.len(), 3);
        assert_eq!(recalled[0].text().unwrap(), "msg 2");
        assert_eq!(recalled[2].text().unwrap(), "msg 4");
    }
}

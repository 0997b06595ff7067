//! Session repository — append-only conversation log storage (spec §4.11).
//!
//! A session's `messages` column holds the full JSON-serialized bounded
//! recall window; callers read-modify-write it rather than appending rows,
//! since the trimming policy (last N messages) lives above this layer in
//! the session module.

use crate::db::connection::DatabasePool;
use crate::db::models::Session;
use crate::{OrchestratorError, Result};
use chrono::Utc;

/// Session repository for managing conversation session persistence.
pub struct SessionRepository;

impl SessionRepository {
    /// Fetch a session by id, if it exists.
    pub async fn get(pool: &DatabasePool, session_id: &str) -> Result<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// Fetch a session by id, creating an empty one if it doesn't exist yet.
    pub async fn get_or_create(pool: &DatabasePool, session_id: &str) -> Result<Session> {
        if let Some(session) = Self::get(pool, session_id).await? {
            return Ok(session);
        }
        let session = Session::new(session_id);
        sqlx::query(
            "INSERT INTO sessions (session_id, messages, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&session.messages)
        .bind(&session.updated_at)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(session)
    }

    /// Replace `messages` (already trimmed to the recall window by the
    /// caller) and bump `updated_at`.
    pub async fn save_messages(
        pool: &DatabasePool,
        session_id: &str,
        messages_json: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = sqlx::query(
            "UPDATE sessions SET messages = ?, updated_at = ? WHERE session_id = ?",
        )
        .bind(messages_json)
        .bind(&now)
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                "INSERT INTO sessions (session_id, messages, updated_at) VALUES (?, ?, ?)",
            )
            .bind(session_id)
            .bind(messages_json)
            .bind(&now)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))?;
        }
        Ok(())
    }

    /// Delete a session's history entirely.
    pub async fn delete(pool: &DatabasePool, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(())
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
    async fn get_or_create_is_idempotent() {
        let pool = setup().await;
        let first = SessionRepository::get_or_create(&pool, "sess-1").await.unwrap();
        assert_eq!(first.messages, "[]");

        SessionRepository::save_messages(&pool, "sess-1", "[{\"role\":\"user\"}]")
            .await
            .unwrap();

        let second = SessionRepository::get_or_create(&pool, "sess-1").await.unwrap();
        assert_eq!(second.messages, "[{\"role\":\"user\"}]");
    }

    #[tokio::test]
    async fn save_messages_creates_row_if_missing() {
        let pool = setup().await;
        SessionRepository::save_messages(&pool, "sess-2", "[]").await.unwrap();
        let session = SessionRepository::get(&pool, "sess-2").await.unwrap();
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let pool = setup().await;
        SessionRepository::get_or_create(&pool, "sess-3").await.unwrap();
        SessionRepository::delete(&pool, "sess-3").await.unwrap();
        assert!(SessionRepository::get(&pool, "sess-3").await.unwrap().is_none());
    }
}

//! Checkpoint repository — the Checkpoint Store's SQL-backed implementation.
//!
//! Implements the contract from spec §4.1: `save`, `load_latest`,
//! `list_versions`, `load_at`. `save` is optimistic on `version`: the caller
//! passes the version it believes is current, and a concurrent winner causes
//! the loser's insert to violate the `(thread_id, version)` primary key,
//! which is surfaced as [`crate::OrchestratorError::PersistenceConflict`].

use crate::db::connection::DatabasePool;
use crate::db::models::Checkpoint;
use crate::{OrchestratorError, Result};

/// Checkpoint repository for managing workflow checkpoint persistence.
pub struct CheckpointRepository;

impl CheckpointRepository {
    /// Persist a new checkpoint at `expected_version + 1` for `thread_id`.
    ///
    /// Returns the new version on success, or `PersistenceConflict` if
    /// another writer already committed that version first.
    pub async fn save(
        pool: &DatabasePool,
        thread_id: &str,
        expected_version: i64,
        snapshot: &str,
    ) -> Result<i64> {
        let new_version = expected_version + 1;
        let row = Checkpoint::new(thread_id.to_string(), new_version, snapshot.to_string());

        let result = sqlx::query(
            "INSERT INTO checkpoints (thread_id, version, snapshot, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&row.thread_id)
        .bind(row.version)
        .bind(&row.snapshot)
        .bind(&row.created_at)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(new_version),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(OrchestratorError::PersistenceConflict {
                    thread_id: thread_id.to_string(),
                })
            }
            Err(e) => Err(OrchestratorError::General(e.to_string())),
        }
    }

    /// Load the highest-`version` checkpoint for `thread_id`, if any.
    pub async fn load_latest(
        pool: &DatabasePool,
        thread_id: &str,
    ) -> Result<Option<Checkpoint>> {
        sqlx::query_as::<_, Checkpoint>(
            "SELECT * FROM checkpoints WHERE thread_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// List all committed versions for `thread_id`, ascending.
    pub async fn list_versions(pool: &DatabasePool, thread_id: &str) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT version FROM checkpoints WHERE thread_id = ? ORDER BY version ASC",
        )
        .bind(thread_id)
        .fetch_all(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    /// Load the checkpoint at an exact `version` for `thread_id`, if present.
    pub async fn load_at(
        pool: &DatabasePool,
        thread_id: &str,
        version: i64,
    ) -> Result<Option<Checkpoint>> {
        sqlx::query_as::<_, Checkpoint>(
            "SELECT * FROM checkpoints WHERE thread_id = ? AND version = ?",
        )
        .bind(thread_id)
        .bind(version)
        .fetch_optional(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// Delete every checkpoint belonging to `thread_id` (used by checkpoint
    /// saver's `delete_thread` contract and by test fixtures).
    pub async fn delete_thread(pool: &DatabasePool, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
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
            "CREATE TABLE checkpoints (
                thread_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, version)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn save_and_load_latest_round_trips() {
        let pool = setup().await;
        let v = CheckpointRepository::save(&pool, "wf-1", 0, "{\"a\":1}")
            .await
            .unwrap();
        assert_eq!(v, 1);

        let latest = CheckpointRepository::load_latest(&pool, "wf-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.version, 1);
        assert_eq!(latest.snapshot, "{\"a\":1}");
    }

    #[tokio::test]
    async fn version_strictly_increases() {
        let pool = setup().await;
        CheckpointRepository::save(&pool, "wf-1", 0, "{}").await.unwrap();
        CheckpointRepository::save(&pool, "wf-1", 1, "{}").await.unwrap();
        let versions = CheckpointRepository::list_versions(&pool, "wf-1").await.unwrap();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrent_save_at_same_version_conflicts() {
        let pool = setup().await;
        CheckpointRepository::save(&pool, "wf-1", 0, "{}").await.unwrap();

        // Two writers both believe version 1 is current.
        let first = CheckpointRepository::save(&pool, "wf-1", 1, "{\"from\":\"a\"}").await;
        let second = CheckpointRepository::save(&pool, "wf-1", 1, "{\"from\":\"b\"}").await;

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(OrchestratorError::PersistenceConflict { .. })
        ));
    }

    #[tokio::test]
    async fn load_at_returns_exact_version() {
        let pool = setup().await;
        CheckpointRepository::save(&pool, "wf-1", 0, "{\"v\":1}").await.unwrap();
        CheckpointRepository::save(&pool, "wf-1", 1, "{\"v\":2}").await.unwrap();

        let at_v1 = CheckpointRepository::load_at(&pool, "wf-1", 1).await.unwrap().unwrap();
        assert_eq!(at_v1.snapshot, "{\"v\":1}");
    }
}

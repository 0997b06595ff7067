//! Resource lock repository backing the Resource Lock Manager (spec §4.3).
//!
//! Locks are persisted rather than held purely in memory so a crashed
//! process doesn't leave a phantom holder behind forever: the sweeper in
//! [`crate::locks`] reaps rows whose `expires_at` has passed, whether or not
//! the original holder is still alive.

use crate::db::connection::DatabasePool;
use crate::db::models::ResourceLockRow;
use crate::{OrchestratorError, Result};
use chrono::{DateTime, Utc};

pub struct ResourceLockRepository;

impl ResourceLockRepository {
    /// Attempt to acquire `resource_id` for `holder`, expiring at `expires_at`.
    /// Fails with `LockContended` if an unexpired row already exists.
    pub async fn try_acquire(
        pool: &DatabasePool,
        resource_id: &str,
        holder: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ResourceLockRow> {
        Self::sweep_expired(pool, resource_id).await?;

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO resource_locks (resource_id, holder, acquired_at, expires_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(resource_id)
        .bind(holder)
        .bind(&now)
        .bind(expires_at.to_rfc3339())
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(ResourceLockRow {
                resource_id: resource_id.to_string(),
                holder: holder.to_string(),
                acquired_at: now,
                expires_at: expires_at.to_rfc3339(),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(OrchestratorError::LockContended {
                    resource_id: resource_id.to_string(),
                })
            }
            Err(e) => Err(OrchestratorError::General(e.to_string())),
        }
    }

    /// Release a lock, but only if `holder` is the one currently holding it.
    pub async fn release(pool: &DatabasePool, resource_id: &str, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM resource_locks WHERE resource_id = ? AND holder = ?")
            .bind(resource_id)
            .bind(holder)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(())
    }

    pub async fn get(
        pool: &DatabasePool,
        resource_id: &str,
    ) -> Result<Option<ResourceLockRow>> {
        sqlx::query_as::<_, ResourceLockRow>(
            "SELECT * FROM resource_locks WHERE resource_id = ?",
        )
        .bind(resource_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// All locks currently held by `holder`, expired or not — used to check
    /// a parked workflow's locks against their `expires_at` before honoring
    /// an approval (spec §5: a lock held across a HITL interrupt that
    /// expires before the approval arrives fails the workflow).
    pub async fn list_for_holder(
        pool: &DatabasePool,
        holder: &str,
    ) -> Result<Vec<ResourceLockRow>> {
        sqlx::query_as::<_, ResourceLockRow>(
            "SELECT * FROM resource_locks WHERE holder = ?",
        )
        .bind(holder)
        .fetch_all(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// Remove `resource_id`'s row if it has already expired, so a stale
    /// holder never blocks a fresh acquire.
    async fn sweep_expired(pool: &DatabasePool, resource_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("DELETE FROM resource_locks WHERE resource_id = ? AND expires_at < ?")
            .bind(resource_id)
            .bind(&now)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(())
    }

    /// Sweep every expired lock in the table; used by the background
    /// sweeper task, not by the per-resource acquire path.
    pub async fn sweep_all_expired(pool: &DatabasePool) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("DELETE FROM resource_locks WHERE expires_at < ?")
            .bind(&now)
            .execute(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;
    use chrono::Duration;

    async fn setup() -> DatabasePool {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        let pool = conn.pool().clone();
        sqlx::query(
            "CREATE TABLE resource_locks (
                resource_id TEXT PRIMARY KEY NOT NULL,
                holder TEXT NOT NULL,
                acquired_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn acquire_then_contend_fails() {
        let pool = setup().await;
        let expires = Utc::now() + Duration::seconds(30);
        ResourceLockRepository::try_acquire(&pool, "res-1", "wf-a", expires)
            .await
            .unwrap();

        let second = ResourceLockRepository::try_acquire(&pool, "res-1", "wf-b", expires).await;
        assert!(matches!(
            second,
            Err(OrchestratorError::LockContended { .. })
        ));
    }

    #[tokio::test]
    async fn expired_lock_is_swept_on_next_acquire() {
        let pool = setup().await;
        let already_expired = Utc::now() - Duration::seconds(1);
        ResourceLockRepository::try_acquire(&pool, "res-1", "wf-a", already_expired)
            .await
            .unwrap();

        let fresh = Utc::now() + Duration::seconds(30);
        let acquired = ResourceLockRepository::try_acquire(&pool, "res-1", "wf-b", fresh).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn release_only_by_holder() {
        let pool = setup().await;
        let expires = Utc::now() + Duration::seconds(30);
        ResourceLockRepository::try_acquire(&pool, "res-1", "wf-a", expires)
            .await
            .unwrap();

        ResourceLockRepository::release(&pool, "res-1", "wf-b").await.unwrap();
        assert!(ResourceLockRepository::get(&pool, "res-1").await.unwrap().is_some());

        ResourceLockRepository::release(&pool, "res-1", "wf-a").await.unwrap();
        assert!(ResourceLockRepository::get(&pool, "res-1").await.unwrap().is_none());
    }
}

//! Resource Lock Manager (spec §4.3): mutually exclusive advisory locks over
//! named resources, persisted so a crashed holder auto-releases rather than
//! leaving a permanent lock. A background sweeper reclaims rows whose
//! `expires_at` has passed.

use crate::db::connection::DatabasePool;
use crate::db::repositories::ResourceLockRepository;
use crate::{OrchestratorError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;

/// A held lock. Dropping it without calling [`LockManager::release`] leaves
/// the row in place until the sweeper reclaims it at `expires_at` — callers
/// MUST release explicitly on every exit path of the node that acquired it.
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub resource_id: String,
    pub holder: String,
}

/// Manages acquisition, release, and TTL expiry of named resource locks.
pub struct LockManager {
    pool: DatabasePool,
    default_ttl_s: i64,
}

impl LockManager {
    pub fn new(pool: DatabasePool, default_ttl_s: i64) -> Self {
        Self { pool, default_ttl_s }
    }

    /// Acquire `resource_id` for `holder`. If `wait_timeout` is zero, fails
    /// immediately with `LockContended` on contention; otherwise polls until
    /// the lock frees up or `wait_timeout` elapses.
    pub async fn acquire(
        &self,
        resource_id: &str,
        holder: &str,
        timeout_s: Option<i64>,
        wait_timeout: Duration,
    ) -> Result<LockHandle> {
        let ttl = timeout_s.unwrap_or(self.default_ttl_s);
        let expires_at = Utc::now() + ChronoDuration::seconds(ttl);

        let deadline = tokio::time::Instant::now() + wait_timeout;
        loop {
            match ResourceLockRepository::try_acquire(&self.pool, resource_id, holder, expires_at)
                .await
            {
                Ok(_) => {
                    return Ok(LockHandle {
                        resource_id: resource_id.to_string(),
                        holder: holder.to_string(),
                    })
                }
                Err(OrchestratorError::LockContended { .. }) => {
                    if wait_timeout.is_zero() || tokio::time::Instant::now() >= deadline {
                        return Err(OrchestratorError::LockContended {
                            resource_id: resource_id.to_string(),
                        });
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Release a held lock. No-op if already released or expired.
    pub async fn release(&self, handle: &LockHandle) -> Result<()> {
        ResourceLockRepository::release(&self.pool, &handle.resource_id, &handle.holder).await
    }

    pub async fn is_locked(&self, resource_id: &str) -> Result<bool> {
        Ok(ResourceLockRepository::get(&self.pool, resource_id)
            .await?
            .is_some())
    }

    /// The resource id of the first lock `holder` holds whose `expires_at`
    /// has already passed, if any (spec §5 lock-expired-across-interrupt
    /// check).
    pub async fn first_expired_for_holder(&self, holder: &str) -> Result<Option<String>> {
        let now = Utc::now();
        let rows = ResourceLockRepository::list_for_holder(&self.pool, holder).await?;
        Ok(rows.into_iter().find_map(|row| {
            let expires_at = row.expires_at.parse::<chrono::DateTime<Utc>>().ok()?;
            (expires_at < now).then_some(row.resource_id)
        }))
    }

    /// Run one sweep pass, reclaiming every row whose `expires_at` has
    /// passed. Returns the number of rows reclaimed.
    pub async fn sweep_once(&self) -> Result<u64> {
        ResourceLockRepository::sweep_all_expired(&self.pool).await
    }

    /// Spawn a background task that sweeps expired locks on `interval`.
    pub fn spawn_sweeper(pool: DatabasePool, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let manager = LockManager::new(pool, 0);
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = manager.sweep_once().await {
                    tracing::warn!(error = %e, "resource lock sweep failed");
                }
            }
        })
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
    async fn contended_lock_fails_fast_with_zero_wait() {
        let pool = setup().await;
        let mgr = LockManager::new(pool, 30);
        mgr.acquire("deploy:prod", "wf-a", None, Duration::ZERO)
            .await
            .unwrap();

        let second = mgr
            .acquire("deploy:prod", "wf-b", None, Duration::ZERO)
            .await;
        assert!(matches!(
            second,
            Err(OrchestratorError::LockContended { .. })
        ));
    }

    #[tokio::test]
    async fn release_frees_for_next_acquirer() {
        let pool = setup().await;
        let mgr = LockManager::new(pool, 30);
        let handle = mgr
            .acquire("deploy:prod", "wf-a", None, Duration::ZERO)
            .await
            .unwrap();
        mgr.release(&handle).await.unwrap();

        assert!(!mgr.is_locked("deploy:prod").await.unwrap());
        let second = mgr.acquire("deploy:prod", "wf-b", None, Duration::ZERO).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn waiting_acquire_succeeds_once_released() {
        let pool = setup().await;
        let mgr = LockManager::new(pool, 30);
        let handle = mgr
            .acquire("deploy:prod", "wf-a", None, Duration::ZERO)
            .await
            .unwrap();

        let pool2 = mgr.pool.clone();
        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ResourceLockRepository::release(&pool2, "deploy:prod", "wf-a")
                .await
                .unwrap();
        });

        let waited = mgr
            .acquire("deploy:prod", "wf-b", None, Duration::from_millis(500))
            .await;
        releaser.await.unwrap();
        drop(handle);
        assert!(waited.is_ok());
    }
}

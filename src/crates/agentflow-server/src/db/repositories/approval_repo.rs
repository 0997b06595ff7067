//! Approval repository backing the HITL Controller (spec §4.10).
//!
//! `resolve` is written so calling it twice on an already-resolved row is a
//! no-op rather than an error, matching the idempotent-resolve rule.

use crate::db::connection::DatabasePool;
use crate::db::models::ApprovalRow;
use crate::{OrchestratorError, Result};
use chrono::{DateTime, Utc};

pub struct ApprovalRepository;

impl ApprovalRepository {
    pub async fn create(
        pool: &DatabasePool,
        approval_id: &str,
        workflow_id: &str,
        risk_level: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ApprovalRow> {
        let now = Utc::now().to_rfc3339();
        let expires_at = expires_at.to_rfc3339();
        sqlx::query(
            "INSERT INTO approvals (approval_id, workflow_id, state, risk_level, created_at, expires_at, resolved_at)
             VALUES (?, ?, 'pending', ?, ?, ?, NULL)",
        )
        .bind(approval_id)
        .bind(workflow_id)
        .bind(risk_level)
        .bind(&now)
        .bind(&expires_at)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?;

        Ok(ApprovalRow {
            approval_id: approval_id.to_string(),
            workflow_id: workflow_id.to_string(),
            state: "pending".to_string(),
            risk_level: risk_level.to_string(),
            created_at: now,
            expires_at,
            resolved_at: None,
        })
    }

    pub async fn get(pool: &DatabasePool, approval_id: &str) -> Result<Option<ApprovalRow>> {
        sqlx::query_as::<_, ApprovalRow>("SELECT * FROM approvals WHERE approval_id = ?")
            .bind(approval_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    /// Move a pending approval to `state` (`approved` or `rejected`). Returns
    /// `Ok(false)` without error if the approval was already resolved, so
    /// callers can treat a duplicate resolve as a no-op rather than a fault.
    pub async fn resolve(pool: &DatabasePool, approval_id: &str, state: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let updated = sqlx::query(
            "UPDATE approvals SET state = ?, resolved_at = ?
             WHERE approval_id = ? AND state = 'pending'",
        )
        .bind(state)
        .bind(&now)
        .bind(approval_id)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?
        .rows_affected();

        Ok(updated > 0)
    }

    /// Move `approval_id` from `pending` to `expired`, but only if it is
    /// still pending and its `expires_at` has passed. Returns whether the
    /// row was actually transitioned, so callers can distinguish "was
    /// already resolved" from "just expired."
    pub async fn expire_if_due(pool: &DatabasePool, approval_id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let updated = sqlx::query(
            "UPDATE approvals SET state = 'expired'
             WHERE approval_id = ? AND state = 'pending' AND expires_at < ?",
        )
        .bind(approval_id)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?
        .rows_affected();

        Ok(updated > 0)
    }

    /// Expire every pending approval past its `expires_at`; used by the
    /// background sweeper, not the per-approval resolve/get path.
    pub async fn sweep_all_expired(pool: &DatabasePool) -> Result<u64> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE approvals SET state = 'expired' WHERE state = 'pending' AND expires_at < ?",
        )
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?;
        Ok(result.rows_affected())
    }

    pub async fn list_pending_for_workflow(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Vec<ApprovalRow>> {
        sqlx::query_as::<_, ApprovalRow>(
            "SELECT * FROM approvals WHERE workflow_id = ? AND state = 'pending' ORDER BY created_at ASC",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;
    use chrono::Duration as ChronoDuration;

    async fn setup() -> DatabasePool {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        let pool = conn.pool().clone();
        sqlx::query(
            "CREATE TABLE approvals (
                approval_id TEXT PRIMARY KEY NOT NULL,
                workflow_id TEXT NOT NULL,
                state TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                resolved_at TEXT
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn future_expiry() -> DateTime<Utc> {
        Utc::now() + ChronoDuration::seconds(3600)
    }

    #[tokio::test]
    async fn create_starts_pending() {
        let pool = setup().await;
        let row = ApprovalRepository::create(&pool, "appr-1", "wf-1", "high", future_expiry())
            .await
            .unwrap();
        assert_eq!(row.state, "pending");
        assert!(row.resolved_at.is_none());
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let pool = setup().await;
        ApprovalRepository::create(&pool, "appr-1", "wf-1", "high", future_expiry())
            .await
            .unwrap();

        let first = ApprovalRepository::resolve(&pool, "appr-1", "approved").await.unwrap();
        assert!(first);

        let second = ApprovalRepository::resolve(&pool, "appr-1", "rejected").await.unwrap();
        assert!(!second);

        let row = ApprovalRepository::get(&pool, "appr-1").await.unwrap().unwrap();
        assert_eq!(row.state, "approved");
    }

    #[tokio::test]
    async fn list_pending_excludes_resolved() {
        let pool = setup().await;
        ApprovalRepository::create(&pool, "appr-1", "wf-1", "low", future_expiry()).await.unwrap();
        ApprovalRepository::create(&pool, "appr-2", "wf-1", "high", future_expiry()).await.unwrap();
        ApprovalRepository::resolve(&pool, "appr-1", "approved").await.unwrap();

        let pending = ApprovalRepository::list_pending_for_workflow(&pool, "wf-1")
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].approval_id, "appr-2");
    }

    #[tokio::test]
    async fn expire_if_due_transitions_only_past_deadline() {
        let pool = setup().await;
        let already_expired = Utc::now() - ChronoDuration::seconds(1);
        ApprovalRepository::create(&pool, "appr-1", "wf-1", "high", already_expired)
            .await
            .unwrap();
        ApprovalRepository::create(&pool, "appr-2", "wf-1", "high", future_expiry())
            .await
            .unwrap();

        let expired = ApprovalRepository::expire_if_due(&pool, "appr-1").await.unwrap();
        assert!(expired);
        let not_yet = ApprovalRepository::expire_if_due(&pool, "appr-2").await.unwrap();
        assert!(!not_yet);

        let row1 = ApprovalRepository::get(&pool, "appr-1").await.unwrap().unwrap();
        assert_eq!(row1.state, "expired");
        let row2 = ApprovalRepository::get(&pool, "appr-2").await.unwrap().unwrap();
        assert_eq!(row2.state, "pending");
    }

    #[tokio::test]
    async fn sweep_all_expired_only_touches_pending_past_deadline() {
        let pool = setup().await;
        let already_expired = Utc::now() - ChronoDuration::seconds(1);
        ApprovalRepository::create(&pool, "appr-1", "wf-1", "high", already_expired)
            .await
            .unwrap();
        ApprovalRepository::create(&pool, "appr-2", "wf-1", "high", already_expired)
            .await
            .unwrap();
        ApprovalRepository::resolve(&pool, "appr-2", "approved").await.unwrap();

        let swept = ApprovalRepository::sweep_all_expired(&pool).await.unwrap();
        assert_eq!(swept, 1);

        let row1 = ApprovalRepository::get(&pool, "appr-1").await.unwrap().unwrap();
        assert_eq!(row1.state, "expired");
        let row2 = ApprovalRepository::get(&pool, "appr-2").await.unwrap().unwrap();
        assert_eq!(row2.state, "approved");
    }
}

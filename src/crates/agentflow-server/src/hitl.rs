//! HITL (human-in-the-loop) Controller (spec §4.10): risk assessment and
//! approval gating. Creates approval handles, persists them, and on
//! resolution produces a resume ticket for the parked workflow.

use crate::db::connection::DatabasePool;
use crate::db::repositories::ApprovalRepository;
use crate::{OrchestratorError, Result};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Risk level assigned to a pending operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Low,
        }
    }

    /// Static approver-role policy table: higher risk requires a more
    /// senior approver role.
    pub fn required_approver_role(&self) -> &'static str {
        match self {
            RiskLevel::Low => "any",
            RiskLevel::Medium => "reviewer",
            RiskLevel::High => "lead",
            RiskLevel::Critical => "admin",
        }
    }
}

/// Decision rendered when an approval is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl ApprovalDecision {
    fn as_str(&self) -> &'static str {
        match self {
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::Rejected => "rejected",
        }
    }
}

/// A ticket the graph engine uses to resume a parked workflow.
#[derive(Debug, Clone)]
pub struct ResumeTicket {
    pub workflow_id: String,
    pub approval_id: String,
    pub decision: ApprovalDecision,
}

/// Maps an operation name to a risk level via keyword rules. Operations not
/// matched by any rule default to `medium` — safer than silently treating
/// unknown operations as low-risk.
pub(crate) fn assess_risk(operation: &str) -> RiskLevel {
    let op = operation.to_ascii_lowercase();
    const CRITICAL: &[&str] = &["deploy:prod", "delete_database", "rotate_secret"];
    const HIGH: &[&str] = &["deploy", "force_push", "drop_table", "revoke_access"];
    const LOW: &[&str] = &["comment", "label", "read", "list"];

    if CRITICAL.iter().any(|k| op.contains(k)) {
        RiskLevel::Critical
    } else if HIGH.iter().any(|k| op.contains(k)) {
        RiskLevel::High
    } else if LOW.iter().any(|k| op.contains(k)) {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

pub struct HitlController {
    pool: DatabasePool,
    default_expiry_s: i64,
}

impl HitlController {
    pub fn new(pool: DatabasePool, default_expiry_s: i64) -> Self {
        Self {
            pool,
            default_expiry_s,
        }
    }

    /// Assess `operation`'s risk and persist a pending approval handle,
    /// expiring `default_expiry_s` after creation (spec §6
    /// `approval_expiry_s`).
    pub async fn request_approval(&self, workflow_id: &str, operation: &str) -> Result<String> {
        let risk = assess_risk(operation);
        let approval_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + ChronoDuration::seconds(self.default_expiry_s);
        ApprovalRepository::create(
            &self.pool,
            &approval_id,
            workflow_id,
            risk.as_str(),
            expires_at,
        )
        .await?;
        Ok(approval_id)
    }

    /// Resolve a pending approval. Idempotent: resolving an
    /// already-resolved handle is a no-op that returns the stored outcome
    /// rather than erroring. An approval whose `expires_at` has passed is
    /// transitioned to `expired` and rejected with
    /// [`OrchestratorError::ApprovalTimeout`] (spec §7: terminal) instead of
    /// being resolved, even if the decision arrives in the same instant.
    pub async fn resolve(
        &self,
        approval_id: &str,
        decision: ApprovalDecision,
        _actor: &str,
        _reason: Option<&str>,
    ) -> Result<Option<ResumeTicket>> {
        if ApprovalRepository::expire_if_due(&self.pool, approval_id).await? {
            return Err(OrchestratorError::ApprovalTimeout {
                approval_id: approval_id.to_string(),
            });
        }

        let row = ApprovalRepository::get(&self.pool, approval_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(approval_id.to_string()))?;

        if row.state == "expired" {
            return Err(OrchestratorError::ApprovalTimeout {
                approval_id: approval_id.to_string(),
            });
        }

        let newly_resolved =
            ApprovalRepository::resolve(&self.pool, approval_id, decision.as_str()).await?;

        let effective_decision = if newly_resolved {
            decision
        } else if row.state == "approved" {
            ApprovalDecision::Approved
        } else if row.state == "rejected" {
            ApprovalDecision::Rejected
        } else {
            // Still pending somehow — nothing to resume.
            return Ok(None);
        };

        Ok(Some(ResumeTicket {
            workflow_id: row.workflow_id,
            approval_id: approval_id.to_string(),
            decision: effective_decision,
        }))
    }

    pub async fn risk_level_of(&self, approval_id: &str) -> Result<Option<RiskLevel>> {
        Ok(ApprovalRepository::get(&self.pool, approval_id)
            .await?
            .map(|row| RiskLevel::from_str(&row.risk_level)))
    }

    /// Run one sweep pass, expiring every pending approval past its
    /// `expires_at`. Returns the number of approvals expired.
    pub async fn sweep_once(&self) -> Result<u64> {
        ApprovalRepository::sweep_all_expired(&self.pool).await
    }

    /// Spawn a background task that expires stale approvals on `interval`,
    /// mirroring [`crate::locks::LockManager::spawn_sweeper`].
    pub fn spawn_sweeper(pool: DatabasePool, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let controller = HitlController::new(pool, 0);
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = controller.sweep_once().await {
                    tracing::warn!(error = %e, "approval sweep failed");
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

    #[tokio::test]
    async fn deploy_prod_is_critical_risk() {
        let pool = setup().await;
        let controller = HitlController::new(pool, 3_600);
        let id = controller
            .request_approval("wf-1", "deploy:prod release")
            .await
            .unwrap();
        assert_eq!(controller.risk_level_of(&id).await.unwrap(), Some(RiskLevel::Critical));
    }

    #[tokio::test]
    async fn resolve_is_idempotent_returns_original_outcome() {
        let pool = setup().await;
        let controller = HitlController::new(pool, 3_600);
        let id = controller.request_approval("wf-1", "deploy staging").await.unwrap();

        let first = controller
            .resolve(&id, ApprovalDecision::Approved, "alice", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.decision, ApprovalDecision::Approved);

        let second = controller
            .resolve(&id, ApprovalDecision::Rejected, "bob", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.decision, ApprovalDecision::Approved);
    }

    #[tokio::test]
    async fn expired_approval_rejects_resolve_with_timeout() {
        let pool = setup().await;
        // Zero-second expiry: the approval is already stale by the time we
        // try to resolve it.
        let controller = HitlController::new(pool, 0);
        let id = controller.request_approval("wf-1", "fix bug").await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let result = controller
            .resolve(&id, ApprovalDecision::Approved, "alice", None)
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::ApprovalTimeout { .. })
        ));
    }
}

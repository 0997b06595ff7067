//! Approval handle row model (spec §3 `ApprovalHandle`, §4.10 HITL Controller).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalRow {
    pub approval_id: String,
    pub workflow_id: String,
    pub state: String,
    pub risk_level: String,
    pub created_at: String,
    pub expires_at: String,
    pub resolved_at: Option<String>,
}

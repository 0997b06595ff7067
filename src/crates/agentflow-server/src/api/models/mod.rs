//! API data transfer objects (DTOs) for the public API surface (spec §4.12).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST orchestrate` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestrateRequest {
    pub message: String,
    #[serde(default)]
    pub project_context: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST orchestrate` response body.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrateResponse {
    pub task_id: String,
    pub subtasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
}

/// `GET tasks/{task_id}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub thread_id: String,
    pub status: String,
    pub subtasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
}

/// `POST execute/{task_id}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub task_id: String,
    pub workflow_id: String,
    pub status: String,
}

/// `POST chat/stream` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub project_context: Option<Value>,
}

/// `POST workflow/execute` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowExecuteRequest {
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

/// `POST workflow/execute` response body.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowExecuteResponse {
    pub workflow_id: String,
}

/// `GET workflow/status/{id}` response body.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatusResponse {
    pub workflow_id: String,
    pub status: String,
    pub current_step: Option<String>,
    pub pending_approval: Option<PendingApprovalView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingApprovalView {
    pub approval_id: String,
    pub risk_level: String,
    pub operation: String,
}

/// `POST workflow/resume/{id}` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowResumeRequest {
    pub approval_id: String,
    pub approved: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

/// `POST approvals/{id}/approve|reject` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDecisionRequest {
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST approvals/{id}/approve|reject` response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalDecisionResponse {
    pub approval_id: String,
    pub workflow_id: String,
    pub decision: String,
}

/// System health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,

    /// Database connection status
    pub database: String,

    /// API version
    pub version: String,

    /// Current timestamp
    pub timestamp: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn new(status: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            database: database.into(),
            version: crate::version::VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// System info response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfoResponse {
    pub version: String,
    pub build_timestamp: String,
    pub git_commit: String,
    pub rust_version: String,
}

/// System metrics response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetricsResponse {
    pub active_workflows: i64,
    pub active_locks: i64,
    pub pending_approvals: i64,
    pub memory_bytes: Option<u64>,
}

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub uuid: String,
    pub version: String,
    pub status: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response() {
        let health = HealthResponse::new("ok", "connected");
        assert_eq!(health.status, "ok");
        assert_eq!(health.database, "connected");
        assert!(!health.version.is_empty());
        assert!(!health.timestamp.is_empty());
    }

    #[test]
    fn test_system_metrics_response() {
        let metrics = SystemMetricsResponse {
            active_workflows: 3,
            active_locks: 1,
            pending_approvals: 2,
            memory_bytes: Some(1024 * 1024),
        };
        assert_eq!(metrics.active_workflows, 3);
        assert_eq!(metrics.pending_approvals, 2);
    }
}

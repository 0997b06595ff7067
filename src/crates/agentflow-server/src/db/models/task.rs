//! Task row model backing the `orchestrate` / `execute/{id}` / `tasks/{id}`
//! public API endpoints (spec §4.12). A task is created (but not started) by
//! `orchestrate`, then bound to a workflow thread once `execute` launches it.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub task_id: String,
    pub thread_id: String,
    pub status: String,
    pub project_context: Option<String>,
    /// JSON array of subtask description strings.
    pub subtasks: String,
    pub risk_level: Option<String>,
    pub approval_request_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TaskRow {
    pub fn new(task_id: impl Into<String>, thread_id: impl Into<String>, subtasks_json: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            task_id: task_id.into(),
            thread_id: thread_id.into(),
            status: "created".to_string(),
            project_context: None,
            subtasks: subtasks_json,
            risk_level: None,
            approval_request_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

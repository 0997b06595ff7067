//! Task repository backing `orchestrate` / `execute/{id}` / `tasks/{id}`
//! (spec §4.12).

use crate::db::connection::DatabasePool;
use crate::db::models::TaskRow;
use crate::{OrchestratorError, Result};
use chrono::Utc;

pub struct TaskRepository;

impl TaskRepository {
    pub async fn create(
        pool: &DatabasePool,
        task_id: &str,
        thread_id: &str,
        project_context: Option<&str>,
        subtasks_json: &str,
        risk_level: Option<&str>,
        approval_request_id: Option<&str>,
    ) -> Result<TaskRow> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO tasks (task_id, thread_id, status, project_context, subtasks, risk_level, approval_request_id, created_at, updated_at)
             VALUES (?, ?, 'created', ?, ?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(thread_id)
        .bind(project_context)
        .bind(subtasks_json)
        .bind(risk_level)
        .bind(approval_request_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?;

        Ok(TaskRow {
            task_id: task_id.to_string(),
            thread_id: thread_id.to_string(),
            status: "created".to_string(),
            project_context: project_context.map(str::to_string),
            subtasks: subtasks_json.to_string(),
            risk_level: risk_level.map(str::to_string),
            approval_request_id: approval_request_id.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn get(pool: &DatabasePool, task_id: &str) -> Result<Option<TaskRow>> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| OrchestratorError::General(e.to_string()))
    }

    pub async fn set_status(pool: &DatabasePool, task_id: &str, status: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE task_id = ?")
            .bind(status)
            .bind(&now)
            .bind(task_id)
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
            "CREATE TABLE tasks (
                task_id TEXT PRIMARY KEY NOT NULL,
                thread_id TEXT NOT NULL,
                status TEXT NOT NULL,
                project_context TEXT,
                subtasks TEXT NOT NULL,
                risk_level TEXT,
                approval_request_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let pool = setup().await;
        TaskRepository::create(&pool, "task-1", "wf-1", None, "[]", None, None)
            .await
            .unwrap();
        let row = TaskRepository::get(&pool, "task-1").await.unwrap().unwrap();
        assert_eq!(row.status, "created");
    }

    #[tokio::test]
    async fn set_status_updates_row() {
        let pool = setup().await;
        TaskRepository::create(&pool, "task-1", "wf-1", None, "[]", None, None)
            .await
            .unwrap();
        TaskRepository::set_status(&pool, "task-1", "running").await.unwrap();
        let row = TaskRepository::get(&pool, "task-1").await.unwrap().unwrap();
        assert_eq!(row.status, "running");
    }
}

//! Tasks: the cards on a project board.
//!
//! A task always belongs to a project and to one of that project's
//! statuses; the assignee is optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{opt_ts, ts};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    #[sqlx(rename = "statusId")]
    pub status_id: String,
    #[sqlx(rename = "projectId")]
    pub project_id: String,
    #[sqlx(rename = "assigneeId")]
    pub assignee_id: Option<String>,
    #[sqlx(rename = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
    #[sqlx(rename = "estimatedHours")]
    pub estimated_hours: Option<f64>,
    #[sqlx(rename = "actualHours")]
    pub actual_hours: Option<f64>,
    pub progress: i64,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY createdAt")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE projectId = ? ORDER BY createdAt")
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_status_id(
        pool: &SqlitePool,
        status_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE statusId = ? ORDER BY createdAt")
            .bind(status_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_assignee_id(
        pool: &SqlitePool,
        assignee_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE assigneeId = ? ORDER BY createdAt")
            .bind(assignee_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, task: &Task) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (id, title, description, priority, statusId, projectId, assigneeId,
                                  dueDate, estimatedHours, actualHours, progress, createdAt, updatedAt)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.priority)
        .bind(&task.status_id)
        .bind(&task.project_id)
        .bind(&task.assignee_id)
        .bind(opt_ts(&task.due_date))
        .bind(task.estimated_hours)
        .bind(task.actual_hours)
        .bind(task.progress)
        .bind(ts(&task.created_at))
        .bind(ts(&task.updated_at))
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, task: &Task) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"UPDATE tasks
               SET title = ?, description = ?, priority = ?, statusId = ?, assigneeId = ?,
                   dueDate = ?, estimatedHours = ?, actualHours = ?, progress = ?, updatedAt = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.priority)
        .bind(&task.status_id)
        .bind(&task.assignee_id)
        .bind(opt_ts(&task.due_date))
        .bind(task.estimated_hours)
        .bind(task.actual_hours)
        .bind(task.progress)
        .bind(ts(&task.updated_at))
        .bind(&task.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//! Task statuses: the ordered columns of a project's board.
//!
//! Every project gets three seeded statuses before any task references
//! one; see [`TaskStatus::seed_defaults`].

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::new_id;

pub const DEFAULT_STATUS_NAMES: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub id: String,
    pub name: String,
    pub order: i64,
    #[sqlx(rename = "projectId")]
    pub project_id: String,
}

impl TaskStatus {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskStatus>("SELECT * FROM task_statuses WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskStatus>(r#"SELECT * FROM task_statuses ORDER BY "order""#)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskStatus>(
            r#"SELECT * FROM task_statuses WHERE projectId = ? ORDER BY "order""#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, status: &TaskStatus) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskStatus>(
            r#"INSERT INTO task_statuses (id, name, "order", projectId)
               VALUES (?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&status.id)
        .bind(&status.name)
        .bind(status.order)
        .bind(&status.project_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, status: &TaskStatus) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskStatus>(
            r#"UPDATE task_statuses
               SET name = ?, "order" = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&status.name)
        .bind(status.order)
        .bind(&status.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_statuses WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Seed the three default board columns for a freshly created project.
    pub async fn seed_defaults(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut created = Vec::with_capacity(DEFAULT_STATUS_NAMES.len());
        for (order, name) in DEFAULT_STATUS_NAMES.iter().enumerate() {
            let status = TaskStatus {
                id: new_id(),
                name: (*name).to_string(),
                order: order as i64,
                project_id: project_id.to_string(),
            };
            created.push(Self::create(pool, &status).await?);
        }
        Ok(created)
    }
}

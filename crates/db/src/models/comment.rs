//! Comments attached to tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::ts;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[sqlx(rename = "taskId")]
    pub task_id: String,
    #[sqlx(rename = "authorId")]
    pub author_id: String,
    pub content: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments ORDER BY createdAt")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_task_id(pool: &SqlitePool, task_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE taskId = ? ORDER BY createdAt")
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, comment: &Comment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (id, taskId, authorId, content, createdAt, updatedAt)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&comment.id)
        .bind(&comment.task_id)
        .bind(&comment.author_id)
        .bind(&comment.content)
        .bind(ts(&comment.created_at))
        .bind(ts(&comment.updated_at))
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, comment: &Comment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"UPDATE comments
               SET content = ?, updatedAt = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&comment.content)
        .bind(ts(&comment.updated_at))
        .bind(&comment.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

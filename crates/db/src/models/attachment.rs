//! File attachments on tasks (metadata only; file storage is external).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::ts;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[sqlx(rename = "taskId")]
    pub task_id: String,
    #[sqlx(rename = "fileName")]
    pub file_name: String,
    #[sqlx(rename = "filePath")]
    pub file_path: String,
    #[sqlx(rename = "fileSize")]
    pub file_size: i64,
    #[sqlx(rename = "mimeType")]
    pub mime_type: Option<String>,
    #[sqlx(rename = "uploadedById")]
    pub uploaded_by_id: Option<String>,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>("SELECT * FROM attachments ORDER BY createdAt")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_task_id(
        pool: &SqlitePool,
        task_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE taskId = ? ORDER BY createdAt",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, attachment: &Attachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"INSERT INTO attachments (id, taskId, fileName, filePath, fileSize, mimeType, uploadedById, createdAt)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&attachment.id)
        .bind(&attachment.task_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(attachment.file_size)
        .bind(&attachment.mime_type)
        .bind(&attachment.uploaded_by_id)
        .bind(ts(&attachment.created_at))
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, attachment: &Attachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"UPDATE attachments
               SET fileName = ?, filePath = ?, fileSize = ?, mimeType = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&attachment.file_name)
        .bind(&attachment.file_path)
        .bind(attachment.file_size)
        .bind(&attachment.mime_type)
        .bind(&attachment.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

//! Project membership: the join entity between users and projects.
//!
//! Unique per (project, user) pair; the owner's membership is created
//! together with the project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::ts;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: String,
    #[sqlx(rename = "projectId")]
    pub project_id: String,
    #[sqlx(rename = "userId")]
    pub user_id: String,
    pub role: String,
    #[sqlx(rename = "joinedAt")]
    pub joined_at: DateTime<Utc>,
    #[sqlx(rename = "addedById")]
    pub added_by_id: Option<String>,
}

impl ProjectMember {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>("SELECT * FROM project_members WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>("SELECT * FROM project_members ORDER BY joinedAt")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_project_id(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            "SELECT * FROM project_members WHERE projectId = ? ORDER BY joinedAt",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, member: &ProjectMember) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"INSERT INTO project_members (id, projectId, userId, role, joinedAt, addedById)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&member.id)
        .bind(&member.project_id)
        .bind(&member.user_id)
        .bind(&member.role)
        .bind(ts(&member.joined_at))
        .bind(&member.added_by_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, member: &ProjectMember) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"UPDATE project_members
               SET role = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&member.role)
        .bind(&member.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_members WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

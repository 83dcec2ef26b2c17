//! User accounts: signup identity, profile and role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::ts;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: String,
    #[sqlx(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY createdAt")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, user: &User) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, username, name, password, role, avatarUrl, createdAt, updatedAt)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.role)
        .bind(&user.avatar_url)
        .bind(ts(&user.created_at))
        .bind(ts(&user.updated_at))
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, user: &User) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET email = ?, username = ?, name = ?, password = ?, role = ?, avatarUrl = ?, updatedAt = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password)
        .bind(&user.role)
        .bind(&user.avatar_url)
        .bind(ts(&user.updated_at))
        .bind(&user.id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

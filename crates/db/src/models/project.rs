//! Projects: the top-level container for boards, tasks and members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{opt_ts, ts};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[sqlx(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    pub priority: String,
    #[sqlx(rename = "ownerId")]
    pub owner_id: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY createdAt")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_owner_id(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE ownerId = ? ORDER BY createdAt")
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, project: &Project) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (id, name, description, startDate, endDate, priority, ownerId, createdAt, updatedAt)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#,
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(opt_ts(&project.start_date))
        .bind(opt_ts(&project.end_date))
        .bind(&project.priority)
        .bind(&project.owner_id)
        .bind(ts(&project.created_at))
        .bind(ts(&project.updated_at))
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &SqlitePool, project: &Project) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"UPDATE projects
               SET name = ?, description = ?, startDate = ?, endDate = ?, priority = ?, ownerId = ?, updatedAt = ?
               WHERE id = ?
               RETURNING *"#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(opt_ts(&project.start_date))
        .bind(opt_ts(&project.end_date))
        .bind(&project.priority)
        .bind(&project.owner_id)
        .bind(ts(&project.updated_at))
        .bind(&project.id)
        .fetch_one(pool)
        .await
    }

    /// Delete a project. Statuses, tasks, comments, attachments and
    /// memberships cascade via foreign keys.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{new_id, test_support::setup_test_pool, user::tests::sample_user};
    use crate::models::{Task, TaskStatus, User};

    pub(crate) fn sample_project(owner_id: &str) -> Project {
        let now = Utc::now();
        Project {
            id: new_id(),
            name: "Test Project".to_string(),
            description: Some("A project used in tests".to_string()),
            start_date: Some(now),
            end_date: None,
            priority: "HIGH".to_string(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_project_crud() {
        let (pool, _temp_dir) = setup_test_pool().await;

        let owner = User::create(&pool, &sample_user()).await.expect("owner");
        let project = sample_project(&owner.id);

        let created = Project::create(&pool, &project).await.expect("create");
        assert_eq!(created.name, "Test Project");
        assert_eq!(created.owner_id, owner.id);

        let by_owner = Project::find_by_owner_id(&pool, &owner.id)
            .await
            .expect("query");
        assert_eq!(by_owner.len(), 1);

        let mut updated = created.clone();
        updated.priority = "LOW".to_string();
        let saved = Project::update(&pool, &updated).await.expect("update");
        assert_eq!(saved.priority, "LOW");

        assert_eq!(Project::delete(&pool, &project.id).await.expect("delete"), 1);
    }

    #[tokio::test]
    async fn test_project_delete_cascades() {
        let (pool, _temp_dir) = setup_test_pool().await;

        let owner = User::create(&pool, &sample_user()).await.expect("owner");
        let project = Project::create(&pool, &sample_project(&owner.id))
            .await
            .expect("project");

        let status = TaskStatus::create(
            &pool,
            &crate::models::task_status::tests::sample_status(&project.id, 0),
        )
        .await
        .expect("status");

        Task::create(
            &pool,
            &crate::models::task::tests::sample_task(&project.id, &status.id),
        )
        .await
        .expect("task");

        Project::delete(&pool, &project.id).await.expect("delete");

        assert!(
            Task::find_by_project_id(&pool, &project.id)
                .await
                .expect("query")
                .is_empty()
        );
        assert!(
            TaskStatus::find_by_project_id(&pool, &project.id)
                .await
                .expect("query")
                .is_empty()
        );
    }
}

//! Embedded-store adapter: delegates to the typed `db` models.

use async_trait::async_trait;
use db::models::{Attachment, Comment, Project, ProjectMember, Task, TaskStatus, User};
use db::{RetryConfig, with_retry};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::SqlitePool;

use super::{RecordStore, StoreError, record_id};
use crate::services::schema::{Record, SyncTable};

/// Adapter over the embedded SQLite store.
///
/// Writes go through the BUSY/LOCKED retry helper; reads are plain
/// pool queries.
pub struct SqliteStore {
    pool: SqlitePool,
    retry: RetryConfig,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            retry: RetryConfig::default(),
        }
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Shape(format!(
            "expected object, got {other}"
        ))),
        Err(e) => Err(StoreError::Shape(e.to_string())),
    }
}

fn from_record<T: DeserializeOwned>(record: &Record) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record.clone()))
        .map_err(|e| StoreError::Shape(e.to_string()))
}

fn records<T: Serialize>(rows: Vec<T>) -> Result<Vec<Record>, StoreError> {
    rows.iter().map(to_record).collect()
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_all(&self, table: SyncTable) -> Result<Vec<Record>, StoreError> {
        match table {
            SyncTable::Users => records(User::find_all(&self.pool).await?),
            SyncTable::Projects => records(Project::find_all(&self.pool).await?),
            SyncTable::TaskStatuses => records(TaskStatus::find_all(&self.pool).await?),
            SyncTable::Tasks => records(Task::find_all(&self.pool).await?),
            SyncTable::Comments => records(Comment::find_all(&self.pool).await?),
            SyncTable::Attachments => records(Attachment::find_all(&self.pool).await?),
            SyncTable::ProjectMembers => records(ProjectMember::find_all(&self.pool).await?),
        }
    }

    async fn find_by_id(
        &self,
        table: SyncTable,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        match table {
            SyncTable::Users => User::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::Projects => Project::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::TaskStatuses => TaskStatus::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::Tasks => Task::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::Comments => Comment::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::Attachments => Attachment::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
            SyncTable::ProjectMembers => ProjectMember::find_by_id(&self.pool, id)
                .await?
                .map(|r| to_record(&r))
                .transpose(),
        }
    }

    async fn insert(&self, table: SyncTable, record: &Record) -> Result<(), StoreError> {
        match table {
            SyncTable::Users => {
                let row: User = from_record(record)?;
                with_retry(&self.retry, "insert_user", || User::create(&self.pool, &row)).await?;
            }
            SyncTable::Projects => {
                let row: Project = from_record(record)?;
                with_retry(&self.retry, "insert_project", || {
                    Project::create(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::TaskStatuses => {
                let row: TaskStatus = from_record(record)?;
                with_retry(&self.retry, "insert_task_status", || {
                    TaskStatus::create(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::Tasks => {
                let row: Task = from_record(record)?;
                with_retry(&self.retry, "insert_task", || Task::create(&self.pool, &row)).await?;
            }
            SyncTable::Comments => {
                let row: Comment = from_record(record)?;
                with_retry(&self.retry, "insert_comment", || {
                    Comment::create(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::Attachments => {
                let row: Attachment = from_record(record)?;
                with_retry(&self.retry, "insert_attachment", || {
                    Attachment::create(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::ProjectMembers => {
                let row: ProjectMember = from_record(record)?;
                with_retry(&self.retry, "insert_project_member", || {
                    ProjectMember::create(&self.pool, &row)
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        // Full-record updates only: the id inside the record is
        // authoritative and must match the addressed row.
        if record_id(table, record)? != id {
            return Err(StoreError::Shape(format!(
                "record id does not match update target {id}"
            )));
        }

        match table {
            SyncTable::Users => {
                let row: User = from_record(record)?;
                with_retry(&self.retry, "update_user", || User::update(&self.pool, &row)).await?;
            }
            SyncTable::Projects => {
                let row: Project = from_record(record)?;
                with_retry(&self.retry, "update_project", || {
                    Project::update(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::TaskStatuses => {
                let row: TaskStatus = from_record(record)?;
                with_retry(&self.retry, "update_task_status", || {
                    TaskStatus::update(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::Tasks => {
                let row: Task = from_record(record)?;
                with_retry(&self.retry, "update_task", || Task::update(&self.pool, &row)).await?;
            }
            SyncTable::Comments => {
                let row: Comment = from_record(record)?;
                with_retry(&self.retry, "update_comment", || {
                    Comment::update(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::Attachments => {
                let row: Attachment = from_record(record)?;
                with_retry(&self.retry, "update_attachment", || {
                    Attachment::update(&self.pool, &row)
                })
                .await?;
            }
            SyncTable::ProjectMembers => {
                let row: ProjectMember = from_record(record)?;
                with_retry(&self.retry, "update_project_member", || {
                    ProjectMember::update(&self.pool, &row)
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, table: SyncTable, id: &str) -> Result<(), StoreError> {
        let deleted = match table {
            SyncTable::Users => User::delete(&self.pool, id).await?,
            SyncTable::Projects => Project::delete(&self.pool, id).await?,
            SyncTable::TaskStatuses => TaskStatus::delete(&self.pool, id).await?,
            SyncTable::Tasks => Task::delete(&self.pool, id).await?,
            SyncTable::Comments => Comment::delete(&self.pool, id).await?,
            SyncTable::Attachments => Attachment::delete(&self.pool, id).await?,
            SyncTable::ProjectMembers => ProjectMember::delete(&self.pool, id).await?,
        };
        if deleted == 0 {
            return Err(StoreError::NotFound {
                table: table.as_str(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

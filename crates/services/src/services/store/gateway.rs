//! Gateway-backed store adapter.

use async_trait::async_trait;

use super::{RecordStore, StoreError, record_id};
use crate::services::remote::RemoteRepo;
use crate::services::schema::{Record, SyncTable};

/// Adapter over the remote SQL Server, reached through the query
/// gateway. Translation to remote column names happens inside
/// `RemoteRepo`; this layer only adapts signatures.
pub struct GatewayStore {
    repo: RemoteRepo,
}

impl GatewayStore {
    pub fn new(repo: RemoteRepo) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl RecordStore for GatewayStore {
    fn name(&self) -> &'static str {
        "gateway"
    }

    async fn fetch_all(&self, table: SyncTable) -> Result<Vec<Record>, StoreError> {
        Ok(self.repo.list(table, &[]).await?)
    }

    async fn find_by_id(
        &self,
        table: SyncTable,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        Ok(self.repo.find_by_id(table, id).await?)
    }

    async fn insert(&self, table: SyncTable, record: &Record) -> Result<(), StoreError> {
        // The guarded insert is a no-op when the row already exists,
        // which is exactly the idempotence the caller wants.
        self.repo.insert(table, record).await?;
        Ok(())
    }

    async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        if record_id(table, record)? != id {
            return Err(StoreError::Shape(format!(
                "record id does not match update target {id}"
            )));
        }
        let updated = self.repo.update(table, id, record).await?;
        if updated.is_none() {
            return Err(StoreError::NotFound {
                table: table.as_str(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, table: SyncTable, id: &str) -> Result<(), StoreError> {
        let deleted = self.repo.delete(table, id).await?;
        if deleted == 0 {
            return Err(StoreError::NotFound {
                table: table.as_str(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

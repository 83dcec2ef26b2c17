//! The shared record-store interface.
//!
//! One interface, several adapters: the embedded SQLite store, the
//! gateway shim for the remote SQL Server, and an in-memory store used
//! by tests. The backend is selected once at startup and injected as
//! `Arc<dyn RecordStore>` everywhere; there is no runtime switching
//! between differently-shaped client objects.

mod gateway;
mod memory;
mod sqlite;

pub use gateway::GatewayStore;
pub use memory::{FlakyStore, MemoryStore};
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::config::{ConfigError, GatewayConfig, StoreBackend};
use super::gateway::{GatewayClient, GatewayError};
use super::remote::{RemoteRepo, RemoteRepoError};
use super::schema::{Record, SchemaError, SyncTable};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record shape error: {0}")]
    Shape(String),
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },
}

impl From<RemoteRepoError> for StoreError {
    fn from(e: RemoteRepoError) -> Self {
        match e {
            RemoteRepoError::Schema(e) => StoreError::Schema(e),
            RemoteRepoError::Gateway(e) => StoreError::Gateway(e),
        }
    }
}

/// Uniform CRUD contract over a backing store.
///
/// Records are flat maps keyed by local (camelCase) field names; each
/// adapter owns whatever translation its backend needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &'static str;

    async fn fetch_all(&self, table: SyncTable) -> Result<Vec<Record>, StoreError>;

    async fn find_by_id(&self, table: SyncTable, id: &str)
    -> Result<Option<Record>, StoreError>;

    async fn insert(&self, table: SyncTable, record: &Record) -> Result<(), StoreError>;

    async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError>;

    async fn delete(&self, table: SyncTable, id: &str) -> Result<(), StoreError>;
}

impl std::fmt::Debug for dyn RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("name", &self.name())
            .finish()
    }
}

/// Extract the primary key of a record.
pub(crate) fn record_id<'r>(table: SyncTable, record: &'r Record) -> Result<&'r str, StoreError> {
    let pk = table.schema().primary_key;
    record
        .get(pk)
        .and_then(|v| v.as_str())
        .ok_or(StoreError::Schema(SchemaError::MissingPrimaryKey(pk)))
}

/// Build the store the application binds to, per configuration.
///
/// The choice happens exactly once; everything downstream receives the
/// interface type.
pub fn select_store(
    backend: StoreBackend,
    db: &db::DBService,
    gateway: Option<GatewayConfig>,
) -> Result<Arc<dyn RecordStore>, ConfigError> {
    match backend {
        StoreBackend::Local => Ok(Arc::new(SqliteStore::new(db.pool.clone()))),
        StoreBackend::SqlServer => {
            let config = gateway.ok_or(ConfigError::MissingVar("API_QUERY_URL"))?;
            let client = GatewayClient::new(config)
                .map_err(|e| ConfigError::InvalidVar("API_QUERY_URL", e.to_string()))?;
            Ok(Arc::new(GatewayStore::new(RemoteRepo::new(Arc::new(
                client,
            )))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_store_local() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db = db::DBService::new(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let store = select_store(StoreBackend::Local, &db, None).unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[tokio::test]
    async fn test_select_store_sql_server_requires_gateway_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db = db::DBService::new(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let err = select_store(StoreBackend::SqlServer, &db, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("API_QUERY_URL")));

        let config = GatewayConfig::new("https://gw.example.com", "key");
        let store = select_store(StoreBackend::SqlServer, &db, Some(config)).unwrap();
        assert_eq!(store.name(), "gateway");
    }
}

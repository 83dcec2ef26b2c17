//! In-memory store used by the sync engine tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{RecordStore, StoreError, record_id};
use crate::services::gateway::GatewayError;
use crate::services::schema::{Record, SyncTable};

/// A store backed by plain maps. Rows are keyed by primary key and kept
/// in key order so fetches are deterministic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<SyncTable, BTreeMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing the trait. Test setup only.
    pub fn seed(&self, table: SyncTable, rows: impl IntoIterator<Item = Record>) {
        let mut tables = self.lock();
        let entries = tables.entry(table).or_default();
        for row in rows {
            if let Some(id) = row
                .get(table.schema().primary_key)
                .and_then(|v| v.as_str())
            {
                entries.insert(id.to_string(), row);
            }
        }
    }

    pub fn len(&self, table: SyncTable) -> usize {
        self.lock().get(&table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: SyncTable) -> bool {
        self.len(table) == 0
    }

    pub fn get(&self, table: SyncTable, id: &str) -> Option<Record> {
        self.lock().get(&table).and_then(|t| t.get(id)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SyncTable, BTreeMap<String, Record>>> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_all(&self, table: SyncTable) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .lock()
            .get(&table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        table: SyncTable,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        Ok(self.get(table, id))
    }

    async fn insert(&self, table: SyncTable, record: &Record) -> Result<(), StoreError> {
        let id = record_id(table, record)?.to_string();
        self.lock()
            .entry(table)
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let entries = tables.entry(table).or_default();
        if !entries.contains_key(id) {
            return Err(StoreError::NotFound {
                table: table.as_str(),
                id: id.to_string(),
            });
        }
        entries.insert(id.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, table: SyncTable, id: &str) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let removed = tables.entry(table).or_default().remove(id);
        if removed.is_none() {
            return Err(StoreError::NotFound {
                table: table.as_str(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// A store wrapper that fails writes to configured rows.
///
/// Used to verify that one failing row does not abort the rest of a
/// sync pass. Reads always pass through.
pub struct FlakyStore<S> {
    inner: S,
    broken: HashSet<(SyncTable, String)>,
}

impl<S: RecordStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            broken: HashSet::new(),
        }
    }

    /// Mark a row whose writes will fail.
    pub fn break_row(mut self, table: SyncTable, id: &str) -> Self {
        self.broken.insert((table, id.to_string()));
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, table: SyncTable, id: &str) -> Result<(), StoreError> {
        if self.broken.contains(&(table, id.to_string())) {
            return Err(StoreError::Gateway(GatewayError::Gateway(format!(
                "simulated write failure for {}/{id}",
                table.as_str()
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FlakyStore<S> {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch_all(&self, table: SyncTable) -> Result<Vec<Record>, StoreError> {
        self.inner.fetch_all(table).await
    }

    async fn find_by_id(
        &self,
        table: SyncTable,
        id: &str,
    ) -> Result<Option<Record>, StoreError> {
        self.inner.find_by_id(table, id).await
    }

    async fn insert(&self, table: SyncTable, record: &Record) -> Result<(), StoreError> {
        self.check(table, record_id(table, record)?)?;
        self.inner.insert(table, record).await
    }

    async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        self.check(table, id)?;
        self.inner.update(table, id, record).await
    }

    async fn delete(&self, table: SyncTable, id: &str) -> Result<(), StoreError> {
        self.check(table, id)?;
        self.inner.delete(table, id).await
    }
}

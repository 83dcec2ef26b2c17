//! Per-table CRUD over the SQL gateway.
//!
//! Statements are synthesized from the fields actually present in the
//! input record, but every field name is validated against the table
//! schema before any SQL text is built: an unknown field is a local
//! `SchemaError` and never reaches the wire. Identifiers in the
//! generated SQL come exclusively from the static schema registry;
//! values are always bound as named parameters.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::gateway::{GatewayClient, GatewayError};
use super::schema::{self, Record, SchemaError, SyncTable};

#[derive(Debug, Error)]
pub enum RemoteRepoError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// CRUD shim for the remote store.
///
/// All rows handed back are translated to local field names; callers
/// never see remote-native column names.
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    client: Arc<GatewayClient>,
}

impl RemoteRepo {
    pub fn new(client: Arc<GatewayClient>) -> Self {
        Self { client }
    }

    pub async fn find_by_id(
        &self,
        table: SyncTable,
        id: &str,
    ) -> Result<Option<Record>, RemoteRepoError> {
        let schema = table.schema();
        let pk = schema.remote_primary_key();
        let sql = format!(
            "SELECT * FROM {} WHERE {pk} = @{pk}",
            schema.remote_table
        );
        let mut params = Record::new();
        params.insert(pk.to_string(), Value::String(id.to_string()));

        let result = self.client.execute_with_retry(&sql, Some(&params)).await?;
        result
            .recordset
            .first()
            .map(|row| schema::from_remote_columns(table, row))
            .transpose()
            .map_err(Into::into)
    }

    /// Fetch rows, optionally filtered.
    ///
    /// Filter keys must be filterable columns of the table (the primary
    /// key and foreign keys); an unsupported key is rejected rather than
    /// silently ignored.
    pub async fn list(
        &self,
        table: SyncTable,
        filter: &[(&str, Value)],
    ) -> Result<Vec<Record>, RemoteRepoError> {
        let (sql, params) = build_select(table, filter)?;
        let result = self.client.execute_with_retry(&sql, params.as_ref()).await?;

        let mut rows = Vec::with_capacity(result.recordset.len());
        for row in &result.recordset {
            rows.push(schema::from_remote_columns(table, row)?);
        }
        Ok(rows)
    }

    /// Insert a row, guarded by an existence check so the statement is
    /// safe to retry. Returns the inserted row, or `None` when a row
    /// with this id already existed.
    pub async fn insert(
        &self,
        table: SyncTable,
        record: &Record,
    ) -> Result<Option<Record>, RemoteRepoError> {
        let (sql, params) = build_insert(table, record)?;
        let result = self.client.execute_with_retry(&sql, Some(&params)).await?;
        result
            .recordset
            .first()
            .map(|row| schema::from_remote_columns(table, row))
            .transpose()
            .map_err(Into::into)
    }

    /// Update the fields present in `record` for the row with this id.
    pub async fn update(
        &self,
        table: SyncTable,
        id: &str,
        record: &Record,
    ) -> Result<Option<Record>, RemoteRepoError> {
        let (sql, params) = build_update(table, id, record)?;
        // Not guarded by an existence check, so not retried: re-running a
        // lost-response update is not distinguishable from a conflict.
        let result = self.client.execute(&sql, Some(&params)).await?;
        result
            .recordset
            .first()
            .map(|row| schema::from_remote_columns(table, row))
            .transpose()
            .map_err(Into::into)
    }

    pub async fn delete(&self, table: SyncTable, id: &str) -> Result<u64, RemoteRepoError> {
        let schema = table.schema();
        let pk = schema.remote_primary_key();
        let sql = format!("DELETE FROM {} WHERE {pk} = @{pk}", schema.remote_table);
        let mut params = Record::new();
        params.insert(pk.to_string(), Value::String(id.to_string()));

        let result = self.client.execute(&sql, Some(&params)).await?;
        Ok(result.rows_affected.iter().sum::<i64>().max(0) as u64)
    }
}

/// Build a filtered SELECT. Pure; see tests.
fn build_select(
    table: SyncTable,
    filter: &[(&str, Value)],
) -> Result<(String, Option<Record>), SchemaError> {
    let schema = table.schema();
    let mut sql = format!("SELECT * FROM {}", schema.remote_table);

    if filter.is_empty() {
        return Ok((sql, None));
    }

    let mut clauses = Vec::with_capacity(filter.len());
    let mut params = Record::new();
    for (field, value) in filter {
        let col = schema
            .column_for_field(field)
            .filter(|c| c.filterable)
            .ok_or_else(|| SchemaError::UnsupportedFilter {
                table: schema.local_table,
                field: field.to_string(),
            })?;
        clauses.push(format!("{} = @{}", col.remote, col.remote));
        params.insert(col.remote.to_string(), value.clone());
    }
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));

    Ok((sql, Some(params)))
}

/// Build an existence-guarded INSERT from the fields present in the
/// record. Validation happens in `to_remote_columns` before any SQL
/// text exists.
fn build_insert(table: SyncTable, record: &Record) -> Result<(String, Record), SchemaError> {
    let schema = table.schema();
    let params = schema::to_remote_columns(table, record)?;
    let pk = schema.remote_primary_key();
    if !params.contains_key(pk) {
        return Err(SchemaError::MissingPrimaryKey(schema.primary_key));
    }

    let columns: Vec<&str> = params.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = columns.iter().map(|c| format!("@{c}")).collect();

    let sql = format!(
        "IF NOT EXISTS (SELECT 1 FROM {table} WHERE {pk} = @{pk}) \
         INSERT INTO {table} ({columns}) OUTPUT INSERTED.* VALUES ({values})",
        table = schema.remote_table,
        columns = columns.join(", "),
        values = placeholders.join(", "),
    );

    Ok((sql, params))
}

/// Build an UPDATE from the fields present in the record; the primary
/// key is never part of the SET list.
fn build_update(
    table: SyncTable,
    id: &str,
    record: &Record,
) -> Result<(String, Record), SchemaError> {
    let schema = table.schema();
    let mut params = schema::to_remote_columns(table, record)?;
    let pk = schema.remote_primary_key();
    // With `preserve_order`, `Map::remove` is a swap-remove that would
    // reorder the remaining fields; `shift_remove` keeps record order.
    params.shift_remove(pk);

    let assignments: Vec<String> = params.keys().map(|c| format!("{c} = @{c}")).collect();
    params.insert(pk.to_string(), Value::String(id.to_string()));

    let sql = format!(
        "UPDATE {table} SET {assignments} OUTPUT INSERTED.* WHERE {pk} = @{pk}",
        table = schema.remote_table,
        assignments = assignments.join(", "),
    );

    Ok((sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_insert_maps_columns_and_binds_values() {
        let rec = record(&[
            ("id", json!("t-1")),
            ("title", json!("Ship it")),
            ("statusId", json!("s-1")),
            ("projectId", json!("p-1")),
        ]);
        let (sql, params) = build_insert(SyncTable::Tasks, &rec).unwrap();

        assert_eq!(
            sql,
            "IF NOT EXISTS (SELECT 1 FROM tasks WHERE id = @id) \
             INSERT INTO tasks (id, title, status_id, project_id) \
             OUTPUT INSERTED.* VALUES (@id, @title, @status_id, @project_id)"
        );
        assert_eq!(params["status_id"], json!("s-1"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_build_insert_rejects_unknown_field_before_sql() {
        let rec = record(&[
            ("id", json!("t-1")),
            ("title'; DROP TABLE tasks; --", json!("x")),
        ]);
        let err = build_insert(SyncTable::Tasks, &rec).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_build_insert_requires_primary_key() {
        let rec = record(&[("title", json!("No id"))]);
        let err = build_insert(SyncTable::Tasks, &rec).unwrap_err();
        assert!(matches!(err, SchemaError::MissingPrimaryKey("id")));
    }

    #[test]
    fn test_build_update_excludes_pk_from_set_list() {
        let rec = record(&[
            ("id", json!("u-1")),
            ("name", json!("Alice")),
            ("role", json!("PM")),
        ]);
        let (sql, params) = build_update(SyncTable::Users, "u-1", &rec).unwrap();

        assert_eq!(
            sql,
            "UPDATE app_users SET full_name = @full_name, role = @role \
             OUTPUT INSERTED.* WHERE id = @id"
        );
        assert_eq!(params["id"], json!("u-1"));
        assert_eq!(params["full_name"], json!("Alice"));
    }

    #[test]
    fn test_build_select_with_supported_filter() {
        let (sql, params) =
            build_select(SyncTable::Tasks, &[("projectId", json!("p-1"))]).unwrap();
        assert_eq!(sql, "SELECT * FROM tasks WHERE project_id = @project_id");
        assert_eq!(params.unwrap()["project_id"], json!("p-1"));
    }

    #[test]
    fn test_build_select_unfiltered_has_no_params() {
        let (sql, params) = build_select(SyncTable::Users, &[]).unwrap();
        assert_eq!(sql, "SELECT * FROM app_users");
        assert!(params.is_none());
    }

    #[test]
    fn test_build_select_rejects_unsupported_filter() {
        // `title` exists but is not a filterable column
        let err = build_select(SyncTable::Tasks, &[("title", json!("x"))]).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedFilter { field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_insert_unknown_field_never_reaches_network() {
        use crate::services::config::GatewayConfig;

        // Unroutable address: if validation let the statement through,
        // this would surface as a transport error instead of SchemaError.
        let client = GatewayClient::new(GatewayConfig::new("http://127.0.0.1:1", "test-key"))
            .expect("client");
        let repo = RemoteRepo::new(Arc::new(client));

        let rec = record(&[("id", json!("u-1")), ("shoeSize", json!(43))]);
        let err = repo.insert(SyncTable::Users, &rec).await.unwrap_err();
        assert!(matches!(
            err,
            RemoteRepoError::Schema(SchemaError::UnknownField { field, .. }) if field == "shoeSize"
        ));
    }
}

//! Per-table schema registry and column mapping.
//!
//! The embedded store and the remote SQL Server schema name their columns
//! differently: local records use the application's camelCase field names
//! (`ownerId`), the remote store uses snake_case plus a few irregular
//! renames (`name` -> `full_name`, `order` -> `sort_order`). The mapping
//! is a fixed per-table dictionary and a total bijection: every field maps
//! to exactly one remote column and back, and a field absent from the
//! dictionary is rejected rather than passed through, so naming drift
//! between the two schemas surfaces at sync time instead of as a SQL
//! error at query time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A flat record keyed by local (camelCase) field names or, after
/// translation, remote column names.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("unknown field '{field}' for table {table}")]
    UnknownField { table: &'static str, field: String },
    #[error("unknown remote column '{column}' for table {table}")]
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    #[error("filter key '{field}' is not supported for table {table}")]
    UnsupportedFilter { table: &'static str, field: String },
    #[error("invalid timestamp value '{value}' in field '{field}'")]
    InvalidTimestamp { field: String, value: String },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("record has no '{0}' key")]
    MissingPrimaryKey(&'static str),
}

/// Value kind of a column, used for timestamp normalization and
/// comparison semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Float,
    Timestamp,
}

/// One column of a table: local field name, remote column name, kind.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub field: &'static str,
    pub remote: &'static str,
    pub kind: ValueKind,
    /// Whether this column may be used as a `list` filter key.
    pub filterable: bool,
}

impl ColumnDef {
    const fn new(field: &'static str, remote: &'static str, kind: ValueKind) -> Self {
        Self {
            field,
            remote,
            kind,
            filterable: false,
        }
    }

    const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }
}

/// Static description of one synchronized table.
#[derive(Debug)]
pub struct TableSchema {
    /// Table name in the embedded store.
    pub local_table: &'static str,
    /// Table name in the remote store.
    pub remote_table: &'static str,
    /// Primary key field name (local convention).
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    pub fn column_for_field(&self, field: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn column_for_remote(&self, remote: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.remote == remote)
    }

    /// The remote column name of the primary key.
    pub fn remote_primary_key(&self) -> &'static str {
        self.column_for_field(self.primary_key)
            .map(|c| c.remote)
            .unwrap_or(self.primary_key)
    }
}

const USERS: TableSchema = TableSchema {
    local_table: "users",
    remote_table: "app_users",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("email", "email", ValueKind::Text).filterable(),
        ColumnDef::new("username", "username", ValueKind::Text),
        ColumnDef::new("name", "full_name", ValueKind::Text),
        ColumnDef::new("password", "password_hash", ValueKind::Text),
        ColumnDef::new("role", "role", ValueKind::Text),
        ColumnDef::new("avatarUrl", "avatar_url", ValueKind::Text),
        ColumnDef::new("createdAt", "created_at", ValueKind::Timestamp),
        ColumnDef::new("updatedAt", "updated_at", ValueKind::Timestamp),
    ],
};

const PROJECTS: TableSchema = TableSchema {
    local_table: "projects",
    remote_table: "projects",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("name", "name", ValueKind::Text),
        ColumnDef::new("description", "description", ValueKind::Text),
        ColumnDef::new("startDate", "start_date", ValueKind::Timestamp),
        ColumnDef::new("endDate", "end_date", ValueKind::Timestamp),
        ColumnDef::new("priority", "priority", ValueKind::Text),
        ColumnDef::new("ownerId", "owner_id", ValueKind::Text).filterable(),
        ColumnDef::new("createdAt", "created_at", ValueKind::Timestamp),
        ColumnDef::new("updatedAt", "updated_at", ValueKind::Timestamp),
    ],
};

const TASK_STATUSES: TableSchema = TableSchema {
    local_table: "task_statuses",
    remote_table: "task_statuses",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("name", "name", ValueKind::Text),
        // ORDER is reserved in T-SQL; the remote schema renames it.
        ColumnDef::new("order", "sort_order", ValueKind::Integer),
        ColumnDef::new("projectId", "project_id", ValueKind::Text).filterable(),
    ],
};

const TASKS: TableSchema = TableSchema {
    local_table: "tasks",
    remote_table: "tasks",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("title", "title", ValueKind::Text),
        ColumnDef::new("description", "description", ValueKind::Text),
        ColumnDef::new("priority", "priority", ValueKind::Text),
        ColumnDef::new("statusId", "status_id", ValueKind::Text).filterable(),
        ColumnDef::new("projectId", "project_id", ValueKind::Text).filterable(),
        ColumnDef::new("assigneeId", "assignee_id", ValueKind::Text).filterable(),
        ColumnDef::new("dueDate", "due_date", ValueKind::Timestamp),
        ColumnDef::new("estimatedHours", "estimated_hours", ValueKind::Float),
        ColumnDef::new("actualHours", "actual_hours", ValueKind::Float),
        ColumnDef::new("progress", "progress", ValueKind::Integer),
        ColumnDef::new("createdAt", "created_at", ValueKind::Timestamp),
        ColumnDef::new("updatedAt", "updated_at", ValueKind::Timestamp),
    ],
};

const COMMENTS: TableSchema = TableSchema {
    local_table: "comments",
    remote_table: "comments",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("taskId", "task_id", ValueKind::Text).filterable(),
        ColumnDef::new("authorId", "author_id", ValueKind::Text).filterable(),
        ColumnDef::new("content", "content", ValueKind::Text),
        ColumnDef::new("createdAt", "created_at", ValueKind::Timestamp),
        ColumnDef::new("updatedAt", "updated_at", ValueKind::Timestamp),
    ],
};

const ATTACHMENTS: TableSchema = TableSchema {
    local_table: "attachments",
    remote_table: "attachments",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("taskId", "task_id", ValueKind::Text).filterable(),
        ColumnDef::new("fileName", "file_name", ValueKind::Text),
        ColumnDef::new("filePath", "file_path", ValueKind::Text),
        ColumnDef::new("fileSize", "file_size", ValueKind::Integer),
        ColumnDef::new("mimeType", "mime_type", ValueKind::Text),
        ColumnDef::new("uploadedById", "uploaded_by_id", ValueKind::Text).filterable(),
        ColumnDef::new("createdAt", "created_at", ValueKind::Timestamp),
    ],
};

const PROJECT_MEMBERS: TableSchema = TableSchema {
    local_table: "project_members",
    remote_table: "project_members",
    primary_key: "id",
    columns: &[
        ColumnDef::new("id", "id", ValueKind::Text).filterable(),
        ColumnDef::new("projectId", "project_id", ValueKind::Text).filterable(),
        ColumnDef::new("userId", "user_id", ValueKind::Text).filterable(),
        ColumnDef::new("role", "member_role", ValueKind::Text),
        ColumnDef::new("joinedAt", "joined_at", ValueKind::Timestamp),
        ColumnDef::new("addedById", "added_by_id", ValueKind::Text),
    ],
};

/// The synchronized tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Users,
    Projects,
    TaskStatuses,
    Tasks,
    Comments,
    Attachments,
    ProjectMembers,
}

impl SyncTable {
    /// Foreign-key dependency order. Tasks reference statuses and
    /// projects, so parents must always be synced first.
    pub const DEPENDENCY_ORDER: [SyncTable; 7] = [
        SyncTable::Users,
        SyncTable::Projects,
        SyncTable::TaskStatuses,
        SyncTable::Tasks,
        SyncTable::Comments,
        SyncTable::Attachments,
        SyncTable::ProjectMembers,
    ];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            SyncTable::Users => &USERS,
            SyncTable::Projects => &PROJECTS,
            SyncTable::TaskStatuses => &TASK_STATUSES,
            SyncTable::Tasks => &TASKS,
            SyncTable::Comments => &COMMENTS,
            SyncTable::Attachments => &ATTACHMENTS,
            SyncTable::ProjectMembers => &PROJECT_MEMBERS,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.schema().local_table
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncTable::DEPENDENCY_ORDER
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownTable(s.to_string()))
    }
}

/// Normalize a timestamp string to RFC 3339 with millisecond precision.
///
/// Accepts RFC 3339 and the space-separated driver form the remote store
/// emits (`2026-08-26 12:34:56.789`, implicitly UTC).
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(
            Utc.from_utc_datetime(&naive)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    None
}

fn normalize_value(col: &ColumnDef, value: Value) -> Result<Value, SchemaError> {
    match (&value, col.kind) {
        (Value::String(s), ValueKind::Timestamp) => normalize_timestamp(s)
            .map(Value::String)
            .ok_or_else(|| SchemaError::InvalidTimestamp {
                field: col.field.to_string(),
                value: s.clone(),
            }),
        _ => Ok(value),
    }
}

/// Translate a local-keyed record to remote column names.
///
/// Every key must be a known field of the table; timestamps are
/// normalized on the way out.
pub fn to_remote_columns(table: SyncTable, record: &Record) -> Result<Record, SchemaError> {
    let schema = table.schema();
    let mut out = Record::new();
    for (field, value) in record {
        let col =
            schema
                .column_for_field(field)
                .ok_or_else(|| SchemaError::UnknownField {
                    table: schema.local_table,
                    field: field.clone(),
                })?;
        out.insert(col.remote.to_string(), normalize_value(col, value.clone())?);
    }
    Ok(out)
}

/// Translate a remote-keyed record back to local field names.
///
/// Timestamps are normalized on the way in as well, rather than trusting
/// whatever text form the remote driver produced.
pub fn from_remote_columns(table: SyncTable, record: &Record) -> Result<Record, SchemaError> {
    let schema = table.schema();
    let mut out = Record::new();
    for (column, value) in record {
        let col =
            schema
                .column_for_remote(column)
                .ok_or_else(|| SchemaError::UnknownColumn {
                    table: schema.local_table,
                    column: column.clone(),
                })?;
        out.insert(col.field.to_string(), normalize_value(col, value.clone())?);
    }
    Ok(out)
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
    fn test_mapping_is_total_bijection() {
        // Every local field maps to exactly one remote column and back,
        // with no duplicates on either side.
        for table in SyncTable::DEPENDENCY_ORDER {
            let schema = table.schema();
            for col in schema.columns {
                assert_eq!(
                    schema.column_for_field(col.field).unwrap().remote,
                    col.remote
                );
                assert_eq!(
                    schema.column_for_remote(col.remote).unwrap().field,
                    col.field
                );
            }
            let mut remotes: Vec<_> = schema.columns.iter().map(|c| c.remote).collect();
            remotes.sort_unstable();
            remotes.dedup();
            assert_eq!(remotes.len(), schema.columns.len());
        }
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let rec = record(&[
            ("id", json!("u-1")),
            ("email", json!("a@example.com")),
            ("username", json!("alice")),
            ("name", json!("Alice")),
            ("password", json!("hash")),
            ("role", json!("MEMBER")),
            ("avatarUrl", Value::Null),
            ("createdAt", json!("2026-08-26T10:00:00.123Z")),
            ("updatedAt", json!("2026-08-26T10:00:00.123Z")),
        ]);

        let remote = to_remote_columns(SyncTable::Users, &rec).unwrap();
        assert!(remote.contains_key("full_name"));
        assert!(remote.contains_key("password_hash"));
        assert!(!remote.contains_key("name"));

        let back = from_remote_columns(SyncTable::Users, &remote).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_round_trip_all_tables() {
        for table in SyncTable::DEPENDENCY_ORDER {
            let rec: Record = table
                .schema()
                .columns
                .iter()
                .map(|c| {
                    let v = match c.kind {
                        ValueKind::Text => json!("x"),
                        ValueKind::Integer => json!(3),
                        ValueKind::Float => json!(1.5),
                        ValueKind::Timestamp => json!("2026-01-02T03:04:05.678Z"),
                    };
                    (c.field.to_string(), v)
                })
                .collect();

            let back =
                from_remote_columns(table, &to_remote_columns(table, &rec).unwrap()).unwrap();
            assert_eq!(back, rec, "round trip failed for {table}");
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let rec = record(&[("id", json!("u-1")), ("favouriteColor", json!("teal"))]);
        let err = to_remote_columns(SyncTable::Users, &rec).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { field, .. } if field == "favouriteColor"));
    }

    #[test]
    fn test_unknown_remote_column_rejected() {
        let rec = record(&[("legacy_flag", json!(1))]);
        let err = from_remote_columns(SyncTable::Tasks, &rec).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
    }

    #[test]
    fn test_timestamp_normalization() {
        // Driver space-separated form, second precision
        assert_eq!(
            normalize_timestamp("2026-08-26 12:34:56").as_deref(),
            Some("2026-08-26T12:34:56.000Z")
        );
        // RFC 3339 with offset
        assert_eq!(
            normalize_timestamp("2026-08-26T14:34:56.789+02:00").as_deref(),
            Some("2026-08-26T12:34:56.789Z")
        );
        // Sub-millisecond precision is truncated to milliseconds
        assert_eq!(
            normalize_timestamp("2026-08-26T12:34:56.789999Z").as_deref(),
            Some("2026-08-26T12:34:56.789Z")
        );
        assert!(normalize_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_invalid_timestamp_is_schema_error() {
        let rec = record(&[("createdAt", json!("not-a-date"))]);
        let err = to_remote_columns(SyncTable::Users, &rec).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_dependency_order_parents_first() {
        let order = SyncTable::DEPENDENCY_ORDER;
        let pos = |t: SyncTable| order.iter().position(|&x| x == t).unwrap();
        assert!(pos(SyncTable::Users) < pos(SyncTable::Projects));
        assert!(pos(SyncTable::Projects) < pos(SyncTable::TaskStatuses));
        assert!(pos(SyncTable::TaskStatuses) < pos(SyncTable::Tasks));
        assert!(pos(SyncTable::Tasks) < pos(SyncTable::Comments));
        assert!(pos(SyncTable::Tasks) < pos(SyncTable::Attachments));
    }

    #[test]
    fn test_table_from_str() {
        assert_eq!("tasks".parse::<SyncTable>().unwrap(), SyncTable::Tasks);
        assert!("widgets".parse::<SyncTable>().is_err());
    }
}

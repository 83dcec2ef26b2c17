//! Table-by-table synchronization between two record stores.
//!
//! Tables are processed in dependency order so parent rows always land
//! before the rows that reference them. Per-row failures are recorded
//! and skipped; a sync pass never aborts because one row failed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::schema::{Record, SyncTable, ValueKind, normalize_timestamp};
use super::store::RecordStore;

/// Which way rows flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local rows flow to the remote store.
    Push,
    /// Remote rows flow to the local store.
    Pull,
    /// A full pull pass followed by a full push pass.
    Both,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Push => write!(f, "push"),
            SyncDirection::Pull => write!(f, "pull"),
            SyncDirection::Both => write!(f, "both"),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(SyncDirection::Push),
            "pull" => Ok(SyncDirection::Pull),
            "both" => Ok(SyncDirection::Both),
            other => Err(format!("unknown sync direction: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub direction: SyncDirection,
    /// Tables to sync. Empty means all tables.
    pub tables: Vec<SyncTable>,
    /// Report what would change without writing anything.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            tables: Vec::new(),
            dry_run: false,
        }
    }
}

/// Per-table outcome counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableReport {
    pub name: &'static str,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl TableReport {
    fn merge(&mut self, other: &TableReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub success: bool,
    /// RFC 3339 completion time.
    pub timestamp: String,
    pub direction: SyncDirection,
    pub tables: Vec<TableReport>,
    /// One entry per failed row, `table/id: message`.
    pub errors: Vec<String>,
}

/// Drives sync passes between an injected pair of stores.
pub struct SyncEngine {
    local: Arc<dyn RecordStore>,
    remote: Arc<dyn RecordStore>,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(local: Arc<dyn RecordStore>, remote: Arc<dyn RecordStore>) -> Self {
        Self {
            local,
            remote,
            cancel: CancellationToken::new(),
        }
    }

    /// Token callers can use to stop an in-flight run. Cancellation is
    /// observed between tables and between rows; the row in flight
    /// completes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one sync pass.
    pub async fn sync(&self, options: &SyncOptions) -> SyncResult {
        let tables: Vec<SyncTable> = if options.tables.is_empty() {
            SyncTable::DEPENDENCY_ORDER.to_vec()
        } else {
            // Whatever subset the caller picked still runs in
            // dependency order.
            SyncTable::DEPENDENCY_ORDER
                .into_iter()
                .filter(|t| options.tables.contains(t))
                .collect()
        };

        info!(
            direction = %options.direction,
            tables = tables.len(),
            dry_run = options.dry_run,
            "sync started"
        );

        let mut reports: Vec<TableReport> = Vec::with_capacity(tables.len());
        let mut errors: Vec<String> = Vec::new();
        let mut cancelled = false;

        match options.direction {
            SyncDirection::Pull => {
                self.run_pass(
                    &tables,
                    &*self.remote,
                    &*self.local,
                    options.dry_run,
                    &mut reports,
                    &mut errors,
                    &mut cancelled,
                )
                .await;
            }
            SyncDirection::Push => {
                self.run_pass(
                    &tables,
                    &*self.local,
                    &*self.remote,
                    options.dry_run,
                    &mut reports,
                    &mut errors,
                    &mut cancelled,
                )
                .await;
            }
            SyncDirection::Both => {
                self.run_pass(
                    &tables,
                    &*self.remote,
                    &*self.local,
                    options.dry_run,
                    &mut reports,
                    &mut errors,
                    &mut cancelled,
                )
                .await;
                if !cancelled {
                    let mut push_reports = Vec::with_capacity(tables.len());
                    self.run_pass(
                        &tables,
                        &*self.local,
                        &*self.remote,
                        options.dry_run,
                        &mut push_reports,
                        &mut errors,
                        &mut cancelled,
                    )
                    .await;
                    for push in &push_reports {
                        if let Some(report) =
                            reports.iter_mut().find(|r| r.name == push.name)
                        {
                            report.merge(push);
                        } else {
                            reports.push(push.clone());
                        }
                    }
                }
            }
        }

        if cancelled {
            errors.push("sync cancelled".to_string());
        }

        let success = !cancelled && errors.is_empty();
        let result = SyncResult {
            success,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            direction: options.direction,
            tables: reports,
            errors,
        };

        info!(
            success = result.success,
            errors = result.errors.len(),
            "sync finished"
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pass(
        &self,
        tables: &[SyncTable],
        src: &dyn RecordStore,
        dst: &dyn RecordStore,
        dry_run: bool,
        reports: &mut Vec<TableReport>,
        errors: &mut Vec<String>,
        cancelled: &mut bool,
    ) {
        for &table in tables {
            if self.cancel.is_cancelled() {
                *cancelled = true;
                return;
            }
            let report = self
                .sync_table(table, src, dst, dry_run, errors, cancelled)
                .await;
            reports.push(report);
            if *cancelled {
                return;
            }
        }
    }

    async fn sync_table(
        &self,
        table: SyncTable,
        src: &dyn RecordStore,
        dst: &dyn RecordStore,
        dry_run: bool,
        errors: &mut Vec<String>,
        cancelled: &mut bool,
    ) -> TableReport {
        let mut report = TableReport {
            name: table.as_str(),
            ..TableReport::default()
        };

        let rows = match src.fetch_all(table).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table = table.as_str(), error = %e, "fetch failed, table skipped");
                errors.push(format!("{}: {e}", table.as_str()));
                report.errors += 1;
                return report;
            }
        };

        info!(
            table = table.as_str(),
            rows = rows.len(),
            source = src.name(),
            target = dst.name(),
            "syncing table"
        );

        for row in &rows {
            if self.cancel.is_cancelled() {
                *cancelled = true;
                return report;
            }
            let pk = table.schema().primary_key;
            let id = match row.get(pk).and_then(|v| v.as_str()) {
                Some(id) => id,
                None => {
                    warn!(table = table.as_str(), "row without primary key skipped");
                    errors.push(format!("{}: row without primary key", table.as_str()));
                    report.errors += 1;
                    continue;
                }
            };

            match self.sync_row(table, id, row, dst, dry_run).await {
                Ok(RowOutcome::Inserted) => report.inserted += 1,
                Ok(RowOutcome::Updated) => report.updated += 1,
                Ok(RowOutcome::Unchanged) => report.skipped += 1,
                Err(e) => {
                    warn!(table = table.as_str(), id, error = %e, "row sync failed");
                    errors.push(format!("{}/{id}: {e}", table.as_str()));
                    report.errors += 1;
                }
            }
        }

        report
    }

    async fn sync_row(
        &self,
        table: SyncTable,
        id: &str,
        row: &Record,
        dst: &dyn RecordStore,
        dry_run: bool,
    ) -> Result<RowOutcome, super::store::StoreError> {
        match dst.find_by_id(table, id).await? {
            None => {
                if !dry_run {
                    dst.insert(table, row).await?;
                }
                Ok(RowOutcome::Inserted)
            }
            Some(existing) if records_differ(table, row, &existing) => {
                if !dry_run {
                    dst.update(table, id, row).await?;
                }
                Ok(RowOutcome::Updated)
            }
            Some(_) => Ok(RowOutcome::Unchanged),
        }
    }
}

enum RowOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Compare two records field by field over the table's tracked columns.
///
/// Values are normalized before comparison so representation noise is
/// not reported as a difference: timestamps compare on the instant, and
/// numbers compare on value regardless of integer/float encoding. An
/// absent field and an explicit null are the same thing.
pub fn records_differ(table: SyncTable, a: &Record, b: &Record) -> bool {
    let schema = table.schema();
    schema.columns.iter().any(|col| {
        if col.field == schema.primary_key {
            return false;
        }
        normalized(col.kind, a.get(col.field)) != normalized(col.kind, b.get(col.field))
    })
}

fn normalized(kind: ValueKind, value: Option<&serde_json::Value>) -> Option<String> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    match kind {
        ValueKind::Timestamp => value
            .as_str()
            .and_then(normalize_timestamp)
            .or_else(|| Some(value.to_string())),
        ValueKind::Integer | ValueKind::Float => {
            value.as_f64().map(|n| n.to_string()).or_else(|| Some(value.to_string()))
        }
        ValueKind::Text => Some(
            value
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| value.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(pairs: &[(&str, serde_json::Value)]) -> Record {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.insert((*k).to_string(), v.clone());
        }
        r
    }

    #[test]
    fn test_records_differ_ignores_primary_key() {
        let a = record(&[("id", json!("a")), ("email", json!("x@example.com"))]);
        let b = record(&[("id", json!("b")), ("email", json!("x@example.com"))]);
        assert!(!records_differ(SyncTable::Users, &a, &b));
    }

    #[test]
    fn test_records_differ_detects_changed_field() {
        let a = record(&[("id", json!("a")), ("email", json!("x@example.com"))]);
        let b = record(&[("id", json!("a")), ("email", json!("y@example.com"))]);
        assert!(records_differ(SyncTable::Users, &a, &b));
    }

    #[test]
    fn test_records_differ_timestamp_representation() {
        let a = record(&[
            ("id", json!("a")),
            ("createdAt", json!("2026-01-02T03:04:05.000Z")),
        ]);
        let b = record(&[
            ("id", json!("a")),
            ("createdAt", json!("2026-01-02 03:04:05")),
        ]);
        assert!(!records_differ(SyncTable::Users, &a, &b));
    }

    #[test]
    fn test_records_differ_numeric_representation() {
        let a = record(&[("id", json!("s")), ("order", json!(1))]);
        let b = record(&[("id", json!("s")), ("order", json!(1.0))]);
        assert!(!records_differ(SyncTable::TaskStatuses, &a, &b));
    }

    #[test]
    fn test_records_differ_absent_equals_null() {
        let a = record(&[("id", json!("t")), ("description", json!(null))]);
        let b = record(&[("id", json!("t"))]);
        assert!(!records_differ(SyncTable::Tasks, &a, &b));
    }

    #[test]
    fn test_direction_round_trip() {
        for d in [SyncDirection::Push, SyncDirection::Pull, SyncDirection::Both] {
            assert_eq!(d.to_string().parse::<SyncDirection>().unwrap(), d);
        }
    }
}

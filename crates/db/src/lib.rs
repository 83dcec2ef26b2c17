use std::{path::Path, str::FromStr, time::Duration};

use sqlx::{
    Error, Pool, Sqlite,
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
        SqliteSynchronous,
    },
};
use sqlx::Executor;
use tracing::info;

pub mod models;
pub mod retry;

pub use retry::{RetryConfig, is_retryable_error, with_retry};

/// Default maximum connections in the pool.
/// SQLite benefits from limited connections due to single-writer model.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Minimum idle connections to maintain.
const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Connection acquisition timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Get max connections from environment or use default.
fn get_max_connections() -> u32 {
    std::env::var("SQLITE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&n| n > 0 && n <= 100)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

/// Apply performance pragmas to a SQLite connection.
/// These pragmas are applied on every new connection via `after_connect`.
///
/// `synchronous` must be set AFTER `mmap_size`: enabling mmap can affect
/// how SQLite handles fsync, and without an explicit synchronous setting
/// disk I/O errors can occur under heavy write load.
async fn apply_performance_pragmas(conn: &mut SqliteConnection) -> Result<(), Error> {
    conn.execute("PRAGMA temp_store = 2").await?;
    conn.execute("PRAGMA mmap_size = 67108864").await?; // 64MB
    conn.execute("PRAGMA synchronous = NORMAL").await?;
    conn.execute("PRAGMA cache_size = -64000").await?; // 64MB, negative means KB
    conn.execute("PRAGMA foreign_keys = ON").await?;
    Ok(())
}

/// Handle to the embedded SQLite store.
///
/// Construction is explicit: the caller owns the database path and the
/// lifecycle of the pool. There is no ambient global instance.
#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating if missing) the database at `db_path` and run
    /// pending migrations.
    pub async fn new(db_path: &Path) -> Result<DBService, Error> {
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let options = SqliteConnectOptions::from_str(&database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));

        let max_connections = get_max_connections();

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .after_connect(|conn, _meta| {
                Box::pin(async move { apply_performance_pragmas(conn).await })
            })
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(
            path = %db_path.display(),
            max_connections,
            "database ready"
        );

        Ok(DBService { pool })
    }
}

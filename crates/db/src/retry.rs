//! SQLite retry logic with exponential backoff.
//!
//! Handles transient SQLite errors like SQLITE_BUSY (code 5) and
//! SQLITE_LOCKED (code 6) which occur under concurrent write load.

use std::future::Future;
use std::time::Duration;

use sqlx::Error as SqlxError;

/// Configuration for SQLite retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (caps the exponential growth).
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0) to add randomness to delays.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 50,
            max_delay_ms: 2000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt using exponential backoff with jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay_ms * 2u64.pow(attempt);
        let capped_delay = base_delay.min(self.max_delay_ms);

        // Jitter prevents thundering herd when several writers back off together
        let jitter = if self.jitter_factor > 0.0 {
            let jitter_range = (capped_delay as f64 * self.jitter_factor) as u64;
            if jitter_range > 0 {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                now % jitter_range
            } else {
                0
            }
        } else {
            0
        };

        Duration::from_millis(capped_delay + jitter)
    }
}

/// Check if an error is a transient SQLite error that should be retried.
///
/// Retryable codes: 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED, 10 = SQLITE_IOERR
/// and its extended variants (base code 10 in the low byte).
pub fn is_retryable_error(e: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = e {
        if let Some(code) = db_err.code() {
            let code_str = code.as_ref();
            if matches!(code_str, "5" | "6" | "10") {
                return true;
            }
            if let Ok(code_num) = code_str.parse::<u32>() {
                if code_num > 10 && (code_num & 0xFF) == 10 {
                    return true;
                }
            }
        }
        false
    } else {
        false
    }
}

/// Execute a database operation, retrying transient SQLite errors with
/// exponential backoff up to `config.max_retries` times.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, SqlxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SqlxError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) if is_retryable_error(&e) && attempt < config.max_retries => {
                let delay = config.calculate_delay(attempt);

                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "transient SQLite error, retrying with backoff"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    tracing::error!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = ?e,
                        "database operation failed after all retries"
                    );
                }
                return Err(e);
            }
        }
    }
}

//! HTTP client for the remote SQL gateway.
//!
//! The gateway exposes a single RPC endpoint (`POST /v1/query`) that
//! executes a parameterized SQL statement against a named server profile
//! and database, and returns a uniform `{success, data, error}` envelope.
//! A non-2xx HTTP status is a transport failure; `success: false` is an
//! application-level failure whose message is surfaced verbatim.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::GatewayConfig;
use super::schema::Record;

/// Errors talking to the SQL gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("request to gateway timed out")]
    Timeout,
    #[error("request to gateway failed: {0}")]
    Transport(String),
    #[error("gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The gateway reached the SQL engine but the statement was rejected
    /// (constraint violation, syntax, permission). Carries the remote
    /// error text verbatim.
    #[error("{0}")]
    Gateway(String),
    #[error("failed to parse gateway response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Returns true if the error is transient and the statement may be
    /// retried (only safe for idempotent statements).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of one executed statement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub recordset: Vec<Record>,
    #[serde(default, rename = "rowsAffected")]
    pub rows_affected: Vec<i64>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    sql: &'a str,
    server: &'a str,
    database: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Record>,
}

#[derive(Deserialize)]
struct QueryEnvelope {
    success: bool,
    data: Option<QueryResult>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the remote SQL gateway.
///
/// Holds a persistent HTTP connection pool; server profile and database
/// name are fixed at construction, not per call.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.config.base_url)
            .field("server", &self.config.server)
            .field("database", &self.config.database)
            .field("api_key", &"<secret>")
            .finish()
    }
}

impl GatewayClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const MAX_RETRIES: usize = 3;

    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("sql-gateway-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Execute one parameterized SQL statement.
    pub async fn execute(
        &self,
        sql: &str,
        params: Option<&Record>,
    ) -> Result<QueryResult, GatewayError> {
        let url = format!("{}/v1/query", self.config.base_url);
        let body = QueryRequest {
            sql,
            server: &self.config.server,
            database: &self.config.database,
            params,
        };

        tracing::debug!(server = %self.config.server, database = %self.config.database, "executing gateway statement");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "gateway returned error status");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: QueryEnvelope = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        if !envelope.success {
            return Err(GatewayError::Gateway(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(envelope.data.unwrap_or_default())
    }

    /// Execute with bounded exponential backoff on transient failures.
    ///
    /// Only use for statements that are safe to re-run: reads, and
    /// writes guarded by an existence check.
    pub async fn execute_with_retry(
        &self,
        sql: &str,
        params: Option<&Record>,
    ) -> Result<QueryResult, GatewayError> {
        (|| self.execute(sql, params))
            .retry(ExponentialBuilder::default().with_max_times(Self::MAX_RETRIES))
            .when(GatewayError::is_transient)
            .notify(|err, dur| {
                tracing::warn!(error = %err, delay_ms = dur.as_millis() as u64, "transient gateway error, retrying");
            })
            .await
    }

    /// Lightweight unauthenticated probe of the gateway.
    ///
    /// Diagnostics only; the sync path does not gate on this, since a
    /// failed query surfaces as a per-row error anyway.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => response
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "ok")
                .unwrap_or(false),
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "health check failed");
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e.to_string())
    }
}

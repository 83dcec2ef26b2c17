//! Environment-resolved configuration for the gateway client and the
//! repository backend switch.
//!
//! Configuration is resolved once, at construction, and injected into
//! clients; nothing reads the environment after startup. A missing URL
//! or token is fatal: no sync work is meaningful without credentials.

use thiserror::Error;

/// Server profile registered on the gateway. A deployment identifier,
/// not a secret.
pub const DEFAULT_SERVER_PROFILE: &str = "primary";

/// Database name on the remote SQL Server instance.
pub const DEFAULT_DATABASE: &str = "project_tracker";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidVar(&'static str, String),
}

/// Connection configuration for the remote SQL gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL, e.g. `https://gateway.example.com`.
    pub base_url: String,
    /// Static API key sent as the `x-api-key` header.
    pub api_key: String,
    /// Named server profile the gateway routes to.
    pub server: String,
    /// Database name on that server.
    pub database: String,
}

impl GatewayConfig {
    /// Resolve gateway configuration from the environment.
    ///
    /// `API_QUERY_URL` and `API_TOKEN` are required; `SQL_SERVER_PROFILE`
    /// and `SQL_DATABASE` override the built-in defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = required("API_QUERY_URL")?;
        let api_key = required("API_TOKEN")?;
        let server =
            std::env::var("SQL_SERVER_PROFILE").unwrap_or_else(|_| DEFAULT_SERVER_PROFILE.into());
        let database = std::env::var("SQL_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.into());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            server,
            database,
        })
    }

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            server: DEFAULT_SERVER_PROFILE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Which concrete store the application binds to at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// The embedded SQLite store.
    Local,
    /// The remote SQL Server instance behind the gateway.
    SqlServer,
}

impl StoreBackend {
    /// Resolve the backend switch from `USE_SQL_SERVER`.
    ///
    /// Absent means local; anything other than a boolean-ish value is a
    /// configuration error rather than a silent default.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("USE_SQL_SERVER") {
            Err(_) => Ok(StoreBackend::Local),
            Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
                "" | "0" | "false" | "no" => Ok(StoreBackend::Local),
                "1" | "true" | "yes" => Ok(StoreBackend::SqlServer),
                other => Err(ConfigError::InvalidVar("USE_SQL_SERVER", other.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_trims_trailing_slash() {
        let config = GatewayConfig::new("https://gw.example.com/", "key");
        assert_eq!(config.base_url, "https://gw.example.com");
        assert_eq!(config.server, DEFAULT_SERVER_PROFILE);
        assert_eq!(config.database, DEFAULT_DATABASE);
    }
}

//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;

/// Storage backend selected by `DB_BACKEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Postgres {
        url: String,
        max_connections: u32,
    },
    Cassandra {
        /// Raw contact point list; split by the cassandra adapter.
        hosts: String,
        keyspace: String,
        /// Lowercased; the cassandra adapter decides which levels exist.
        consistency: String,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres { .. } => "postgres",
            Self::Cassandra { .. } => "cassandra",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    pub backend: BackendConfig,
    /// Catalog search endpoint
    pub itunes_base_url: String,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // Port
        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}': {}", raw, e),
            })?,
            None => 8080,
        };

        // Backend
        let backend_name = var("DB_BACKEND")
            .unwrap_or_else(|| "postgres".into())
            .to_lowercase();
        let backend = match backend_name.as_str() {
            "postgres" => {
                let url = var("POSTGRES_URL").ok_or_else(|| ConfigError {
                    field: "POSTGRES_URL",
                    message: "Required when DB_BACKEND=postgres".into(),
                })?;
                let max_connections = match var("POSTGRES_MAX_CONNECTIONS") {
                    Some(raw) => match raw.parse::<u32>() {
                        Ok(n) if n > 0 => n,
                        _ => {
                            return Err(ConfigError {
                                field: "POSTGRES_MAX_CONNECTIONS",
                                message: format!("Expected a positive integer, got '{}'", raw),
                            })
                        }
                    },
                    None => 5,
                };
                BackendConfig::Postgres {
                    url,
                    max_connections,
                }
            }
            "cassandra" => {
                let hosts = var("CASSANDRA_HOSTS").unwrap_or_else(|| "localhost:9042".into());
                let keyspace = var("CASSANDRA_KEYSPACE").unwrap_or_else(|| "motown".into());
                let consistency = var("CASSANDRA_CONSISTENCY")
                    .unwrap_or_else(|| "quorum".into())
                    .to_lowercase();
                BackendConfig::Cassandra {
                    hosts,
                    keyspace,
                    consistency,
                }
            }
            other => {
                return Err(ConfigError {
                    field: "DB_BACKEND",
                    message: format!("Unsupported backend '{}' (expected postgres or cassandra)", other),
                })
            }
        };

        let itunes_base_url = var("ITUNES_BASE_URL").unwrap_or_else(|| itunes_search::DEFAULT_BASE_URL.into());

        // CORS allow origin
        let cors_origin_str = var("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format = LogFormat::from_str(&var("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            port,
            backend,
            itunes_base_url,
            cors_allow_origin,
            log_format,
        })
    }
}

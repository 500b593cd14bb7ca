//! Configuration management for the eventgate server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Values that fail to parse fall back to the default.

use eventgate_postgres::PoolConfig;
use eventgate_runtime::RetryPolicy;
use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP and metrics listeners
    pub server: ServerConfig,
    /// `PostgreSQL` backend; `None` selects the in-memory backend
    pub postgres: Option<PostgresConfig>,
    /// Retry budget for writes that lose a race
    pub admission: AdmissionConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Retry settings for admissions, cancellations and lifecycle writes
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// First backoff, in milliseconds
    pub retry_initial_ms: u64,
    /// Backoff cap, in milliseconds
    pub retry_max_ms: u64,
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of a
    /// variable if set.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed(&lookup, "PORT").unwrap_or(8080),
                metrics_host: lookup("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                metrics_port: parsed(&lookup, "METRICS_PORT").unwrap_or(9090),
                shutdown_timeout: parsed(&lookup, "SHUTDOWN_TIMEOUT").unwrap_or(30),
            },
            postgres: lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .map(|url| PostgresConfig {
                    url,
                    max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
                    min_connections: parsed(&lookup, "DATABASE_MIN_CONNECTIONS").unwrap_or(1),
                    connect_timeout: parsed(&lookup, "DATABASE_CONNECT_TIMEOUT").unwrap_or(5),
                }),
            admission: AdmissionConfig {
                max_retries: parsed(&lookup, "ADMISSION_MAX_RETRIES").unwrap_or(5),
                retry_initial_ms: parsed(&lookup, "ADMISSION_RETRY_INITIAL_MS").unwrap_or(5),
                retry_max_ms: parsed(&lookup, "ADMISSION_RETRY_MAX_MS").unwrap_or(250),
            },
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

impl ServerConfig {
    /// `host:port` of the HTTP listener.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Socket address of the metrics listener.
    ///
    /// # Errors
    ///
    /// Returns error if `metrics_host` is not an IP address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.metrics_host, self.metrics_port).parse()
    }

    /// Grace period for in-flight requests after a shutdown signal.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl PostgresConfig {
    /// Pool settings for [`eventgate_postgres::PostgresStore::connect`].
    #[must_use]
    pub const fn pool(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout: Duration::from_secs(self.connect_timeout),
        }
    }
}

impl AdmissionConfig {
    /// The desk's retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.retry_initial_ms))
            .max_delay(Duration::from_millis(self.retry_max_ms))
            .build()
    }
}

//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use pagecredits_ledger::{LedgerConfig, DEFAULT_MAX_CAS_ATTEMPTS};

/// Default anonymous requests allowed per client per reset interval.
pub const DEFAULT_PUBLIC_RATE_LIMIT: u64 = 60;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL. Selects the Postgres backend when set.
    pub database_url: Option<String>,

    /// Postgres pool size (default: 10).
    pub database_max_connections: u32,

    /// Path to `RocksDB` data directory (default: "/data/pagecredits").
    pub data_dir: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Anonymous requests allowed per client per reset interval.
    pub public_rate_limit: u64,

    /// Seconds between full rate limit counter resets (default: 3600).
    pub rate_limit_reset_seconds: u64,

    /// Compare-and-swap attempts per ledger operation.
    pub max_cas_attempts: u32,

    /// Upper bound on a single store call, in milliseconds.
    pub store_timeout_ms: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            public_rate_limit: env_parse("PUBLIC_RATE_LIMIT", defaults.public_rate_limit),
            rate_limit_reset_seconds: env_parse(
                "RATE_LIMIT_RESET_SECONDS",
                defaults.rate_limit_reset_seconds,
            ),
            max_cas_attempts: env_parse("LEDGER_MAX_CAS_ATTEMPTS", defaults.max_cas_attempts),
            store_timeout_ms: env_parse("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parse(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// Ledger settings derived from this configuration.
    #[must_use]
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            max_cas_attempts: self.max_cas_attempts.max(1),
            store_timeout: Duration::from_millis(self.store_timeout_ms.max(1)),
            ..LedgerConfig::default()
        }
    }

    /// Interval between rate limit counter resets. Never zero.
    #[must_use]
    pub fn rate_limit_reset_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_reset_seconds.max(1))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            data_dir: "/data/pagecredits".into(),
            service_api_key: None,
            public_rate_limit: DEFAULT_PUBLIC_RATE_LIMIT,
            rate_limit_reset_seconds: 3600,
            max_cas_attempts: DEFAULT_MAX_CAS_ATTEMPTS,
            store_timeout_ms: 5000,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024, // 64KB
            request_timeout_seconds: 30,
        }
    }
}

/// Parse an environment variable, keeping `default` when unset or malformed.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring malformed configuration value");
            default
        }),
        Err(_) => default,
    }
}

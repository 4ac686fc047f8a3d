use std::time::Duration;

use locker_core::config::{
    AuthorizationReuse, EngineConfig, DEFAULT_LEASE_SECS, DEFAULT_READ_RETRIES,
    DEFAULT_STORE_TIMEOUT_MS, MAX_LEASE_SECS,
};

use crate::auth::token::TokenVerifier;

/// Which [`LeaseStore`](locker_core::store::LeaseStore) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Non-persistent store for local development.
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(StoreBackend::Postgres),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub store_backend: StoreBackend,
    /// Bearer token verifier keyed by `JWT_SECRET`.
    pub tokens: TokenVerifier,
    /// Store timeouts, retries and leasing policy.
    pub engine: EngineConfig,
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + ToString,
{
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                    |
    /// | `STORE_BACKEND`          | `postgres`              |
    /// | `STORE_TIMEOUT_MS`       | `5000`                  |
    /// | `STORE_READ_RETRIES`     | `2`                     |
    /// | `DEFAULT_LEASE_SECS`     | `3600`                  |
    /// | `AUTH_RECORD_SINGLE_USE` | `false`                 |
    ///
    /// # Panics
    ///
    /// Panics on any malformed value; misconfiguration fails fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 30);

        let backend_raw = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".into());
        let store_backend = StoreBackend::parse(&backend_raw)
            .unwrap_or_else(|| panic!("STORE_BACKEND must be 'postgres' or 'memory', got '{backend_raw}'"));

        let default_lease_secs: i64 = env_or("DEFAULT_LEASE_SECS", DEFAULT_LEASE_SECS);
        assert!(
            (1..=MAX_LEASE_SECS).contains(&default_lease_secs),
            "DEFAULT_LEASE_SECS must be between 1 and {MAX_LEASE_SECS}"
        );

        let authorization_reuse = if env_or("AUTH_RECORD_SINGLE_USE", false) {
            AuthorizationReuse::SingleUse
        } else {
            AuthorizationReuse::Reusable
        };

        let engine = EngineConfig {
            store_timeout: Duration::from_millis(env_or("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)),
            read_retries: env_or("STORE_READ_RETRIES", DEFAULT_READ_RETRIES),
            default_lease_secs,
            authorization_reuse,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_backend,
            tokens: TokenVerifier::from_env(),
            engine,
        }
    }
}

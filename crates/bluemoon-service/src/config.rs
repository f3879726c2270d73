//! Service configuration.

use std::fmt;
use std::str::FromStr;

/// Development signing key used when `JWT_SECRET` is unset.
pub const DEFAULT_JWT_SECRET: &str = "bluemoon-dev-secret";

/// Which store backend the service runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local maps; everything is lost on restart.
    #[default]
    Memory,
    /// `RocksDB` under `DATA_DIR` (needs the `rocksdb-backend` feature).
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::RocksDb => "rocksdb",
        })
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/bluemoon").
    pub data_dir: String,

    /// Store backend (default: memory).
    pub store_backend: StoreBackend,

    /// HS256 key for login tokens.
    pub jwt_secret: String,

    /// Login token lifetime in hours (default: 168, one week).
    pub jwt_ttl_hours: i64,

    /// Key expected in `x-admin-key` for admin endpoints. Admin endpoints are closed when unset.
    pub admin_api_key: Option<String>,

    /// Password reset token lifetime in minutes (default: 15).
    pub reset_token_ttl_minutes: i64,

    /// Page residents open from the reset mail; the token is appended as `?token=`.
    pub reset_link_base: String,

    /// Shared secret for payment callback signatures. Callbacks are unsigned when unset.
    pub callback_secret: Option<String>,

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

        let store_backend = match std::env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Falling back to the memory store");
                StoreBackend::Memory
            }),
            Err(_) => defaults.store_backend,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            store_backend,
            jwt_secret: std::env::var("JWT_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.jwt_secret),
            jwt_ttl_hours: env_parse("JWT_TTL_HOURS").unwrap_or(defaults.jwt_ttl_hours),
            reset_token_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES")
                .unwrap_or(defaults.reset_token_ttl_minutes),
            reset_link_base: std::env::var("RESET_LINK_BASE").unwrap_or(defaults.reset_link_base),
            admin_api_key: env_secret("ADMIN_API_KEY"),
            callback_secret: env_secret("CALLBACK_SECRET"),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Whether login tokens are signed with the built-in development key.
    #[must_use]
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/bluemoon".into(),
            store_backend: StoreBackend::Memory,
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            jwt_ttl_hours: 168,
            reset_token_ttl_minutes: 15,
            reset_link_base: "http://localhost:3000/reset-password".into(),
            admin_api_key: None,
            callback_secret: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

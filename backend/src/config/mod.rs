//! Configuration module for the discussions backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::AppError;

/// Fallback signing secrets for local development only.
const DEV_ACCESS_SECRET: &str = "dev-access-secret-change-me";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-me";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Allowed CORS origin; any origin when unset
    pub frontend_url: Option<String>,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Reject operations that name both a discussion and a parent.
    /// When false, the parent wins.
    pub strict_anchors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/discussions.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            frontend_url: None,
            access_token_secret: DEV_ACCESS_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_SECRET.to_string(),
            access_token_ttl_secs: 15 * 60,
            refresh_token_ttl_secs: 7 * 24 * 60 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            strict_anchors: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let db_path = env::var("DISCUSS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = parse_var("DISCUSS_BIND_ADDR")?.unwrap_or(defaults.bind_addr);

        let log_level = env::var("DISCUSS_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_format = match env::var("DISCUSS_LOG_FORMAT").ok().as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Internal(format!(
                    "Invalid DISCUSS_LOG_FORMAT: {} (expected pretty or json)",
                    other
                )))
            }
        };

        let frontend_url = env::var("DISCUSS_FRONTEND_URL").ok();

        let access_token_secret =
            env::var("DISCUSS_ACCESS_TOKEN_SECRET").unwrap_or(defaults.access_token_secret);
        let refresh_token_secret =
            env::var("DISCUSS_REFRESH_TOKEN_SECRET").unwrap_or(defaults.refresh_token_secret);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            frontend_url,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs: parse_var("DISCUSS_ACCESS_TOKEN_TTL_SECS")?
                .unwrap_or(defaults.access_token_ttl_secs),
            refresh_token_ttl_secs: parse_var("DISCUSS_REFRESH_TOKEN_TTL_SECS")?
                .unwrap_or(defaults.refresh_token_ttl_secs),
            bcrypt_cost: parse_var("DISCUSS_BCRYPT_COST")?.unwrap_or(defaults.bcrypt_cost),
            strict_anchors: parse_var("DISCUSS_STRICT_ANCHORS")?
                .unwrap_or(defaults.strict_anchors),
        })
    }

    /// True when either signing secret is still the built-in development value.
    pub fn uses_dev_secrets(&self) -> bool {
        self.access_token_secret == DEV_ACCESS_SECRET
            || self.refresh_token_secret == DEV_REFRESH_SECRET
    }
}

/// Read and parse an optional environment variable.
fn parse_var<T>(name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

//! Environment-driven configuration for the Tally users service.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8088;
pub const DEFAULT_MAX_USER_SESSIONS: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
/// Upper bound for token lifetimes (ten years).
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} configuration must be provided")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Source of configuration values. The process environment in production,
/// a plain map in tests.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, treating an empty string as absent.
    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::Missing(key)),
        }
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
            _ => Ok(default),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Signing parameters for access and refresh tokens.
#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl TokenConfig {
    pub fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            secret: source.require("JWT_SECRET")?,
            access_ttl_secs: required_ttl(source, "JWT_ACCESS_TTL")?,
            refresh_ttl_secs: required_ttl(source, "JWT_REFRESH_TTL")?,
        })
    }
}

fn required_ttl(source: &impl ConfigSource, key: &'static str) -> Result<u64, ConfigError> {
    let raw = source.require(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Missing(key)),
        Ok(ttl) if ttl <= MAX_TOKEN_TTL_SECS => Ok(ttl),
        Ok(_) => Err(ConfigError::Invalid { key, value: raw }),
        Err(_) => Err(ConfigError::Invalid { key, value: raw }),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub tokens: TokenConfig,
    pub max_user_sessions: usize,
    /// OAuth client id Google ID tokens must be issued for.
    pub google_key: String,
    pub request_timeout: Duration,
    pub run_migrations: bool,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_err() {
            tracing::debug!("No .env file found, using process environment only");
        }
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            port: source.parse_or("APP_PORT", DEFAULT_PORT)?,
            tokens: TokenConfig::from_source(source)?,
            max_user_sessions: source.parse_or("MAX_USER_SESSIONS", DEFAULT_MAX_USER_SESSIONS)?,
            google_key: source.require("GOOGLE_KEY")?,
            request_timeout: Duration::from_secs(
                source.parse_or("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            ),
            run_migrations: source.parse_or("RUN_MIGRATIONS", true)?,
        })
    }
}

/// Postgres connection string: `DATABASE_URL` when set, otherwise composed
/// from the `POSTGRES_*` variables.
pub fn database_url(source: &impl ConfigSource) -> Result<String, ConfigError> {
    if let Ok(url) = source.require("DATABASE_URL") {
        return Ok(url);
    }

    let user = source.require("POSTGRES_USER")?;
    let password = source.require("POSTGRES_PASSWORD")?;
    let host = source.require("POSTGRES_HOST")?;
    let db = source.require("POSTGRES_DB")?;

    Ok(format!("postgres://{user}:{password}@{host}:5432/{db}?sslmode=disable"))
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_config::{ConfigError, ConfigSource, ProcessEnv, DEFAULT_DB_MAX_CONNECTIONS};

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("database_url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: tally_config::database_url(source)?,
            max_connections: source.parse_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            connect_timeout_seconds: source.parse_or("DB_CONNECT_TIMEOUT", 30)?,
        })
    }

    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            connect_timeout_seconds: 30,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_DATABASE_SCHEMA, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS, DEFAULT_PAGE_SIZE,
    USERS_CONTEXT_NAME,
};

/// Connection settings for one bounded context (one database context).
#[derive(Clone)]
pub struct DatabaseSettings {
    /// Name of the bounded context these settings belong to
    pub context_name: String,
    pub url: String,
    /// PostgreSQL schema placed first on the `search_path`
    pub schema: String,
    pub max_connections: u32,
    pub sqlx_logging: bool,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("context_name", &self.context_name)
            .field("url", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .field("sqlx_logging", &self.sqlx_logging)
            .finish()
    }
}

impl DatabaseSettings {
    /// Settings for a context backed by the given URL, with defaults for the rest.
    pub fn new(context_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            context_name: context_name.into(),
            url: url.into(),
            schema: DEFAULT_DATABASE_SCHEMA.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sqlx_logging: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// True for URLs handled by the SQLite driver.
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseSettings,
    pub default_page_size: u64,
}

impl Config {
    /// Load configuration from environment variables (and `.env` when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let database = DatabaseSettings {
            context_name: USERS_CONTEXT_NAME.to_string(),
            url: env::var("DATABASE_URL").unwrap_or_else(|_| {
                tracing::warn!("DATABASE_URL not set, using development default");
                DEFAULT_DATABASE_URL.to_string()
            }),
            schema: env::var("DATABASE_SCHEMA")
                .unwrap_or_else(|_| DEFAULT_DATABASE_SCHEMA.to_string()),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            sqlx_logging: env::var("DATABASE_SQL_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        };

        Self {
            database,
            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size: &u64| *size > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_url() {
        let settings = DatabaseSettings::new("users", "postgres://user:secret@db/app");
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_sqlite_detection() {
        assert!(DatabaseSettings::new("users", "sqlite::memory:").is_sqlite());
        assert!(!DatabaseSettings::new("users", DEFAULT_DATABASE_URL).is_sqlite());
    }
}

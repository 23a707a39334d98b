//! Configuration system for Keystone.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `KEYSTONE_SERVER_HOST` - Server bind address
//! - `KEYSTONE_SERVER_PORT` - Server port
//! - `KEYSTONE_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `KEYSTONE_DATABASE_URL` - Database connection URL
//! - `KEYSTONE_DATABASE_MAX_CONNECTIONS` - Connection pool size
//! - `KEYSTONE_LOGGING_ENABLED` - Enable the tracing subscriber
//! - `KEYSTONE_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};

/// Global configuration singleton.
static CONFIG: OnceLock<KeystoneConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://keystone.db?mode=rwc".to_string(),
            postgres_url: "postgres://localhost/keystone".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for the configured backend.
    pub fn url(&self) -> &str {
        match self.db_type.as_str() {
            "postgres" => &self.postgres_url,
            _ => &self.sqlite_url,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

fn config_error(e: config::ConfigError) -> LicenseError {
    LicenseError::ConfigError(e.to_string())
}

impl KeystoneConfig {
    /// Load configuration from file and environment, without caching.
    ///
    /// Sources, later overriding earlier:
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> LicenseResult<Self> {
        let defaults = Self::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)
            .map_err(config_error)?
            .set_default("server.port", defaults.server.port as i64)
            .map_err(config_error)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_error)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_error)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_error)?
            .set_default(
                "database.max_connections",
                defaults.database.max_connections as i64,
            )
            .map_err(config_error)?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )
            .map_err(config_error)?
            .set_default("logging.enabled", defaults.logging.enabled)
            .map_err(config_error)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_error)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("KEYSTONE_SERVER_HOST").ok())
            .map_err(config_error)?
            .set_override_option(
                "server.port",
                env::var("KEYSTONE_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_error)?
            .set_override_option("database.db_type", env::var("KEYSTONE_DATABASE_TYPE").ok())
            .map_err(config_error)?
            .set_override_option(
                "database.sqlite_url",
                env::var("KEYSTONE_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_error)?
            .set_override_option(
                "database.postgres_url",
                env::var("KEYSTONE_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_error)?
            .set_override_option(
                "database.max_connections",
                env::var("KEYSTONE_DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_error)?
            .set_override_option(
                "logging.enabled",
                env::var("KEYSTONE_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_error)?
            .set_override_option("logging.level", env::var("KEYSTONE_LOG_LEVEL").ok())
            .map_err(config_error)?;

        let settings = builder
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| LicenseError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.server.port == 0 {
            return Err(LicenseError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(LicenseError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// Loads and validates on first access, then serves the cached value.
pub fn get_config() -> LicenseResult<&'static KeystoneConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = KeystoneConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> LicenseResult<&'static KeystoneConfig> {
    get_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = KeystoneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.url(), "sqlite://keystone.db?mode=rwc");
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = KeystoneConfig::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(LicenseError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_unknown_database_type() {
        let mut config = KeystoneConfig::default();
        config.database.db_type = "mysql".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn rejects_empty_pool() {
        let mut config = KeystoneConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = KeystoneConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn postgres_url_selected_by_type() {
        let mut config = KeystoneConfig::default();
        config.database.db_type = "postgres".to_string();
        assert_eq!(config.database.url(), "postgres://localhost/keystone");
    }
}

//! Storage handle over SQLite or PostgreSQL.
//!
//! `Database` is the single injected handle for the three persisted
//! collections. Connections are pooled and checked out per statement, so
//! every operation releases its connection when it completes. The
//! collection-specific operations live in [`crate::server::store`].

use std::sync::Arc;
use std::time::Duration;

use sqlx::query;
use tracing::{error, info};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{LicenseError, LicenseResult};

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS licenses (
        license_key  TEXT PRIMARY KEY,
        hwid         TEXT,
        expires_at   TEXT NOT NULL,
        created_at   TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_logs (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        license_key   TEXT NOT NULL,
        hwid          TEXT,
        attempted_at  TEXT NOT NULL,
        outcome       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_usage_logs_key_hwid ON usage_logs (license_key, hwid)",
    r#"
    CREATE TABLE IF NOT EXISTS blocked_hwids (
        hwid        TEXT PRIMARY KEY,
        blocked_at  TEXT NOT NULL
    )
    "#,
];

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS licenses (
        license_key  TEXT PRIMARY KEY,
        hwid         TEXT,
        expires_at   DATE NOT NULL,
        created_at   TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_logs (
        id            BIGSERIAL PRIMARY KEY,
        license_key   TEXT NOT NULL,
        hwid          TEXT,
        attempted_at  TIMESTAMP NOT NULL,
        outcome       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_usage_logs_key_hwid ON usage_logs (license_key, hwid)",
    r#"
    CREATE TABLE IF NOT EXISTS blocked_hwids (
        hwid        TEXT PRIMARY KEY,
        blocked_at  TIMESTAMP NOT NULL
    )
    "#,
];

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// Build a `map_err` adapter that logs a failed statement and reports it as
/// [`LicenseError::StorageUnavailable`].
pub(crate) fn storage_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> LicenseError {
    move |e| {
        error!(operation, "database operation failed: {e}");
        LicenseError::StorageUnavailable(format!("{operation}: {e}"))
    }
}

impl Database {
    /// Connect using the global configuration (`config.toml` + environment).
    pub async fn new() -> LicenseResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await
    }

    /// Connect using an explicit database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> LicenseResult<Arc<Self>> {
        let acquire_timeout = Duration::from_secs(db_config.acquire_timeout_secs);
        let url = db_config.url();

        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                // Every connection to `:memory:` opens its own empty database.
                let max_connections = if url.contains(":memory:") {
                    1
                } else {
                    db_config.max_connections
                };

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        LicenseError::StorageUnavailable(format!(
                            "failed to connect to SQLite: {e}"
                        ))
                    })?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(LicenseError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        LicenseError::StorageUnavailable(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(LicenseError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(LicenseError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Create the `licenses`, `usage_logs` and `blocked_hwids` tables if they
    /// do not exist yet. Safe to run on every startup.
    pub async fn migrate(&self) -> LicenseResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                for statement in SQLITE_SCHEMA {
                    query(statement)
                        .execute(pool)
                        .await
                        .map_err(storage_error("migrate"))?;
                }
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                for statement in POSTGRES_SCHEMA {
                    query(statement)
                        .execute(pool)
                        .await
                        .map_err(storage_error("migrate"))?;
                }
            }
        }

        info!(db_type = self.db_type(), "Database schema is up to date");
        Ok(())
    }

    /// Backend name, as used in configuration.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Round-trip a trivial statement to check connectivity.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
        };

        result.is_ok()
    }
}

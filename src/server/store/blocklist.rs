//! Block list: hardware identifiers denied regardless of license state.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{query, query_as, query_scalar, FromRow};

use crate::errors::LicenseResult;
use crate::server::database::{storage_error, Database};
use crate::server::logging::{log_hardware_event, LicenseEvent};
use crate::server::validation::validate_hardware_id;

/// A blocked hardware identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BlockedHwid {
    pub hwid: String,
    pub blocked_at: NaiveDateTime,
}

impl Database {
    /// Add `hwid` to the block list. Idempotent.
    ///
    /// Returns `true` if the hwid was not blocked before.
    pub async fn block_hwid(&self, hwid: &str, now: NaiveDateTime) -> LicenseResult<bool> {
        validate_hardware_id(hwid, "hwid")?;

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "INSERT INTO blocked_hwids (hwid, blocked_at) VALUES (?, ?) \
                 ON CONFLICT(hwid) DO NOTHING",
            )
            .bind(hwid)
            .bind(now)
            .execute(pool)
            .await
            .map_err(storage_error("block_hwid"))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "INSERT INTO blocked_hwids (hwid, blocked_at) VALUES ($1, $2) \
                 ON CONFLICT (hwid) DO NOTHING",
            )
            .bind(hwid)
            .bind(now)
            .execute(pool)
            .await
            .map_err(storage_error("block_hwid"))?
            .rows_affected(),
        };

        if rows_affected > 0 {
            log_hardware_event(LicenseEvent::Blocked, hwid);
        }

        Ok(rows_affected > 0)
    }

    /// Remove `hwid` from the block list. Idempotent.
    ///
    /// Returns `true` if the hwid was blocked before.
    pub async fn unblock_hwid(&self, hwid: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("DELETE FROM blocked_hwids WHERE hwid = ?")
                .bind(hwid)
                .execute(pool)
                .await
                .map_err(storage_error("unblock_hwid"))?
                .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("DELETE FROM blocked_hwids WHERE hwid = $1")
                .bind(hwid)
                .execute(pool)
                .await
                .map_err(storage_error("unblock_hwid"))?
                .rows_affected(),
        };

        if rows_affected > 0 {
            log_hardware_event(LicenseEvent::Unblocked, hwid);
        }

        Ok(rows_affected > 0)
    }

    pub async fn is_blocked(&self, hwid: &str) -> LicenseResult<bool> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM blocked_hwids WHERE hwid = ?)",
            )
            .bind(hwid)
            .fetch_one(pool)
            .await
            .map_err(storage_error("is_blocked")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM blocked_hwids WHERE hwid = $1)",
            )
            .bind(hwid)
            .fetch_one(pool)
            .await
            .map_err(storage_error("is_blocked")),
        }
    }

    /// All blocked hwids, most recently blocked first.
    pub async fn list_blocked(&self) -> LicenseResult<Vec<BlockedHwid>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, BlockedHwid>(
                "SELECT hwid, blocked_at FROM blocked_hwids ORDER BY blocked_at DESC, hwid",
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_blocked")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, BlockedHwid>(
                "SELECT hwid, blocked_at FROM blocked_hwids ORDER BY blocked_at DESC, hwid",
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_blocked")),
        }
    }
}

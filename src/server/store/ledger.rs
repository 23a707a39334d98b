//! Usage ledger: append-only record of validation attempts and its aggregation.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{query, query_as, FromRow};

use crate::errors::{LicenseError, LicenseResult};
use crate::license::Outcome;
use crate::server::database::{storage_error, Database};

/// One recorded validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    pub id: i64,
    pub key: String,
    /// The hwid as presented by the client.
    pub hwid: Option<String>,
    pub attempted_at: NaiveDateTime,
    pub outcome: Outcome,
}

#[derive(Debug, FromRow)]
struct UsageEntryRow {
    id: i64,
    license_key: String,
    hwid: Option<String>,
    attempted_at: NaiveDateTime,
    outcome: String,
}

impl TryFrom<UsageEntryRow> for UsageEntry {
    type Error = LicenseError;

    fn try_from(row: UsageEntryRow) -> Result<Self, Self::Error> {
        let outcome = row.outcome.parse::<Outcome>().map_err(|e| {
            LicenseError::StorageUnavailable(format!("corrupt usage log entry {}: {e}", row.id))
        })?;

        Ok(UsageEntry {
            id: row.id,
            key: row.license_key,
            hwid: row.hwid,
            attempted_at: row.attempted_at,
            outcome,
        })
    }
}

/// Attempts grouped by (key, hwid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UsageRow {
    #[sqlx(rename = "license_key")]
    pub key: String,
    pub hwid: Option<String>,
    pub attempts: i64,
    pub last_attempt_at: NaiveDateTime,
    /// Whether this hwid is currently on the block list.
    pub blocked: bool,
}

impl Database {
    /// Append one entry to the usage ledger and return its id.
    pub async fn append_usage(
        &self,
        key: &str,
        hwid: Option<&str>,
        attempted_at: NaiveDateTime,
        outcome: Outcome,
    ) -> LicenseResult<i64> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let result = query(
                    "INSERT INTO usage_logs (license_key, hwid, attempted_at, outcome) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(key)
                .bind(hwid)
                .bind(attempted_at)
                .bind(outcome.label())
                .execute(pool)
                .await
                .map_err(storage_error("append_usage"))?;

                Ok(result.last_insert_rowid())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => sqlx::query_scalar::<_, i64>(
                "INSERT INTO usage_logs (license_key, hwid, attempted_at, outcome) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(key)
            .bind(hwid)
            .bind(attempted_at)
            .bind(outcome.label())
            .fetch_one(pool)
            .await
            .map_err(storage_error("append_usage")),
        }
    }

    /// Raw ledger entries, newest first (ties broken by insertion order).
    ///
    /// `limit = None` returns the whole ledger.
    pub async fn list_usage_entries(&self, limit: Option<u32>) -> LicenseResult<Vec<UsageEntry>> {
        let rows = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, UsageEntryRow>(
                "SELECT id, license_key, hwid, attempted_at, outcome \
                 FROM usage_logs ORDER BY attempted_at DESC, id DESC LIMIT ?",
            )
            // SQLite treats a negative limit as "no limit"
            .bind(limit.map(i64::from).unwrap_or(-1))
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_usage_entries"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, UsageEntryRow>(
                "SELECT id, license_key, hwid, attempted_at, outcome \
                 FROM usage_logs ORDER BY attempted_at DESC, id DESC LIMIT $1",
            )
            .bind(limit.map(i64::from))
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_usage_entries"))?,
        };

        rows.into_iter().map(UsageEntry::try_from).collect()
    }

    /// Attempts grouped by (key, hwid), most recent activity first.
    pub async fn usage_report(&self) -> LicenseResult<Vec<UsageRow>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, UsageRow>(
                r#"
                SELECT u.license_key,
                       u.hwid,
                       COUNT(*)            AS attempts,
                       MAX(u.attempted_at) AS last_attempt_at,
                       MAX(u.id)           AS last_id,
                       EXISTS (SELECT 1 FROM blocked_hwids b WHERE b.hwid = u.hwid) AS blocked
                FROM usage_logs u
                GROUP BY u.license_key, u.hwid
                ORDER BY last_attempt_at DESC, last_id DESC
                "#,
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("usage_report")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, UsageRow>(
                r#"
                SELECT u.license_key,
                       u.hwid,
                       COUNT(*)            AS attempts,
                       MAX(u.attempted_at) AS last_attempt_at,
                       MAX(u.id)           AS last_id,
                       EXISTS (SELECT 1 FROM blocked_hwids b WHERE b.hwid = u.hwid) AS blocked
                FROM usage_logs u
                GROUP BY u.license_key, u.hwid
                ORDER BY last_attempt_at DESC, last_id DESC
                "#,
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("usage_report")),
        }
    }
}

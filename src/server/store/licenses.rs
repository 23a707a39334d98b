//! License store: create, find, list, delete and the conditional hwid binding.

use chrono::NaiveDateTime;
use sqlx::{query, query_as};
use tracing::info;

use crate::errors::{LicenseError, LicenseResult};
use crate::export::licenses_to_csv;
use crate::license::{License, LicenseDuration};
use crate::server::database::{storage_error, Database};
use crate::server::logging::{log_license_event, LicenseEvent};
use crate::server::validation::{validate_hardware_id, validate_license_key};

impl Database {
    /// Create a new license issued at `now`.
    ///
    /// An empty `hwid` is treated as unset. Fails with
    /// [`LicenseError::DuplicateKey`] if the key already exists; the existing
    /// record (and any bound hwid) is left untouched.
    pub async fn create_license(
        &self,
        key: &str,
        hwid: Option<&str>,
        duration: LicenseDuration,
        now: NaiveDateTime,
    ) -> LicenseResult<License> {
        validate_license_key(key, "key")?;
        let hwid = hwid.filter(|h| !h.is_empty());
        if let Some(h) = hwid {
            validate_hardware_id(h, "hwid")?;
        }

        let license = License {
            key: key.to_string(),
            hwid: hwid.map(String::from),
            expires_at: duration.expires_at(now.date()),
            created_at: now,
        };

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "INSERT INTO licenses (license_key, hwid, expires_at, created_at) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT(license_key) DO NOTHING",
            )
            .bind(&license.key)
            .bind(&license.hwid)
            .bind(license.expires_at)
            .bind(license.created_at)
            .execute(pool)
            .await
            .map_err(storage_error("create_license"))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "INSERT INTO licenses (license_key, hwid, expires_at, created_at) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (license_key) DO NOTHING",
            )
            .bind(&license.key)
            .bind(&license.hwid)
            .bind(license.expires_at)
            .bind(license.created_at)
            .execute(pool)
            .await
            .map_err(storage_error("create_license"))?
            .rows_affected(),
        };

        if rows_affected == 0 {
            return Err(LicenseError::DuplicateKey(key.to_string()));
        }

        log_license_event(
            LicenseEvent::Created,
            key,
            Some(&format!("duration={duration} expires_at={}", license.expires_at)),
        );

        Ok(license)
    }

    /// Fetch a license by key.
    ///
    /// Returns:
    /// - `Ok(Some(License))` if found
    /// - `Ok(None)` if not found
    /// - `Err(LicenseError::StorageUnavailable)` on DB failure
    pub async fn get_license(&self, key: &str) -> LicenseResult<Option<License>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses WHERE license_key = ?",
            )
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("get_license")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses WHERE license_key = $1",
            )
            .bind(key)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("get_license")),
        }
    }

    /// Fetch a license by key, mapping absence to [`LicenseError::LicenseNotFound`].
    pub async fn find_license(&self, key: &str) -> LicenseResult<License> {
        self.get_license(key)
            .await?
            .ok_or_else(|| LicenseError::LicenseNotFound(key.to_string()))
    }

    /// List licenses ordered by expiry date, then key.
    ///
    /// With a non-empty `filter`, only licenses whose key or hwid contains it
    /// (case-sensitive, no wildcards) are returned.
    pub async fn list_licenses(&self, filter: Option<&str>) -> LicenseResult<Vec<License>> {
        let filter = filter.filter(|f| !f.is_empty());

        match (self, filter) {
            #[cfg(feature = "sqlite")]
            (Database::SQLite(pool), None) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses ORDER BY expires_at, license_key",
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_licenses")),
            #[cfg(feature = "sqlite")]
            (Database::SQLite(pool), Some(needle)) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses \
                 WHERE instr(license_key, ?) > 0 OR instr(hwid, ?) > 0 \
                 ORDER BY expires_at, license_key",
            )
            .bind(needle)
            .bind(needle)
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_licenses")),
            #[cfg(feature = "postgres")]
            (Database::Postgres(pool), None) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses ORDER BY expires_at, license_key",
            )
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_licenses")),
            #[cfg(feature = "postgres")]
            (Database::Postgres(pool), Some(needle)) => query_as::<_, License>(
                "SELECT license_key, hwid, expires_at, created_at \
                 FROM licenses \
                 WHERE strpos(license_key, $1) > 0 OR strpos(hwid, $1) > 0 \
                 ORDER BY expires_at, license_key",
            )
            .bind(needle)
            .fetch_all(pool)
            .await
            .map_err(storage_error("list_licenses")),
        }
    }

    /// Delete a license. Deleting a missing key is not an error.
    ///
    /// Returns whether a row was removed.
    pub async fn delete_license(&self, key: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("DELETE FROM licenses WHERE license_key = ?")
                .bind(key)
                .execute(pool)
                .await
                .map_err(storage_error("delete_license"))?
                .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("DELETE FROM licenses WHERE license_key = $1")
                .bind(key)
                .execute(pool)
                .await
                .map_err(storage_error("delete_license"))?
                .rows_affected(),
        };

        if rows_affected > 0 {
            log_license_event(LicenseEvent::Deleted, key, None);
        } else {
            info!("Delete requested for non-existent license key={}", key);
        }

        Ok(rows_affected > 0)
    }

    /// Render every license as CSV (`Key,HWID,Expires`), in list order.
    pub async fn export_licenses_csv(&self) -> LicenseResult<Vec<u8>> {
        let licenses = self.list_licenses(None).await?;
        let csv = licenses_to_csv(&licenses)?;
        info!("Exported {} licenses as CSV", licenses.len());
        Ok(csv)
    }

    /// Bind `hwid` to the license only if it is still unbound.
    ///
    /// This is a single conditional UPDATE, so at most one caller can ever
    /// win for a given key. Returns `true` if this call performed the binding.
    pub async fn bind_hwid(&self, key: &str, hwid: &str) -> LicenseResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE licenses SET hwid = ? \
                 WHERE license_key = ? AND hwid IS NULL",
            )
            .bind(hwid)
            .bind(key)
            .execute(pool)
            .await
            .map_err(storage_error("bind_hwid"))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE licenses SET hwid = $1 \
                 WHERE license_key = $2 AND hwid IS NULL",
            )
            .bind(hwid)
            .bind(key)
            .execute(pool)
            .await
            .map_err(storage_error("bind_hwid"))?
            .rows_affected(),
        };

        Ok(rows_affected == 1)
    }
}

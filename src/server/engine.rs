//! License validation engine.
//!
//! Decides whether a (key, hwid) pair is currently authorized and performs the
//! one-time hwid binding. The engine holds no state of its own: [`decide`] is a
//! pure function over what the store returned, and [`validate`] wires it to
//! the store.
//!
//! Rules are evaluated in a fixed order, because several can hold at once:
//!
//! 1. presented hwid is blocked → [`Outcome::Blocked`]
//! 2. key is unknown → [`Outcome::NotFound`]
//! 3. `expires_at` is before today → [`Outcome::Expired`]
//! 4. license is bound to another hwid → [`Outcome::HwidMismatch`]
//! 5. otherwise → [`Outcome::Accepted`], binding the hwid if the license is unbound
//!
//! Every decided attempt is appended to the usage ledger, whatever the outcome.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error};

use crate::errors::{LicenseError, LicenseResult};
use crate::license::{License, Outcome};
use crate::server::database::Database;
use crate::server::logging::{log_license_binding_event, log_validation_event, LicenseEvent};

/// Bound on decide/bind rounds when concurrent writers keep changing the row.
const MAX_BIND_ATTEMPTS: usize = 3;

/// The result of [`validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    /// False if the decision was made but the usage ledger append failed.
    pub recorded: bool,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_accepted()
    }
}

/// Apply the validation rules to already-loaded state.
///
/// `hwid` is `None` when the client presented no hardware identifier; such a
/// request can never be blocked and never matches a bound license.
pub fn decide(
    blocked: bool,
    license: Option<&License>,
    hwid: Option<&str>,
    today: NaiveDate,
) -> Outcome {
    if blocked {
        return Outcome::Blocked;
    }

    let Some(license) = license else {
        return Outcome::NotFound;
    };

    if license.is_expired_on(today) {
        return Outcome::Expired;
    }

    match license.hwid.as_deref() {
        Some(bound) if Some(bound) != hwid => Outcome::HwidMismatch,
        _ => Outcome::Accepted,
    }
}

/// Validate `key` presented from `hwid` at `now`.
///
/// Returns `Err(LicenseError::StorageUnavailable)` only when the decision
/// itself could not be made; in that case no binding has been applied. A
/// failed ledger append does not change the outcome and is reported through
/// [`Verdict::recorded`].
pub async fn validate(
    db: &Database,
    key: &str,
    hwid: Option<&str>,
    now: NaiveDateTime,
) -> LicenseResult<Verdict> {
    let hwid = hwid.filter(|h| !h.is_empty());
    let outcome = decide_and_bind(db, key, hwid, now.date()).await?;

    let recorded = match db.append_usage(key, hwid, now, outcome).await {
        Ok(id) => {
            debug!(usage_id = id, outcome = %outcome, "Recorded validation attempt");
            true
        }
        Err(e) => {
            error!(
                license_key = %key,
                outcome = %outcome,
                "Failed to record validation attempt: {e}"
            );
            false
        }
    };

    log_validation_event(key, hwid, outcome);

    Ok(Verdict { outcome, recorded })
}

async fn decide_and_bind(
    db: &Database,
    key: &str,
    hwid: Option<&str>,
    today: NaiveDate,
) -> LicenseResult<Outcome> {
    let blocked = match hwid {
        Some(h) => db.is_blocked(h).await?,
        None => false,
    };

    for _ in 0..MAX_BIND_ATTEMPTS {
        let license = db.get_license(key).await?;
        let outcome = decide(blocked, license.as_ref(), hwid, today);

        let h = match (outcome, license.as_ref(), hwid) {
            (Outcome::Accepted, Some(l), Some(h)) if !l.is_bound() => h,
            _ => return Ok(outcome),
        };

        if db.bind_hwid(key, h).await? {
            log_license_binding_event(LicenseEvent::Bound, key, h);
            return Ok(Outcome::Accepted);
        }

        // Lost the race (or the row changed); decide again on fresh state.
        debug!(license_key = %key, "Binding lost to a concurrent request, re-reading");
    }

    Err(LicenseError::StorageUnavailable(format!(
        "license {key} changed during {MAX_BIND_ATTEMPTS} binding attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn license(hwid: Option<&str>, expires_at: NaiveDate) -> License {
        License {
            key: "ABC".to_string(),
            hwid: hwid.map(String::from),
            expires_at,
            created_at: date(2026, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    const TODAY: (i32, u32, u32) = (2026, 3, 15);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn blocked_wins_over_everything() {
        let lic = license(Some("H1"), date(2027, 1, 1));
        assert_eq!(
            decide(true, Some(&lic), Some("H1"), today()),
            Outcome::Blocked
        );
        assert_eq!(decide(true, None, Some("H1"), today()), Outcome::Blocked);
        let expired = license(Some("H2"), date(2020, 1, 1));
        assert_eq!(
            decide(true, Some(&expired), Some("H1"), today()),
            Outcome::Blocked
        );
    }

    #[test]
    fn missing_license_is_not_found() {
        assert_eq!(decide(false, None, Some("H1"), today()), Outcome::NotFound);
        assert_eq!(decide(false, None, None, today()), Outcome::NotFound);
    }

    #[test]
    fn expiry_checked_before_hwid() {
        let lic = license(Some("H1"), date(2026, 3, 14));
        assert_eq!(
            decide(false, Some(&lic), Some("H2"), today()),
            Outcome::Expired
        );
        assert_eq!(
            decide(false, Some(&lic), Some("H1"), today()),
            Outcome::Expired
        );
    }

    #[test]
    fn expiring_today_is_still_valid() {
        let lic = license(None, today());
        assert_eq!(
            decide(false, Some(&lic), Some("H1"), today()),
            Outcome::Accepted
        );
    }

    #[test]
    fn bound_license_requires_same_hwid() {
        let lic = license(Some("H1"), date(2027, 1, 1));
        assert_eq!(
            decide(false, Some(&lic), Some("H1"), today()),
            Outcome::Accepted
        );
        assert_eq!(
            decide(false, Some(&lic), Some("H2"), today()),
            Outcome::HwidMismatch
        );
        assert_eq!(
            decide(false, Some(&lic), None, today()),
            Outcome::HwidMismatch
        );
    }

    #[test]
    fn unbound_license_accepts_any_hwid() {
        let lic = license(None, date(2027, 1, 1));
        assert_eq!(
            decide(false, Some(&lic), Some("anything"), today()),
            Outcome::Accepted
        );
        assert_eq!(decide(false, Some(&lic), None, today()), Outcome::Accepted);
    }

    #[test]
    fn verdict_validity_follows_outcome() {
        let ok = Verdict {
            outcome: Outcome::Accepted,
            recorded: true,
        };
        let rejected = Verdict {
            outcome: Outcome::Expired,
            recorded: false,
        };
        assert!(ok.is_valid());
        assert!(!rejected.is_valid());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn validate_records_every_attempt() {
        use sqlx::sqlite::SqlitePoolOptions;

        tokio_test::block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            let db = Database::SQLite(pool);
            db.migrate().await.unwrap();

            let now = today().and_hms_opt(12, 0, 0).unwrap();
            let verdict = validate(&db, "MISSING", Some("H1"), now).await.unwrap();
            assert_eq!(verdict.outcome, Outcome::NotFound);
            assert!(verdict.recorded);

            let entries = db.list_usage_entries(None).await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].key, "MISSING");
            assert_eq!(entries[0].hwid.as_deref(), Some("H1"));
            assert_eq!(entries[0].outcome, Outcome::NotFound);
            assert_eq!(entries[0].attempted_at, now);
        });
    }
}

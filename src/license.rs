//! License domain types.
//!
//! A [`License`] pins an opaque key to at most one hardware identifier and an
//! expiry date. Expiry is a computed property: nothing is ever deleted because
//! it expired.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Year, month and day of the "never expires" sentinel date.
const NEVER_EXPIRES_YMD: (i32, u32, u32) = (2099, 12, 31);

/// The far-future date stored for unlimited licenses.
///
/// Unlimited licenses carry a real date so expiry comparison stays uniform.
pub fn never_expires() -> NaiveDate {
    let (y, m, d) = NEVER_EXPIRES_YMD;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX)
}

/// A license record as stored in the `licenses` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct License {
    /// Opaque, unique, immutable license key.
    #[cfg_attr(feature = "server", sqlx(rename = "license_key"))]
    pub key: String,
    /// Hardware identifier the license is bound to, if any.
    pub hwid: Option<String>,
    /// Last calendar day on which the license is valid.
    pub expires_at: NaiveDate,
    /// When the license was issued.
    pub created_at: NaiveDateTime,
}

impl License {
    /// Whether the license has been bound to a hardware identifier.
    pub fn is_bound(&self) -> bool {
        self.hwid.is_some()
    }

    /// Whether the license is expired on `today`.
    ///
    /// Comparison is by date only; a license expiring today is still valid today.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expires_at < today
    }

    pub fn is_unlimited(&self) -> bool {
        self.expires_at >= never_expires()
    }

    /// Computed administrative status on `today`.
    pub fn status_on(&self, today: NaiveDate) -> LicenseStatus {
        if self.is_expired_on(today) {
            LicenseStatus::Expired
        } else if self.is_bound() {
            LicenseStatus::Active
        } else {
            LicenseStatus::Pending
        }
    }
}

/// Administrative view of a license's state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Bound to hardware and not expired.
    Active,
    /// Not expired, waiting for its first successful validation.
    Pending,
    /// Past its expiry date.
    Expired,
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Pending => "pending",
            LicenseStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// How long a newly created license stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LicenseDuration {
    OneDay,
    OneWeek,
    OneMonth,
    Unlimited,
}

impl LicenseDuration {
    /// Length in days, or `None` for unlimited.
    pub fn days(&self) -> Option<u64> {
        match self {
            LicenseDuration::OneDay => Some(1),
            LicenseDuration::OneWeek => Some(7),
            LicenseDuration::OneMonth => Some(30),
            LicenseDuration::Unlimited => None,
        }
    }

    /// Expiry date for a license issued on `today`.
    pub fn expires_at(&self, today: NaiveDate) -> NaiveDate {
        match self.days() {
            Some(days) => today
                .checked_add_days(Days::new(days))
                .unwrap_or_else(never_expires),
            None => never_expires(),
        }
    }
}

impl fmt::Display for LicenseDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days() {
            Some(days) => write!(f, "{}", days),
            None => write!(f, "unlimited"),
        }
    }
}

impl FromStr for LicenseDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" => Ok(LicenseDuration::OneDay),
            "7" => Ok(LicenseDuration::OneWeek),
            "30" => Ok(LicenseDuration::OneMonth),
            // legacy alias of "unlimited"
            "unlimited" | "infinito" | "never" => Ok(LicenseDuration::Unlimited),
            other => Err(format!(
                "unsupported duration '{other}' (expected one of: 1, 7, 30, unlimited)"
            )),
        }
    }
}

impl TryFrom<String> for LicenseDuration {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LicenseDuration> for String {
    fn from(duration: LicenseDuration) -> Self {
        duration.to_string()
    }
}

/// The result of a single validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Accepted,
    NotFound,
    Expired,
    HwidMismatch,
    Blocked,
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }

    /// Label written to the usage ledger.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted => "ACCEPTED",
            Outcome::NotFound => "NOT_FOUND",
            Outcome::Expired => "EXPIRED",
            Outcome::HwidMismatch => "HWID_MISMATCH",
            Outcome::Blocked => "BLOCKED",
        }
    }

    /// Client-facing rejection reason; `None` when accepted.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Outcome::Accepted => None,
            Outcome::NotFound => Some("not found"),
            Outcome::Expired => Some("expired"),
            Outcome::HwidMismatch => Some("hwid mismatch"),
            Outcome::Blocked => Some("blocked"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPTED" => Ok(Outcome::Accepted),
            "NOT_FOUND" => Ok(Outcome::NotFound),
            "EXPIRED" => Ok(Outcome::Expired),
            "HWID_MISMATCH" => Ok(Outcome::HwidMismatch),
            "BLOCKED" => Ok(Outcome::Blocked),
            other => Err(format!("unknown outcome label '{other}'")),
        }
    }
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

    #[test]
    fn duration_parses_form_values() {
        assert_eq!("1".parse::<LicenseDuration>(), Ok(LicenseDuration::OneDay));
        assert_eq!("7".parse::<LicenseDuration>(), Ok(LicenseDuration::OneWeek));
        assert_eq!("30".parse::<LicenseDuration>(), Ok(LicenseDuration::OneMonth));
        assert_eq!(
            "unlimited".parse::<LicenseDuration>(),
            Ok(LicenseDuration::Unlimited)
        );
        assert_eq!(
            "infinito".parse::<LicenseDuration>(),
            Ok(LicenseDuration::Unlimited)
        );
        assert!("14".parse::<LicenseDuration>().is_err());
        assert!("".parse::<LicenseDuration>().is_err());
    }

    #[test]
    fn duration_computes_expiry() {
        let today = date(2026, 2, 25);
        assert_eq!(LicenseDuration::OneDay.expires_at(today), date(2026, 2, 26));
        assert_eq!(LicenseDuration::OneWeek.expires_at(today), date(2026, 3, 4));
        assert_eq!(LicenseDuration::OneMonth.expires_at(today), date(2026, 3, 27));
        assert_eq!(LicenseDuration::Unlimited.expires_at(today), never_expires());
    }

    #[test]
    fn duration_serde_uses_strings() {
        let json = serde_json::to_string(&LicenseDuration::OneWeek).unwrap();
        assert_eq!(json, "\"7\"");
        let parsed: LicenseDuration = serde_json::from_str("\"unlimited\"").unwrap();
        assert_eq!(parsed, LicenseDuration::Unlimited);
        assert!(serde_json::from_str::<LicenseDuration>("\"2\"").is_err());
    }

    #[test]
    fn expiry_is_date_only() {
        let lic = license(None, date(2026, 5, 10));
        assert!(!lic.is_expired_on(date(2026, 5, 9)));
        assert!(!lic.is_expired_on(date(2026, 5, 10)));
        assert!(lic.is_expired_on(date(2026, 5, 11)));
    }

    #[test]
    fn status_reflects_binding_and_expiry() {
        let today = date(2026, 5, 10);
        assert_eq!(
            license(None, date(2026, 6, 1)).status_on(today),
            LicenseStatus::Pending
        );
        assert_eq!(
            license(Some("H1"), date(2026, 6, 1)).status_on(today),
            LicenseStatus::Active
        );
        assert_eq!(
            license(Some("H1"), date(2026, 5, 1)).status_on(today),
            LicenseStatus::Expired
        );
        assert_eq!(LicenseStatus::Pending.to_string(), "pending");
    }

    #[test]
    fn unlimited_uses_sentinel() {
        assert!(license(None, never_expires()).is_unlimited());
        assert!(!license(None, date(2030, 1, 1)).is_unlimited());
    }

    #[test]
    fn outcome_labels_round_trip() {
        for outcome in [
            Outcome::Accepted,
            Outcome::NotFound,
            Outcome::Expired,
            Outcome::HwidMismatch,
            Outcome::Blocked,
        ] {
            assert_eq!(outcome.label().parse::<Outcome>(), Ok(outcome));
        }
        assert!("MAYBE".parse::<Outcome>().is_err());
    }

    #[test]
    fn outcome_reasons() {
        assert_eq!(Outcome::Accepted.reason(), None);
        assert_eq!(Outcome::NotFound.reason(), Some("not found"));
        assert_eq!(Outcome::Expired.reason(), Some("expired"));
        assert_eq!(Outcome::HwidMismatch.reason(), Some("hwid mismatch"));
        assert_eq!(Outcome::Blocked.reason(), Some("blocked"));
    }
}

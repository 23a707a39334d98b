//! CSV export of the license list.

use crate::errors::{LicenseError, LicenseResult};
use crate::license::License;

/// Column headers of the exported file.
pub const CSV_HEADER: [&str; 3] = ["Key", "HWID", "Expires"];

/// Serialize licenses as CSV: one header row, then one row per license.
///
/// Unbound licenses get an empty HWID field; dates are `YYYY-MM-DD`.
pub fn licenses_to_csv(licenses: &[License]) -> LicenseResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(export_error)?;
    for license in licenses {
        let expires = license.expires_at.format("%Y-%m-%d").to_string();
        writer
            .write_record([
                license.key.as_str(),
                license.hwid.as_deref().unwrap_or(""),
                expires.as_str(),
            ])
            .map_err(export_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| LicenseError::ExportError(e.to_string()))
}

fn export_error(e: csv::Error) -> LicenseError {
    LicenseError::ExportError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn license(key: &str, hwid: Option<&str>, expires: (i32, u32, u32)) -> License {
        License {
            key: key.to_string(),
            hwid: hwid.map(String::from),
            expires_at: NaiveDate::from_ymd_opt(expires.0, expires.1, expires.2).unwrap(),
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn empty_list_has_header_only() {
        let bytes = licenses_to_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "Key,HWID,Expires\n");
    }

    #[test]
    fn rows_follow_header() {
        let bytes = licenses_to_csv(&[
            license("ABC", Some("H1"), (2026, 4, 1)),
            license("DEF", None, (2099, 12, 31)),
        ])
        .unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Key,HWID,Expires\nABC,H1,2026-04-01\nDEF,,2099-12-31\n"
        );
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let bytes = licenses_to_csv(&[license("A,B", Some("H\"1"), (2026, 4, 1))]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("\"A,B\",\"H\"\"1\",2026-04-01\n"));
    }
}

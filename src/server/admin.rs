//! Admin API handlers for license, block list and usage management.
//!
//! # Endpoints
//!
//! - `POST /api/v1/licenses` - Create a license
//! - `GET /api/v1/licenses?filter={text}` - List licenses, optionally filtered by key or hwid
//! - `GET /api/v1/licenses/export` - Export all licenses as CSV
//! - `GET /api/v1/licenses/{key}` - Get a license
//! - `DELETE /api/v1/licenses/{key}` - Delete a license (idempotent)
//! - `GET /api/v1/blocked` - List blocked hardware
//! - `GET /api/v1/blocked/{hwid}` - Check whether hardware is blocked
//! - `PUT /api/v1/blocked/{hwid}` - Block hardware (idempotent)
//! - `DELETE /api/v1/blocked/{hwid}` - Unblock hardware (idempotent)
//! - `GET /api/v1/usage` - Usage aggregated by key and hwid
//! - `GET /api/v1/usage/logs?limit={n}` - Raw usage ledger, newest first

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::license::{License, LicenseDuration, LicenseStatus};
use crate::server::api_error::ApiError;
use crate::server::handlers::AppState;
use crate::server::store::{BlockedHwid, UsageEntry, UsageRow};
use crate::server::validation::validate_hardware_id;

/// File name offered for the CSV export.
pub const EXPORT_FILE_NAME: &str = "licenses.csv";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a new license.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateLicenseRequest {
    pub key: String,
    /// Pre-assigned hardware identifier (optional)
    #[serde(default)]
    pub hwid: Option<String>,
    /// One of "1", "7", "30" or "unlimited"
    pub duration: String,
}

/// Query parameters for listing licenses.
#[derive(Debug, Default, Deserialize)]
pub struct ListLicensesQuery {
    /// Substring matched against key or hwid
    pub filter: Option<String>,
}

/// Query parameters for the raw usage log.
#[derive(Debug, Deserialize)]
pub struct UsageLogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: u32,
}

fn default_log_limit() -> u32 {
    500
}

/// Response for a single license.
#[derive(Debug, Serialize, Deserialize)]
pub struct LicenseResponse {
    pub key: String,
    pub hwid: Option<String>,
    pub expires_at: String,
    pub created_at: String,
    pub status: LicenseStatus,
    pub is_bound: bool,
    pub unlimited: bool,
}

impl From<License> for LicenseResponse {
    fn from(license: License) -> Self {
        let today = Utc::now().date_naive();
        let status = license.status_on(today);
        let is_bound = license.is_bound();
        let unlimited = license.is_unlimited();

        Self {
            key: license.key,
            hwid: license.hwid,
            expires_at: license.expires_at.format("%Y-%m-%d").to_string(),
            created_at: license.created_at.to_string(),
            status,
            is_bound,
            unlimited,
        }
    }
}

/// Response for listing licenses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListLicensesResponse {
    pub licenses: Vec<LicenseResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteLicenseResponse {
    pub success: bool,
    /// False when the key did not exist
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockStatusResponse {
    pub hwid: String,
    pub blocked: bool,
}

#[derive(Debug, Serialize)]
pub struct ListBlockedResponse {
    pub blocked: Vec<BlockedHwid>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UsageReportResponse {
    pub rows: Vec<UsageRow>,
}

#[derive(Debug, Serialize)]
pub struct UsageLogsResponse {
    pub entries: Vec<UsageEntry>,
}

// ============================================================================
// License Handlers
// ============================================================================

/// Create a new license.
///
/// `POST /api/v1/licenses`
pub async fn create_license_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    info!("Creating license key={}", payload.key);

    let duration: LicenseDuration = payload
        .duration
        .parse()
        .map_err(|e: String| ApiError::invalid_field("duration", &e))?;

    let now = Utc::now().naive_utc();
    let license = state
        .db
        .create_license(&payload.key, payload.hwid.as_deref(), duration, now)
        .await?;

    Ok((StatusCode::CREATED, Json(license.into())))
}

/// List licenses.
///
/// `GET /api/v1/licenses?filter={text}`
pub async fn list_licenses_handler(
    State(state): State<AppState>,
    Query(query): Query<ListLicensesQuery>,
) -> Result<Json<ListLicensesResponse>, ApiError> {
    let licenses = state.db.list_licenses(query.filter.as_deref()).await?;
    let licenses: Vec<LicenseResponse> = licenses.into_iter().map(Into::into).collect();
    let total = licenses.len();

    Ok(Json(ListLicensesResponse { licenses, total }))
}

/// Get a license by key.
///
/// `GET /api/v1/licenses/{key}`
pub async fn get_license_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LicenseResponse>, ApiError> {
    let license = state.db.find_license(&key).await?;
    Ok(Json(license.into()))
}

/// Delete a license. Succeeds whether or not the key existed.
///
/// `DELETE /api/v1/licenses/{key}`
pub async fn delete_license_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteLicenseResponse>, ApiError> {
    info!("Deleting license key={}", key);

    let deleted = state.db.delete_license(&key).await?;
    Ok(Json(DeleteLicenseResponse {
        success: true,
        deleted,
    }))
}

/// Export all licenses as a CSV attachment.
///
/// `GET /api/v1/licenses/export`
pub async fn export_licenses_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.db.export_licenses_csv().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}

// ============================================================================
// Block List Handlers
// ============================================================================

/// `GET /api/v1/blocked`
pub async fn list_blocked_handler(
    State(state): State<AppState>,
) -> Result<Json<ListBlockedResponse>, ApiError> {
    let blocked = state.db.list_blocked().await?;
    let total = blocked.len();
    Ok(Json(ListBlockedResponse { blocked, total }))
}

/// `GET /api/v1/blocked/{hwid}`
pub async fn blocked_status_handler(
    State(state): State<AppState>,
    Path(hwid): Path<String>,
) -> Result<Json<BlockStatusResponse>, ApiError> {
    let blocked = state.db.is_blocked(&hwid).await?;
    Ok(Json(BlockStatusResponse { hwid, blocked }))
}

/// `PUT /api/v1/blocked/{hwid}`
pub async fn block_hwid_handler(
    State(state): State<AppState>,
    Path(hwid): Path<String>,
) -> Result<Json<BlockStatusResponse>, ApiError> {
    info!("Blocking hwid={}", hwid);

    validate_hardware_id(&hwid, "hwid")?;
    state.db.block_hwid(&hwid, Utc::now().naive_utc()).await?;
    Ok(Json(BlockStatusResponse {
        hwid,
        blocked: true,
    }))
}

/// `DELETE /api/v1/blocked/{hwid}`
pub async fn unblock_hwid_handler(
    State(state): State<AppState>,
    Path(hwid): Path<String>,
) -> Result<Json<BlockStatusResponse>, ApiError> {
    info!("Unblocking hwid={}", hwid);

    validate_hardware_id(&hwid, "hwid")?;
    state.db.unblock_hwid(&hwid).await?;
    Ok(Json(BlockStatusResponse {
        hwid,
        blocked: false,
    }))
}

// ============================================================================
// Usage Handlers
// ============================================================================

/// `GET /api/v1/usage`
pub async fn usage_report_handler(
    State(state): State<AppState>,
) -> Result<Json<UsageReportResponse>, ApiError> {
    let rows = state.db.usage_report().await?;
    Ok(Json(UsageReportResponse { rows }))
}

/// `GET /api/v1/usage/logs?limit={n}`
pub async fn usage_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<UsageLogsQuery>,
) -> Result<Json<UsageLogsResponse>, ApiError> {
    let entries = state.db.list_usage_entries(Some(query.limit)).await?;
    Ok(Json(UsageLogsResponse { entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::never_expires;
    use chrono::Days;

    #[test]
    fn license_response_formats_dates_and_status() {
        let today = Utc::now().date_naive();
        let license = License {
            key: "ABC".to_string(),
            hwid: None,
            expires_at: today.checked_add_days(Days::new(7)).unwrap(),
            created_at: today.and_hms_opt(9, 30, 0).unwrap(),
        };
        let expected_expiry = license.expires_at.format("%Y-%m-%d").to_string();

        let response = LicenseResponse::from(license);
        assert_eq!(response.expires_at, expected_expiry);
        assert_eq!(response.status, LicenseStatus::Pending);
        assert!(!response.is_bound);
        assert!(!response.unlimited);
    }

    #[test]
    fn unlimited_license_response() {
        let license = License {
            key: "FOREVER".to_string(),
            hwid: Some("H1".to_string()),
            expires_at: never_expires(),
            created_at: Utc::now().naive_utc(),
        };

        let response = LicenseResponse::from(license);
        assert_eq!(response.expires_at, "2099-12-31");
        assert_eq!(response.status, LicenseStatus::Active);
        assert!(response.unlimited);
    }

    #[test]
    fn create_request_defaults_hwid() {
        let req: CreateLicenseRequest =
            serde_json::from_str(r#"{"key": "ABC", "duration": "7"}"#).unwrap();
        assert_eq!(req.hwid, None);
        assert_eq!(req.duration, "7");
    }
}

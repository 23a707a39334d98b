//! Standardized API error responses for Keystone endpoints.
//!
//! All error responses follow this JSON structure:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "DUPLICATE_KEY",
//!     "message": "license key already exists: ABC",
//!     "details": null
//!   }
//! }
//! ```
//!
//! Rejected validations are *not* errors: `/verify` answers them with
//! `{"valid": false, "reason": ...}` and status 200.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::LicenseError;
use crate::server::validation::ValidationError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// License key was not found
    LicenseNotFound,
    /// A license with this key already exists
    DuplicateKey,
    /// Request payload is invalid or malformed
    InvalidRequest,
    /// A field value is invalid
    InvalidField,
    /// Persistence layer failed
    StorageUnavailable,
    /// Server configuration error
    ConfigError,
    /// Unexpected internal server error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidField => StatusCode::BAD_REQUEST,
            ErrorCode::LicenseNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateKey => StatusCode::CONFLICT,
            ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::LicenseNotFound => "The requested license does not exist",
            ErrorCode::DuplicateKey => "A license with this key already exists",
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::InvalidField => "A field value is invalid",
            ErrorCode::StorageUnavailable => "License storage is unavailable",
            ErrorCode::ConfigError => "Server configuration error",
            ErrorCode::InternalError => "An unexpected error occurred",
        }
    }
}

/// The inner error object containing code, message, and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    /// Optional additional details (field name, constraint violated, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: code.default_message().to_string(),
                details: None,
            },
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    /// Invalid request error with field details.
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::with_details(
            ErrorCode::InvalidField,
            format!("Invalid value for '{}': {}", field, reason),
            serde_json::json!({ "field": field }),
        )
    }

    /// Storage failure (internal details hidden from the client).
    pub fn storage_unavailable() -> Self {
        Self::new(ErrorCode::StorageUnavailable)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::DuplicateKey(key) => ApiError::with_details(
                ErrorCode::DuplicateKey,
                format!("License '{}' already exists", key),
                serde_json::json!({ "key": key }),
            ),
            LicenseError::LicenseNotFound(key) => ApiError::with_message(
                ErrorCode::LicenseNotFound,
                format!("License '{}' not found", key),
            ),
            LicenseError::InvalidRequest(msg) => {
                ApiError::with_message(ErrorCode::InvalidRequest, msg)
            }
            LicenseError::StorageUnavailable(_) => ApiError::storage_unavailable(),
            LicenseError::ConfigError(msg) => ApiError::with_message(ErrorCode::ConfigError, msg),
            LicenseError::ExportError(msg) | LicenseError::ServerError(msg) => {
                ApiError::with_message(ErrorCode::InternalError, msg)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid_field(&err.field, &err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(
            ErrorCode::LicenseNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorCode::DuplicateKey.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InvalidField.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::StorageUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn api_error_serialization() {
        let err = ApiError::new(ErrorCode::LicenseNotFound);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("LICENSE_NOT_FOUND"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn duplicate_key_conversion_carries_key() {
        let api_err: ApiError = LicenseError::DuplicateKey("ABC".to_string()).into();
        assert_eq!(api_err.error.code, ErrorCode::DuplicateKey);
        assert_eq!(api_err.error.details, Some(serde_json::json!({ "key": "ABC" })));
    }

    #[test]
    fn storage_details_are_hidden() {
        let api_err: ApiError =
            LicenseError::StorageUnavailable("disk I/O error at /var/db".to_string()).into();
        assert_eq!(api_err.error.code, ErrorCode::StorageUnavailable);
        assert!(!api_err.error.message.contains("/var/db"));
    }

    #[test]
    fn validation_error_conversion() {
        let err = ValidationError {
            field: "hwid".to_string(),
            message: "cannot be empty".to_string(),
        };
        let api_err: ApiError = err.into();
        assert_eq!(api_err.error.code, ErrorCode::InvalidField);
        assert_eq!(api_err.error.details, Some(serde_json::json!({ "field": "hwid" })));
    }
}

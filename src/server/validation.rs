//! Request validation utilities for Keystone.
//!
//! License keys are issued by administrators and must be printable tokens of
//! bounded length. Hardware identifiers come from clients and are opaque; the
//! only rejected value is the empty string, which means "not presented".

use std::fmt;

use crate::errors::LicenseError;

/// Maximum accepted license key length.
pub const MAX_KEY_LENGTH: usize = 128;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for LicenseError {
    fn from(err: ValidationError) -> Self {
        LicenseError::InvalidRequest(err.to_string())
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn is_identifier(value: &str) -> bool {
    regex::Regex::new(r"^[^\s\p{Cc}]+$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Validate a license key.
///
/// # Example
/// ```
/// use keystone::server::validation::validate_license_key;
///
/// assert!(validate_license_key("ABC-123", "key").is_ok());
/// assert!(validate_license_key("", "key").is_err());
/// assert!(validate_license_key("has space", "key").is_err());
/// ```
pub fn validate_license_key(value: &str, field_name: &str) -> ValidationResult<()> {
    validate_length(value, 1, MAX_KEY_LENGTH, field_name)?;

    if is_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "must not contain whitespace or control characters".to_string(),
        })
    }
}

/// Validate a hardware identifier.
///
/// Hardware identifiers are opaque: any non-empty string is accepted, on the
/// bind path and the block path alike.
///
/// # Example
/// ```
/// use keystone::server::validation::validate_hardware_id;
///
/// assert!(validate_hardware_id("H1", "hwid").is_ok());
/// assert!(validate_hardware_id("my pc", "hwid").is_ok());
/// assert!(validate_hardware_id("", "hwid").is_err());
/// ```
pub fn validate_hardware_id(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate string length (in characters) is within bounds.
///
/// # Example
/// ```
/// use keystone::server::validation::validate_length;
///
/// assert!(validate_length("hello", 1, 10, "name").is_ok());
/// assert!(validate_length("", 1, 10, "name").is_err());
/// assert!(validate_length("a".repeat(100).as_str(), 1, 10, "name").is_err());
/// ```
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at least {} characters", min),
        })
    } else if len > max {
        Err(ValidationError {
            field: field_name.to_string(),
            message: format!("must be at most {} characters", max),
        })
    } else {
        Ok(())
    }
}

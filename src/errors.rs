//! Error types shared by the store, the validation engine and the HTTP layer.
//!
//! Validation outcomes (not found, expired, hwid mismatch, blocked) are *not*
//! errors: they are ordinary [`Outcome`](crate::license::Outcome) values.
//! `LicenseError` covers administrative failures and infrastructure problems.

use thiserror::Error;

/// Errors surfaced by Keystone operations.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// An administrative create collided with an existing key.
    #[error("license key already exists: {0}")]
    DuplicateKey(String),

    /// An administrative lookup found no license with this key.
    #[error("license not found: {0}")]
    LicenseNotFound(String),

    /// The caller supplied malformed input.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The persistence layer failed; the decision could not be made or recorded.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("export failed: {0}")]
    ExportError(String),

    /// The HTTP listener could not be started or stopped unexpectedly.
    #[error("server error: {0}")]
    ServerError(String),
}

impl LicenseError {
    /// True when the failure comes from the storage layer rather than the caller.
    pub fn is_storage(&self) -> bool {
        matches!(self, LicenseError::StorageUnavailable(_))
    }
}

pub type LicenseResult<T> = Result<T, LicenseError>;

// src/server/mod.rs

//! Server-side components for Keystone.
//!
//! This module contains:
//! - `database`    → DB abstraction over SQLite/Postgres
//! - `store`       → License store, usage ledger and block list operations
//! - `engine`      → Validation rules and the one-time hwid binding
//! - `handlers`    → Client-facing HTTP handlers (`/verify`, `/health`)
//! - `admin`       → Admin API for licenses, block list and usage (requires `admin-api` feature)
//! - `routes`      → Router builder
//! - `api_error`   → Standardized JSON error responses
//! - `logging`     → Structured events and request logging middleware
//! - `validation`  → Request validation utilities

pub mod api_error;
pub mod database;
pub mod engine;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod store;
pub mod validation;

#[cfg(feature = "admin-api")]
pub mod admin;

pub use api_error::{ApiError, ErrorCode};
pub use database::Database;
pub use engine::{decide, validate, Verdict};
pub use handlers::{health_handler, validate_handler, AppState, ValidateRequest, ValidateResponse};
pub use routes::build_router;
pub use store::{BlockedHwid, UsageEntry, UsageRow};

#[cfg(feature = "admin-api")]
pub use admin::{
    block_hwid_handler, blocked_status_handler, create_license_handler, delete_license_handler,
    export_licenses_handler, get_license_handler, list_blocked_handler, list_licenses_handler,
    unblock_hwid_handler, usage_logs_handler, usage_report_handler, CreateLicenseRequest,
    LicenseResponse, ListLicensesResponse,
};

pub use validation::{
    validate_hardware_id, validate_length, validate_license_key,
    ValidationError, ValidationResult,
};

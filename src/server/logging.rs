//! Structured logging for Keystone.
//!
//! This module provides:
//! - License and hardware state-change events for audit and debugging
//! - Request logging middleware with a unique request ID per request
//! - The health check response body
//!
//! # Usage
//!
//! ```rust,ignore
//! use axum::middleware;
//! use keystone::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/health", get(health_handler))
//!     .layer(middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::license::Outcome;

/// License and hardware state change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseEvent {
    /// License was created
    Created,
    /// License was deleted
    Deleted,
    /// License was bound to hardware on its first successful validation
    Bound,
    /// License was validated successfully
    Validated,
    /// License validation was rejected
    ValidationFailed,
    /// Hardware was added to the block list
    Blocked,
    /// Hardware was removed from the block list
    Unblocked,
}

impl std::fmt::Display for LicenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseEvent::Created => "created",
            LicenseEvent::Deleted => "deleted",
            LicenseEvent::Bound => "bound",
            LicenseEvent::Validated => "validated",
            LicenseEvent::ValidationFailed => "validation_failed",
            LicenseEvent::Blocked => "blocked",
            LicenseEvent::Unblocked => "unblocked",
        };
        write!(f, "{}", s)
    }
}

/// Log a license state change event (create, delete).
///
/// # Arguments
///
/// * `event` - The type of license event
/// * `key` - The license key
/// * `details` - Optional additional details about the event
pub fn log_license_event(event: LicenseEvent, key: &str, details: Option<&str>) {
    let span = info_span!(
        "license_event",
        event = %event,
        license_key = %key,
    );
    let _enter = span.enter();

    match details {
        Some(d) => info!(details = %d, "License event occurred"),
        None => info!("License event occurred"),
    }
}

/// Log a license event that involves a specific hardware identifier.
pub fn log_license_binding_event(event: LicenseEvent, key: &str, hwid: &str) {
    let span = info_span!(
        "license_binding",
        event = %event,
        license_key = %key,
        hwid = %hwid,
    );
    let _enter = span.enter();

    info!("License binding event occurred");
}

/// Log the outcome of a validation attempt.
///
/// The presented hwid is recorded as a span field (`-` when none was sent) so
/// rejected devices can be traced back from the logs.
pub fn log_validation_event(key: &str, hwid: Option<&str>, outcome: Outcome) {
    let event = if outcome.is_accepted() {
        LicenseEvent::Validated
    } else {
        LicenseEvent::ValidationFailed
    };
    let span = info_span!(
        "license_validation",
        event = %event,
        license_key = %key,
        hwid = %hwid.unwrap_or("-"),
        outcome = %outcome,
    );
    let _enter = span.enter();

    match outcome.reason() {
        None => info!("License validated"),
        Some(reason) => warn!(reason, "License validation rejected"),
    }
}

/// Log a block list change.
pub fn log_hardware_event(event: LicenseEvent, hwid: &str) {
    let span = info_span!("hardware_event", event = %event, hwid = %hwid);
    let _enter = span.enter();

    warn!("Hardware block list changed");
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// This middleware:
/// 1. Generates a unique request ID for each incoming request
/// 2. Creates a tracing span with the request ID
/// 3. Logs the request method and path
/// 4. Measures and logs the response time
/// 5. Adds the request ID to the response headers
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    /// Database type (sqlite or postgres)
    pub db_type: String,
}

impl HealthResponse {
    pub fn new(db_connected: bool, db_type: &str) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: "keystone".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
                db_type: db_type.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_valid_uuid() {
        let id = generate_request_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }

    #[test]
    fn event_names() {
        assert_eq!(LicenseEvent::ValidationFailed.to_string(), "validation_failed");
        assert_eq!(LicenseEvent::Bound.to_string(), "bound");
        assert_eq!(LicenseEvent::Unblocked.to_string(), "unblocked");
    }

    #[test]
    fn validation_event_without_hwid() {
        log_validation_event("ABC", None, Outcome::Accepted);
        log_validation_event("ABC", Some("my pc"), Outcome::HwidMismatch);
    }

    #[test]
    fn health_response_healthy() {
        let health = HealthResponse::new(true, "sqlite");
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "keystone");
        assert!(health.database.connected);
    }

    #[test]
    fn health_response_degraded() {
        let health = HealthResponse::new(false, "postgres");
        assert_eq!(health.status, "degraded");
        assert!(!health.database.connected);
    }
}

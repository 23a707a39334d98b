use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::api_error::ApiError;
use crate::server::database::Database;
use crate::server::engine;
use crate::server::logging::HealthResponse;

/// Shared application state for handlers.
///
/// Wraps the injected storage handle; handlers never open their own
/// connections.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Request body for license validation.
#[derive(Debug, Deserialize, Serialize)]
pub struct ValidateRequest {
    pub key: String,
    /// Hardware identifier of the calling machine. May be omitted.
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Response body for license validation.
///
/// `reason` is present only when `valid` is false.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Validate a license for the calling hardware.
///
/// Business outcomes (not found, expired, hwid mismatch, blocked) are always
/// answered with `200 OK` and `valid: false`, including for keys that could
/// never have been issued. Only a storage failure turns into an error
/// response. Request size is bounded by the router's body limit.
pub async fn validate_handler(
    State(state): State<AppState>,
    Json(payload): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    info!("Validating license key={}", payload.key);

    let now = Utc::now().naive_utc();
    let verdict = engine::validate(&state.db, &payload.key, payload.hwid.as_deref(), now)
        .await
        .map_err(|e| {
            if e.is_storage() {
                warn!("Validation for key={} could not be decided: {}", payload.key, e);
            }
            ApiError::from(e)
        })?;

    Ok(Json(ValidateResponse {
        valid: verdict.is_valid(),
        reason: verdict.outcome.reason().map(String::from),
    }))
}

/// Liveness and database connectivity check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.db.ping().await;
    if !connected {
        warn!("Health check: database is not reachable");
    }

    Json(HealthResponse::new(connected, state.db.db_type()))
}

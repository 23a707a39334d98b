use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

#[cfg(feature = "admin-api")]
use crate::server::admin::{
    block_hwid_handler, blocked_status_handler, create_license_handler, delete_license_handler,
    export_licenses_handler, get_license_handler, list_blocked_handler, list_licenses_handler,
    unblock_hwid_handler, usage_logs_handler, usage_report_handler,
};
use crate::server::handlers::{health_handler, validate_handler, AppState};
use crate::server::logging::request_logging_middleware;

/// Largest accepted request body. Keys and hardware identifiers are short;
/// anything bigger is rejected by the extractor before reaching a handler.
pub const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024;

/// Build the main application router for the Keystone server.
///
/// # Routes
///
/// ## Client endpoints
/// - `POST /verify` - Validate a license for the calling hardware
/// - `POST /api/v1/client/validate` - Same as `/verify`
/// - `GET /health` - Liveness and database connectivity
///
/// ## Admin endpoints (requires `admin-api` feature)
/// - `POST /api/v1/licenses` - Create a license
/// - `GET /api/v1/licenses` - List licenses (`?filter=` optional)
/// - `GET /api/v1/licenses/export` - CSV export
/// - `GET /api/v1/licenses/{key}` - Get a license
/// - `DELETE /api/v1/licenses/{key}` - Delete a license
/// - `GET /api/v1/blocked` - List blocked hardware
/// - `GET|PUT|DELETE /api/v1/blocked/{hwid}` - Query, block, unblock hardware
/// - `GET /api/v1/usage` - Aggregated usage report
/// - `GET /api/v1/usage/logs` - Raw usage ledger (`?limit=` optional)
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/verify", post(validate_handler))
        .route("/api/v1/client/validate", post(validate_handler))
        .route("/health", get(health_handler));

    #[cfg(feature = "admin-api")]
    let router = router
        .route(
            "/api/v1/licenses",
            post(create_license_handler).get(list_licenses_handler),
        )
        .route("/api/v1/licenses/export", get(export_licenses_handler))
        .route(
            "/api/v1/licenses/:key",
            get(get_license_handler).delete(delete_license_handler),
        )
        .route("/api/v1/blocked", get(list_blocked_handler))
        .route(
            "/api/v1/blocked/:hwid",
            get(blocked_status_handler)
                .put(block_hwid_handler)
                .delete(unblock_hwid_handler),
        )
        .route("/api/v1/usage", get(usage_report_handler))
        .route("/api/v1/usage/logs", get(usage_logs_handler));

    router
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}

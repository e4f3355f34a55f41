//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::application::services::SchemaStatus;
use crate::state::AppState;

/// Returns service health with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: schema is ready and the store answers
/// - **503 Service Unavailable**: schema pending or failed, or store unreachable
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "backend": "postgres",
///   "checks": {
///     "schema": { "status": "ok", "message": "2 applied, 0 skipped" },
///     "database": { "status": "ok", "message": "Connected" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let schema_check = check_schema(&state);
    let db_check = check_database(&state).await;

    let all_healthy = schema_check.is_ok() && db_check.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.schema.kind().to_string(),
        checks: HealthChecks {
            schema: schema_check,
            database: db_check,
        },
    };

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

fn check_schema(state: &AppState) -> CheckStatus {
    match &*state.schema_status.borrow() {
        SchemaStatus::Ready(summary) => CheckStatus::ok(summary.clone()),
        SchemaStatus::Pending => CheckStatus {
            status: "pending".to_string(),
            message: Some("Schema initialization in progress".to_string()),
        },
        SchemaStatus::Failed(reason) => CheckStatus::error(reason.clone()),
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.schema.check_connection().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {e}")),
    }
}

use axum::Json;

use crate::api::types::HealthResponse;

/// `GET /`: liveness check.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Tax Memo API is running",
        version: crate::config::APP_VERSION,
    })
}

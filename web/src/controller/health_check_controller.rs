use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    ok: bool,
    /// Milliseconds since the Unix epoch
    timestamp: i64,
}

/// GET report that the relay is up
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Relay is up and responding to requests", body = HealthStatus),
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthStatus {
            ok: true,
            timestamp: Utc::now().timestamp_millis(),
        }),
    )
}

//! `GET health` (spec §4.12): liveness without a database round-trip, plus a
//! detailed variant that also checks the checkpoint store.

use axum::{extract::State, http::StatusCode, Json};

use crate::api::{models::HealthResponse, response, state::OrchestrationState};

/// Basic liveness probe: no database round-trip, so it stays fast even if
/// the checkpoint store is under load.
pub async fn health() -> impl axum::response::IntoResponse {
    let health = HealthResponse::new("ok", "unknown");
    response::ok(health)
}

/// Detailed health check including checkpoint store connectivity.
pub async fn health_detailed(
    State(state): State<OrchestrationState>,
) -> (StatusCode, Json<HealthResponse>) {
    if state.database_healthy().await {
        (StatusCode::OK, Json(HealthResponse::new("ok", "connected")))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("error", "error")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_shape() {
        let health = HealthResponse::new("ok", "connected");
        assert_eq!(health.status, "ok");
    }
}

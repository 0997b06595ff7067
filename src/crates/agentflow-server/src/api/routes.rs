//! Route table for the public API surface (spec §4.12).

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, middleware::cors_layer, state::OrchestrationState};

/// Build the complete API router over an already-constructed
/// [`OrchestrationState`].
pub fn create_router(state: OrchestrationState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/system/health", get(handlers::health_detailed))
        .route("/orchestrate", post(handlers::orchestrate))
        .route("/execute/:task_id", post(handlers::execute_task))
        .route("/tasks/:task_id", get(handlers::get_task))
        .route("/chat/stream", post(handlers::chat_stream))
        .route("/workflow/execute", post(handlers::workflow_execute))
        .route("/workflow/status/:id", get(handlers::workflow_status))
        .route("/workflow/resume/:id", post(handlers::workflow_resume))
        .route("/approvals/:id/approve", post(handlers::approve))
        .route("/approvals/:id/reject", post(handlers::reject))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_creation_does_not_panic() {
        // Router construction is pure wiring; the state itself is built in
        // `main` and is not constructible without a live database pool, so
        // this only exercises the route table shape via the type system.
        fn _assert_router_fn(_f: fn(OrchestrationState) -> Router) {}
        _assert_router_fn(create_router);
    }
}

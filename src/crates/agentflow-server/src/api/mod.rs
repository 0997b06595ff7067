//! Public API surface (spec §4.12): HTTP/REST + SSE entry points into the
//! orchestrator — intent routing (`orchestrate`), workflow execution and
//! resumption, the chat streaming endpoint, HITL approval decisions, and
//! health reporting.

pub mod error;
pub mod response;
pub mod middleware;
pub mod models;
pub mod handlers;
pub mod routes;
pub mod sse;
pub mod state;

pub use error::{ApiError, ApiResult, ApiErrorResponse};
pub use response::{SuccessResponse, ErrorResponse, PaginatedResponse};
pub use routes::create_router;
pub use middleware::cors_layer;
pub use state::OrchestrationState;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::api::error::{ApiError, ApiResult};
    pub use crate::api::models::*;
    pub use crate::api::response::*;
}

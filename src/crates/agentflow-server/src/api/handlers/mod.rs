//! API request handlers
//!
//! Handler functions for the public API surface (spec §4.12): orchestration
//! entry points, workflow execution/resumption, HITL approval decisions,
//! and health.

pub mod health;
pub mod orchestration;

pub use health::{health, health_detailed};
pub use orchestration::{
    approve, chat_stream, execute_task, get_task, orchestrate, reject, workflow_execute,
    workflow_resume, workflow_status,
};

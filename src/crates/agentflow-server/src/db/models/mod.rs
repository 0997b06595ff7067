//! Database models
//!
//! Core data models for persistent storage, matching the persisted state
//! layout from the external interface contract: `checkpoints`,
//! `resource_locks`, `approvals`, `sessions`, plus `workflow` (named
//! template definitions). All timestamp fields are stored as ISO8601
//! strings (TEXT in SQLite) due to sqlx/SQLite type limitations with
//! `chrono::DateTime<Utc>`.

pub mod approval;
pub mod checkpoint;
pub mod resource_lock;
pub mod session;
pub mod task;
pub mod workflow;

pub use approval::ApprovalRow;
pub use checkpoint::Checkpoint;
pub use resource_lock::ResourceLockRow;
pub use session::Session;
pub use task::TaskRow;
pub use workflow::Workflow;

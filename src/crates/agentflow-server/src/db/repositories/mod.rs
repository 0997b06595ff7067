//! Repository pattern implementations for database access
//!
//! Repository structs for the persisted state layout: checkpoints, resource
//! locks, approvals, sessions, and named workflow templates.

pub mod approval_repo;
pub mod checkpoint_repo;
pub mod resource_lock_repo;
pub mod session_repo;
pub mod task_repo;
pub mod workflow_repo;

pub use approval_repo::ApprovalRepository;
pub use checkpoint_repo::CheckpointRepository;
pub use resource_lock_repo::ResourceLockRepository;
pub use session_repo::SessionRepository;
pub use task_repo::TaskRepository;
pub use workflow_repo::WorkflowRepository;

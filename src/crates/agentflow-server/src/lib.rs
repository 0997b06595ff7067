//! Orchestration engine for coordinating workflows in agentflow
//!
//! This crate provides orchestration capabilities for managing and coordinating
//! complex workflows, tasks, and execution pipelines.

pub mod agent_slot;
pub mod api;
pub mod cancellation;
pub mod db;
pub mod events;
pub mod graph_engine;
pub mod hitl;
pub mod intent;
pub mod locks;
pub mod router;
pub mod session;
pub mod state;
pub mod template_engine;
pub mod tool_binder;
pub mod tool_gateway;
pub mod version;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during orchestration.
///
/// Variants map onto the error kinds the Orchestration Core must distinguish:
/// some are recoverable from inside an agent's own context (folded back into
/// a tool-result message and never surfaced to the user), others are terminal
/// for the workflow and surface a user-visible `error` event.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Workflow execution error
    #[error("Workflow execution failed: {0}")]
    ExecutionFailed(String),

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// LLM provider returned a transient error (429/503/network). Recoverable:
    /// the agent slot retries with exponential backoff before giving up.
    #[error("transient provider error: {0}")]
    TransientProviderError(String),

    /// A tool invocation failed. Recoverable: folded into a tool-result
    /// message with an `error` flag so the agent can react to it.
    #[error("tool invocation failed: {0}")]
    ToolInvocationError(String),

    /// Optimistic checkpoint version conflict. Recoverable once: the node
    /// reloads the latest checkpoint and retries a single time.
    #[error("checkpoint version conflict for thread {thread_id}")]
    PersistenceConflict { thread_id: String },

    /// A resource lock was already held and `wait_timeout` was zero or
    /// elapsed before it became available. Terminal for the requesting node.
    #[error("resource {resource_id} is locked")]
    LockContended { resource_id: String },

    /// A resource lock expired while its workflow was parked for approval.
    /// Terminal for the workflow.
    #[error("lock on {resource_id} expired before approval arrived")]
    LockExpired { resource_id: String },

    /// An approval handle was not resolved before its expiry. Terminal.
    #[error("approval {approval_id} timed out")]
    ApprovalTimeout { approval_id: String },

    /// The caller disconnected or cancelled the run. Terminal, workflow is
    /// marked `CANCELLED`.
    #[error("workflow cancelled by caller")]
    CancelledByCaller,

    /// An agent slot's tool-call loop exceeded `MAX_TOOL_ITERATIONS`.
    /// Graceful degradation: a final assistant message is emitted instead of
    /// failing the node.
    #[error("max tool iterations exceeded")]
    MaxIterationsExceeded,

    /// The intent classifier could not map a message to a known route.
    /// Routed to the conversational handler with an apology rather than
    /// failing the turn.
    #[error("unroutable intent: {0}")]
    UnroutableIntent(String),

    /// A structural invariant of the state machine was violated. Aborts the
    /// workflow and preserves the last good checkpoint; this is the only
    /// error kind that should ever originate from a `panic`-adjacent bug
    /// rather than ordinary control flow.
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),

    /// General error
    #[error("Orchestrator error: {0}")]
    General(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// Whether this error kind can be reflected back into an agent's own
    /// context (tool-result message) rather than terminating the workflow.
    pub fn is_agent_recoverable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::TransientProviderError(_)
                | OrchestratorError::ToolInvocationError(_)
        )
    }

    /// Whether this error kind terminates the owning workflow outright.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorError::LockExpired { .. }
                | OrchestratorError::ApprovalTimeout { .. }
                | OrchestratorError::CancelledByCaller
                | OrchestratorError::InternalInvariantViolation(_)
        )
    }
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

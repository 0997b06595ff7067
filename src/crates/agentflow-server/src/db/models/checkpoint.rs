//! Checkpoint row model for database persistence.
//!
//! Mirrors the persisted state layout from the external interface contract:
//! `checkpoints(thread_id, version, snapshot, created_at)`. `version` is
//! strictly increasing per `thread_id`; the row with the largest `version`
//! for a given `thread_id` is the authoritative current state.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single persisted checkpoint row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Checkpoint {
    /// Thread (workflow) this checkpoint belongs to.
    pub thread_id: String,

    /// Strictly-increasing version number for this `thread_id`.
    pub version: i64,

    /// Canonical JSON serialization of the `WorkflowState` snapshot.
    pub snapshot: String,

    /// Creation timestamp (ISO8601 string).
    pub created_at: String,
}

impl Checkpoint {
    /// Build a new checkpoint row for insertion.
    pub fn new(thread_id: String, version: i64, snapshot: String) -> Self {
        Self {
            thread_id,
            version,
            snapshot,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

//! Session model for database persistence
//!
//! A [`Session`] is a per-caller, append-only conversation log (spec §4.11
//! Session & History), stored separately from workflow state so multiple
//! workflows may share one session. `messages` holds the canonical JSON
//! serialization of the bounded-recall message list.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents a conversation session row.
///
/// # Timestamps
/// All timestamp fields are ISO8601 strings due to SQLite type limitations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Caller-supplied or server-allocated session identifier.
    pub session_id: String,

    /// JSON array of `{role, content}` messages, bounded to the recall window.
    pub messages: String,

    /// Session last update timestamp (ISO8601 string).
    pub updated_at: String,
}

impl Session {
    /// Create a new, empty session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: "[]".to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_empty() {
        let session = Session::new("session-1");
        assert_eq!(session.session_id, "session-1");
        assert_eq!(session.messages, "[]");
    }
}

//! Resource lock row model, persisted so crashes auto-release via session
//! termination rather than leaving an orphaned advisory lock (spec §4.3).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceLockRow {
    pub resource_id: String,
    pub holder: String,
    pub acquired_at: String,
    pub expires_at: String,
}

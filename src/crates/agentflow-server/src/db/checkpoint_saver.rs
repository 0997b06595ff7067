//! Bridges the Checkpoint Store's SQL contract ([`CheckpointRepository`]) onto
//! `agentflow-core`'s graph-execution checkpointing trait
//! ([`agentflow_checkpoint::CheckpointSaver`]), so [`crate::graph_engine::WorkflowGraphEngine`]
//! persists through the same `checkpoints` table the rest of the orchestrator
//! reads via [`CheckpointRepository`].
//!
//! The graph's single channel carries a whole [`crate::state::WorkflowState`]
//! snapshot (see `graph_engine.rs`), so a checkpoint here is just that one
//! channel's value plus version bookkeeping — there's no per-channel
//! versioning to reconcile, which keeps this adapter much thinner than a
//! general multi-channel backend would need to be.

use crate::db::connection::DatabasePool;
use crate::db::repositories::CheckpointRepository;
use agentflow_checkpoint::checkpoint::ChannelVersions;
use agentflow_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointError, CheckpointMetadata, CheckpointSaver,
    CheckpointStream, CheckpointTuple, Result as CpResult,
};
use futures::stream;
use serde::{Deserialize, Serialize};

/// On-disk shape of a stored checkpoint: the graph-core [`Checkpoint`] plus
/// its [`CheckpointMetadata`], JSON-serialized as one row in `checkpoints`.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCheckpoint {
    checkpoint: Checkpoint,
    metadata: CheckpointMetadata,
}

pub struct SqlCheckpointSaver {
    pool: DatabasePool,
}

impl SqlCheckpointSaver {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn require_thread_id(config: &CheckpointConfig) -> CpResult<&str> {
        config
            .thread_id
            .as_deref()
            .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))
    }

    fn config_for(thread_id: &str, version: i64, ns: Option<String>) -> CheckpointConfig {
        let mut cfg = CheckpointConfig::new()
            .with_thread_id(thread_id.to_string())
            .with_checkpoint_id(version.to_string());
        cfg.checkpoint_ns = ns;
        cfg
    }
}

#[async_trait::async_trait]
impl CheckpointSaver for SqlCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> CpResult<Option<CheckpointTuple>> {
        let thread_id = Self::require_thread_id(config)?;

        let row = if let Some(checkpoint_id) = &config.checkpoint_id {
            let version: i64 = checkpoint_id
                .parse()
                .map_err(|_| CheckpointError::Invalid(format!("bad checkpoint_id {checkpoint_id}")))?;
            CheckpointRepository::load_at(&self.pool, thread_id, version)
                .await
                .map_err(|e| CheckpointError::Storage(e.to_string()))?
        } else {
            CheckpointRepository::load_latest(&self.pool, thread_id)
                .await
                .map_err(|e| CheckpointError::Storage(e.to_string()))?
        };

        let Some(row) = row else { return Ok(None) };
        let stored: StoredCheckpoint = serde_json::from_str(&row.snapshot)?;
        let parent_config = if row.version > 1 {
            Some(Self::config_for(thread_id, row.version - 1, config.checkpoint_ns.clone()))
        } else {
            None
        };

        Ok(Some(CheckpointTuple {
            config: Self::config_for(thread_id, row.version, config.checkpoint_ns.clone()),
            checkpoint: stored.checkpoint,
            metadata: stored.metadata,
            parent_config,
        }))
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<std::collections::HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> CpResult<CheckpointStream> {
        let Some(thread_id) = config.and_then(|c| c.thread_id.clone()) else {
            // Cross-thread listing isn't needed by this orchestrator; every
            // caller scopes by thread_id.
            return Ok(Box::pin(stream::iter(Vec::new())));
        };

        let versions = CheckpointRepository::list_versions(&self.pool, &thread_id)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        let before_version: Option<i64> = before
            .and_then(|c| c.checkpoint_id.as_ref())
            .and_then(|id| id.parse().ok());

        let mut results = Vec::new();
        for version in versions.into_iter().rev() {
            if let Some(bv) = before_version {
                if version >= bv {
                    continue;
                }
            }

            let Some(row) = CheckpointRepository::load_at(&self.pool, &thread_id, version)
                .await
                .map_err(|e| CheckpointError::Storage(e.to_string()))?
            else {
                continue;
            };
            let stored: StoredCheckpoint = serde_json::from_str(&row.snapshot)?;

            if let Some(filter_map) = &filter {
                let matches = filter_map
                    .iter()
                    .all(|(k, v)| stored.metadata.extra.get(k) == Some(v));
                if !matches {
                    continue;
                }
            }

            let parent_config = if version > 1 {
                Some(Self::config_for(&thread_id, version - 1, None))
            } else {
                None
            };
            results.push(Ok(CheckpointTuple {
                config: Self::config_for(&thread_id, version, None),
                checkpoint: stored.checkpoint,
                metadata: stored.metadata,
                parent_config,
            }));

            if let Some(lim) = limit {
                if results.len() >= lim {
                    break;
                }
            }
        }

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        _new_versions: ChannelVersions,
    ) -> CpResult<CheckpointConfig> {
        let thread_id = Self::require_thread_id(config)?.to_string();

        let latest = CheckpointRepository::load_latest(&self.pool, &thread_id)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        let expected_version = latest.map(|c| c.version).unwrap_or(0);

        let stored = StoredCheckpoint { checkpoint, metadata };
        let snapshot = serde_json::to_string(&stored)?;

        // A version conflict here means another in-flight invocation for the
        // same thread_id committed first; retried once with the freshly
        // observed version, matching the Checkpoint Store's retry contract.
        let new_version = match CheckpointRepository::save(&self.pool, &thread_id, expected_version, &snapshot).await {
            Ok(v) => v,
            Err(_) => {
                let refreshed = CheckpointRepository::load_latest(&self.pool, &thread_id)
                    .await
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?
                    .map(|c| c.version)
                    .unwrap_or(0);
                CheckpointRepository::save(&self.pool, &thread_id, refreshed, &snapshot)
                    .await
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?
            }
        };

        Ok(Self::config_for(&thread_id, new_version, config.checkpoint_ns.clone()))
    }

    async fn put_writes(
        &self,
        _config: &CheckpointConfig,
        _writes: Vec<(String, serde_json::Value)>,
        _task_id: String,
    ) -> CpResult<()> {
        // The graph's single JSON-state channel makes intermediate,
        // pre-checkpoint write buffering unnecessary here: every superstep
        // commits its whole state via `put` directly.
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> CpResult<()> {
        CheckpointRepository::delete_thread(&self.pool, thread_id)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;
    use std::collections::HashMap as StdHashMap;

    async fn setup() -> DatabasePool {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        let pool = conn.pool().clone();
        sqlx::query(
            "CREATE TABLE checkpoints (
                thread_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, version)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn put_then_get_tuple_round_trips_latest() {
        let pool = setup().await;
        let saver = SqlCheckpointSaver::new(pool);
        let config = CheckpointConfig::new().with_thread_id("wf-1".to_string());

        let mut channel_values = StdHashMap::new();
        channel_values.insert("state".to_string(), serde_json::json!({"hello": "world"}));
        let checkpoint = Checkpoint::new(
            "unused".to_string(),
            channel_values,
            ChannelVersions::new(),
            StdHashMap::new(),
        );

        saver
            .put(&config, checkpoint, CheckpointMetadata::new(), ChannelVersions::new())
            .await
            .unwrap();

        let tuple = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(tuple.config.checkpoint_id, Some("1".to_string()));
        assert_eq!(
            tuple.checkpoint.channel_values.get("state"),
            Some(&serde_json::json!({"hello": "world"}))
        );
    }

    #[tokio::test]
    async fn successive_puts_increment_version() {
        let pool = setup().await;
        let saver = SqlCheckpointSaver::new(pool);
        let config = CheckpointConfig::new().with_thread_id("wf-1".to_string());

        for _ in 0..3 {
            let checkpoint = Checkpoint::new(
                "unused".to_string(),
                StdHashMap::new(),
                ChannelVersions::new(),
                StdHashMap::new(),
            );
            saver
                .put(&config, checkpoint, CheckpointMetadata::new(), ChannelVersions::new())
                .await
                .unwrap();
        }

        let latest = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(latest.config.checkpoint_id, Some("3".to_string()));
    }
}

//! Enhanced state history methods for CompiledGraph

use crate::compiled::{CompiledGraph, StateSnapshot, StateSnapshotStream};
use crate::error::{GraphError, Result};
use crate::state_filter::StateHistoryFilter;
use agentflow_checkpoint::CheckpointConfig;
use futures::StreamExt;

impl CompiledGraph {
    /// Get state history with enhanced filtering capabilities
    ///
    /// This method provides more sophisticated filtering than the basic get_state_history,
    /// allowing you to filter by source, step range, node, and custom metadata fields.
    ///
    /// # Arguments
    ///
    /// * `config` - Checkpoint configuration identifying the thread
    /// * `filter` - Optional enhanced filter criteria
    /// * `before` - Optional checkpoint to start before
    /// * `limit` - Maximum number of snapshots to return
    ///
    /// # Example
    ///
    /// ```rust
    /// # use agentflow_core::{StateGraph, StateHistoryFilter, CheckpointConfig};
    /// # use agentflow_checkpoint::CheckpointSource;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let mut graph = StateGraph::new();
    /// # let compiled = graph.compile()?;
    ///
    /// let config = CheckpointConfig::new("thread_1");
    ///
    /// // Filter for manual updates in steps 5-10
    /// let filter = StateHistoryFilter::new()
    ///     .with_source(CheckpointSource::Update)
    ///     .with_min_step(5)
    ///     .with_max_step(10);
    ///
    /// let mut history = compiled.get_state_history_filtered(
    ///     &config,
    ///     Some(filter),
    ///     None,
    ///     Some(10)
    /// ).await?;
    ///
    /// while let Some(snapshot) = history.next().await {
    ///     let snapshot = snapshot?;
    ///     println!("State at step: {:?}", snapshot.metadata);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_state_history_filtered(
        &self,
        config: &CheckpointConfig,
        filter: Option<StateHistoryFilter>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<StateSnapshotStream> {
        let Some(saver) = self.get_checkpoint_saver() else {
            // No checkpointer configured, return empty stream
            return Ok(Box::pin(futures::stream::empty()));
        };

        // Convert StateHistoryFilter to HashMap for checkpoint API compatibility
        let filter_map = filter.as_ref().map(|f| f.to_hashmap());

        // Get the raw checkpoint stream
        let checkpoint_stream = saver
            .list(Some(config), filter_map, before, limit)
            .await
            .map_err(|e| GraphError::Checkpoint(e))?;

        // Apply additional filtering that couldn't be done at the storage layer
        let filtered_stream = checkpoint_stream.filter_map(move |result| {
            let filter = filter.clone();
            async move {
                match result {
                    Ok(tuple) => {
                        // Apply additional filter checks if needed
                        if let Some(ref f) = filter {
                            if !f.matches(&tuple.metadata) {
                                return None; // Skip this checkpoint
                            }
                        }
                        // Convert to StateSnapshot
                        Some(Ok(Self::checkpoint_tuple_to_snapshot_static(tuple)))
                    }
                    Err(e) => Some(Err(GraphError::Checkpoint(e))),
                }
            }
        });

        Ok(Box::pin(filtered_stream))
    }

    /// Count checkpoints matching the given filter
    ///
    /// Useful for determining how many checkpoints exist before retrieving them.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use agentflow_core::{StateGraph, StateHistoryFilter, CheckpointConfig};
    /// # use agentflow_checkpoint::CheckpointSource;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let mut graph = StateGraph::new();
    /// # let compiled = graph.compile()?;
    ///
    /// let config = CheckpointConfig::new("thread_1");
    ///
    /// let filter = StateHistoryFilter::new()
    ///     .with_source(CheckpointSource::Update);
    ///
    /// let count = compiled.count_state_history(&config, Some(filter)).await?;
    /// println!("Found {} manual updates", count);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn count_state_history(
        &self,
        config: &CheckpointConfig,
        filter: Option<StateHistoryFilter>,
    ) -> Result<usize> {
        let mut stream = self.get_state_history_filtered(config, filter, None, None).await?;

        let mut count = 0;
        while let Some(result) = stream.next().await {
            result?; // Check for errors
            count += 1;
        }

        Ok(count)
    }

    /// Get the most recent checkpoint matching a filter
    ///
    /// # Example
    ///
    /// ```rust
    /// # use agentflow_core::{StateGraph, StateHistoryFilter, CheckpointConfig};
    /// # use agentflow_checkpoint::CheckpointSource;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let mut graph = StateGraph::new();
    /// # let compiled = graph.compile()?;
    ///
    /// let config = CheckpointConfig::new("thread_1");
    ///
    /// // Find the most recent manual update
    /// let filter = StateHistoryFilter::new()
    ///     .with_source(CheckpointSource::Update);
    ///
    /// if let Some(snapshot) = compiled.get_latest_matching_state(
    ///     &config,
    ///     Some(filter)
    /// ).await? {
    ///     println!("Latest manual update: {:?}", snapshot.values);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_latest_matching_state(
        &self,
        config: &CheckpointConfig,
        filter: Option<StateHistoryFilter>,
    ) -> Result<Option<StateSnapshot>> {
        let mut stream = self.get_state_history_filtered(config, filter, None, Some(1)).await?;

        if let Some(result) = stream.next().await {
            Ok(Some(result?))
        } else {
            Ok(None)
        }
    }
}

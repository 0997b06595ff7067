//! Graph execution methods (invoke, batch, etc.)
//!
//! This module contains methods for executing compiled graphs.

use super::CompiledGraph;
use crate::error::Result;
use agentflow_checkpoint::CheckpointConfig;
use serde_json::Value;

impl CompiledGraph {
    /// Execute the graph to completion with default configuration.
    ///
    /// This is the simplest way to run a graph - just provide input and get final output.
    /// For resumption, checkpointing, or interrupts, use [`invoke_with_config`](Self::invoke_with_config).
    ///
    /// # Arguments
    ///
    /// * `input` - Initial state to start execution with
    ///
    /// # Returns
    ///
    /// Final state after complete execution
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use agentflow_core::StateGraph;
    /// use serde_json::json;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut graph = StateGraph::new();
    /// // ... add nodes and edges ...
    /// let compiled = graph.compile()?;
    ///
    /// let result = compiled.invoke(json!({"input": "data"})).await?;
    /// println!("Final state: {:?}", result);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        self.invoke_with_config(input, None).await
    }

    /// Execute the graph with checkpoint configuration for resumption and persistence.
    ///
    /// This method enables advanced execution scenarios including:
    /// - **Resumption**: Continue from a previous checkpoint
    /// - **Persistence**: Save checkpoints for recovery
    /// - **Threading**: Maintain separate execution threads
    /// - **Time-travel**: Jump to any checkpoint in history
    ///
    /// # Arguments
    ///
    /// * `input` - Initial state (or state to merge when resuming)
    /// * `config` - Checkpoint configuration with thread_id and optional checkpoint_id
    ///
    /// # Returns
    ///
    /// Final state after execution completes or is interrupted.
    ///
    /// # Execution Modes
    ///
    /// ## Fresh Start (New Thread)
    ///
    /// ```rust,ignore
    /// let config = Some(CheckpointConfig::new("thread-1"));
    /// let result = compiled.invoke_with_config(initial_state, config).await?;
    /// ```
    ///
    /// ## Resume from Latest Checkpoint
    ///
    /// ```rust,ignore
    /// let config = Some(CheckpointConfig::new("thread-1"));
    /// // Automatically resumes from the latest checkpoint for this thread
    /// let result = compiled.invoke_with_config(new_input, config).await?;
    /// ```
    ///
    /// ## Resume from Specific Checkpoint
    ///
    /// ```rust,ignore
    /// let config = Some(CheckpointConfig::new("thread-1")
    ///     .with_checkpoint_id("checkpoint-123"));
    /// let result = compiled.invoke_with_config(Value::Null, config).await?;
    /// ```
    ///
    /// # Example: Multi-Turn Conversation
    ///
    /// ```rust,no_run
    /// use agentflow_core::{StateGraph, CheckpointConfig};
    /// use agentflow_checkpoint::InMemoryCheckpointSaver;
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// // Create graph with checkpointer
    /// let mut graph = StateGraph::new();
    /// // ... add nodes and edges ...
    ///
    /// let checkpointer = Arc::new(InMemoryCheckpointSaver::new());
    /// let compiled = graph.compile()?
    ///     .with_checkpointer(checkpointer);
    ///
    /// let config = Some(CheckpointConfig::new("conversation-1"));
    ///
    /// // Turn 1: Initial message
    /// let result1 = compiled.invoke_with_config(
    ///     json!({"messages": ["Hello"]}),
    ///     config.clone()
    /// ).await?;
    ///
    /// // Turn 2: Continue conversation (auto-resumes from checkpoint)
    /// let result2 = compiled.invoke_with_config(
    ///     json!({"messages": ["Tell me more"]}),
    ///     config.clone()
    /// ).await?;
    ///
    /// // State accumulates across turns
    /// println!("Conversation history: {:?}", result2);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Interrupt Handling
    ///
    /// If the graph has interrupt points configured, execution may pause:
    ///
    /// ```rust,ignore
    /// match compiled.invoke_with_config(input, config).await {
    ///     Ok(final_state) => println!("Complete: {:?}", final_state),
    ///     Err(GraphError::Interrupt(state)) => {
    ///         println!("Interrupted, waiting for input");
    ///         // Get user input, then resume with updated state
    ///         let resume_state = get_user_input(state);
    ///         compiled.invoke_with_config(resume_state, config).await?;
    ///     }
    ///     Err(e) => return Err(e),
    /// }
    /// ```
    ///
    /// # Performance
    ///
    /// - **Checkpointing**: Adds ~10-20ms per superstep for serialization
    /// - **Thread Lookup**: O(1) for in-memory, varies for persistent backends
    /// - **State Size**: Checkpoint size proportional to state complexity
    ///
    /// # See Also
    ///
    /// - [`CheckpointConfig`] - Configuration options
    /// - [`update_state`](super::CompiledGraph::update_state) - Modify state between executions
    /// - [`get_state`](super::CompiledGraph::get_state) - Inspect current state
    #[tracing::instrument(skip(self, input), fields(node_count = self.graph.nodes.len()))]
    pub async fn invoke_with_config(
        &self,
        input: Value,
        config: Option<CheckpointConfig>,
    ) -> Result<Value> {
        tracing::info!("Starting graph execution");

        // Build the Pregel execution context
        let mut pregel_loop = self.build_pregel_loop(input)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build Pregel loop");
                e
            })?;

        // Set checkpointer if both saver and config are available
        if let (Some(saver), Some(cfg)) = (&self.checkpoint_saver, config) {
            tracing::debug!("Configuring checkpointer");
            pregel_loop = pregel_loop.with_checkpointer(saver.clone(), cfg);
        }

        // Set interrupt configuration
        if !self.interrupt_config.interrupt_before.is_empty() {
            tracing::debug!(
                interrupt_before = ?self.interrupt_config.interrupt_before,
                "Configuring interrupt points (before)"
            );
            let nodes: std::collections::HashSet<String> =
                self.interrupt_config.interrupt_before.iter().cloned().collect();
            pregel_loop = pregel_loop.with_interrupt_before(nodes);
        }
        if !self.interrupt_config.interrupt_after.is_empty() {
            tracing::debug!(
                interrupt_after = ?self.interrupt_config.interrupt_after,
                "Configuring interrupt points (after)"
            );
            let nodes: std::collections::HashSet<String> =
                self.interrupt_config.interrupt_after.iter().cloned().collect();
            pregel_loop = pregel_loop.with_interrupt_after(nodes);
        }

        // Run the Pregel loop
        tracing::debug!("Running Pregel execution");
        let result = pregel_loop.run().await
            .map_err(|e| {
                tracing::error!(error = %e, "Graph execution failed");
                e
            })?;

        tracing::info!("Graph execution completed successfully");
        Ok(result)
    }
}

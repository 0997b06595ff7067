//! Cancellation registry: one [`tokio_util::sync::CancellationToken`] per
//! in-flight `workflow_id` (spec §5 suspension point vi / §7
//! `CancelledByCaller`).
//!
//! The graph engine can't thread a per-invocation token through
//! `agentflow_core`'s compiled graph — node closures are built once, at graph
//! compile time, and carry a JSON `Value` across the node boundary, which a
//! `CancellationToken` can't survive. Instead, the token lives here, keyed by
//! `workflow_id`, which every node already has on hand via the deserialized
//! `WorkflowState`. The API layer registers a token when a stream opens and
//! cancels it when the caller disconnects; agent slots poll it between
//! streamed chunks and tool-call iterations (spec §5: "cancellation is
//! checked between chunks and between iterations").

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Tracks one cancellation token per live `workflow_id`.
pub struct CancellationRegistry {
    tokens: DashMap<String, CancellationToken>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Register a fresh token for `workflow_id`, replacing any stale one left
    /// over from a prior run of the same id.
    pub fn register(&self, workflow_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(workflow_id.to_string(), token.clone());
        token
    }

    /// Cancel `workflow_id`'s token, if one is registered. A no-op if the
    /// workflow already finished and was unregistered.
    pub fn cancel(&self, workflow_id: &str) {
        if let Some(token) = self.tokens.get(workflow_id) {
            token.cancel();
        }
    }

    /// The token for `workflow_id`, if one is registered — cloned so callers
    /// can poll it without holding the map's shard lock.
    pub fn token_for(&self, workflow_id: &str) -> Option<CancellationToken> {
        self.tokens.get(workflow_id).map(|t| t.clone())
    }

    /// Drop the entry for `workflow_id` once its run has finished, whether it
    /// completed, failed, or was cancelled.
    pub fn unregister(&self, workflow_id: &str) {
        self.tokens.remove(workflow_id);
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_marks_the_registered_token_cancelled() {
        let registry = CancellationRegistry::new();
        let token = registry.register("wf-1");
        assert!(!token.is_cancelled());

        registry.cancel("wf-1");
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_on_unknown_workflow_is_a_no_op() {
        let registry = CancellationRegistry::new();
        registry.cancel("never-registered");
    }

    #[test]
    fn unregister_drops_the_token() {
        let registry = CancellationRegistry::new();
        registry.register("wf-1");
        registry.unregister("wf-1");
        assert!(registry.token_for("wf-1").is_none());
    }
}

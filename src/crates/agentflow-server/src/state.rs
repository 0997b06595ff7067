//! `WorkflowState`: the single state object threaded through the workflow
//! graph, and the pure reducer that evolves it.
//!
//! Every node in the graph engine and every step in the template engine
//! produces a [`StateUpdate`], never an in-place mutation; [`reduce`] is the
//! one place committed state transitions happen, which is what makes replay
//! and time-travel debugging possible (see design note in SPEC_FULL.md §10).

use agentflow_core::messages::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Top-level run status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    PausedForApproval,
    Completed,
    Failed,
    Cancelled,
}

/// A fact captured by a specialist agent, projected into the next agent's
/// context on handoff. Carries the emitting agent's name so authorship
/// survives merging (see SPEC_FULL.md §11, open question 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedInsight {
    pub agent: String,
    pub content: String,
    pub emitted_at: DateTime<Utc>,
}

/// Set when a node requires human approval before the graph may proceed.
/// Invariant: non-null iff the owning `WorkflowState.status` is
/// `PausedForApproval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOperation {
    pub operation: String,
    pub risk_level: String,
    pub approver_role: String,
    pub payload: Value,
    pub approval_handle: String,
    /// Node to re-enter on resume; defaults to the node that requested the
    /// interrupt.
    pub resume_node: String,
}

/// The single state object threaded through the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub current_agent: Option<String>,
    pub next_agent: Option<String>,
    pub intent_hint: Option<String>,
    pub task_result: Option<Value>,
    pub pending_operation: Option<PendingOperation>,
    pub requires_approval: bool,
    pub locks_held: HashSet<String>,
    pub captured_insights: Vec<CapturedInsight>,
    pub project_context: Option<Value>,
    pub workspace_config: Option<Value>,
    pub chat_references: Option<Value>,
    pub copilot_model: Option<String>,
    pub status: WorkflowStatus,
    pub metadata: HashMap<String, Value>,
}

impl WorkflowState {
    /// Create the initial state for a new workflow. `thread_id` defaults to
    /// `workflow_id` unless this is a sub-workflow.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        let workflow_id = workflow_id.into();
        let now = Utc::now();
        let mut metadata = HashMap::new();
        metadata.insert("created_at".to_string(), Value::String(now.to_rfc3339()));
        metadata.insert("updated_at".to_string(), Value::String(now.to_rfc3339()));
        metadata.insert("version".to_string(), Value::from(0));

        Self {
            thread_id: workflow_id.clone(),
            workflow_id,
            messages: Vec::new(),
            current_agent: None,
            next_agent: None,
            intent_hint: None,
            task_result: None,
            pending_operation: None,
            requires_approval: false,
            locks_held: HashSet::new(),
            captured_insights: Vec::new(),
            project_context: None,
            workspace_config: None,
            chat_references: None,
            copilot_model: None,
            status: WorkflowStatus::Running,
            metadata,
        }
    }

    /// The `version` field mirrored in `metadata`, kept as a typed accessor.
    pub fn version(&self) -> i64 {
        self.metadata
            .get("version")
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    fn set_version(&mut self, version: i64) {
        self.metadata
            .insert("version".to_string(), Value::from(version));
        self.metadata.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }

    /// Check invariant 1 (spec §8): `requires_approval ⇔ pending_operation != null`.
    pub fn approval_invariant_holds(&self) -> bool {
        self.requires_approval == self.pending_operation.is_some()
    }

    /// Check invariant 2 (spec §8): terminal states hold no locks.
    pub fn terminal_lock_invariant_holds(&self) -> bool {
        if matches!(
            self.status,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        ) {
            self.locks_held.is_empty()
        } else {
            true
        }
    }
}

/// A pure, non-mutating description of a state transition. Nodes and
/// template steps produce these; [`reduce`] applies them.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub append_messages: Vec<Message>,
    pub current_agent: Option<String>,
    pub next_agent: Option<Option<String>>,
    pub intent_hint: Option<String>,
    pub task_result: Option<Value>,
    pub set_pending_operation: Option<Option<PendingOperation>>,
    pub acquire_lock: Option<String>,
    pub release_lock: Option<String>,
    pub append_insight: Option<CapturedInsight>,
    pub status: Option<WorkflowStatus>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.append_messages.push(message);
        self
    }

    pub fn with_next_agent(mut self, next: Option<String>) -> Self {
        self.next_agent = Some(next);
        self
    }

    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Apply `update` to `state`, producing the next committed state and
/// bumping `version` by exactly one. This is the sole path by which
/// `WorkflowState` changes; the graph engine and template engine both route
/// their node/step outputs through it (SPEC_FULL.md §10).
pub fn reduce(mut state: WorkflowState, update: StateUpdate) -> WorkflowState {
    state.messages.extend(update.append_messages);

    if let Some(agent) = update.current_agent {
        state.current_agent = Some(agent);
    }
    if let Some(next) = update.next_agent {
        state.next_agent = next;
    }
    if let Some(hint) = update.intent_hint {
        state.intent_hint = Some(hint);
    }
    if let Some(result) = update.task_result {
        state.task_result = Some(result);
    }
    if let Some(pending) = update.set_pending_operation {
        state.requires_approval = pending.is_some();
        state.pending_operation = pending;
        if state.requires_approval {
            state.status = WorkflowStatus::PausedForApproval;
        }
    }
    if let Some(resource) = update.acquire_lock {
        state.locks_held.insert(resource);
    }
    if let Some(resource) = update.release_lock {
        state.locks_held.remove(&resource);
    }
    if let Some(insight) = update.append_insight {
        state.captured_insights.push(insight);
    }
    if let Some(status) = update.status {
        state.status = status;
    }

    let next_version = state.version() + 1;
    state.set_version(next_version);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::messages::Message;

    #[test]
    fn new_state_has_version_zero_and_no_pending_operation() {
        let state = WorkflowState::new("wf-1");
        assert_eq!(state.version(), 0);
        assert!(state.approval_invariant_holds());
        assert!(state.terminal_lock_invariant_holds());
    }

    #[test]
    fn reduce_appends_messages_and_bumps_version() {
        let state = WorkflowState::new("wf-1");
        let update = StateUpdate::new().with_message(Message::human("hello"));
        let next = reduce(state, update);
        assert_eq!(next.messages.len(), 1);
        assert_eq!(next.version(), 1);
    }

    #[test]
    fn setting_pending_operation_flips_requires_approval_and_status() {
        let state = WorkflowState::new("wf-1");
        let mut update = StateUpdate::new();
        update.set_pending_operation = Some(Some(PendingOperation {
            operation: "deploy:prod".into(),
            risk_level: "high".into(),
            approver_role: "oncall".into(),
            payload: Value::Null,
            approval_handle: "appr-1".into(),
            resume_node: "deploy".into(),
        }));
        let next = reduce(state, update);
        assert!(next.requires_approval);
        assert!(next.pending_operation.is_some());
        assert_eq!(next.status, WorkflowStatus::PausedForApproval);
        assert!(next.approval_invariant_holds());
    }

    #[test]
    fn clearing_pending_operation_resets_requires_approval() {
        let mut state = WorkflowState::new("wf-1");
        state.requires_approval = true;
        state.pending_operation = Some(PendingOperation {
            operation: "deploy:prod".into(),
            risk_level: "high".into(),
            approver_role: "oncall".into(),
            payload: Value::Null,
            approval_handle: "appr-1".into(),
            resume_node: "deploy".into(),
        });

        let mut update = StateUpdate::new();
        update.set_pending_operation = Some(None);
        let next = reduce(state, update);
        assert!(!next.requires_approval);
        assert!(next.pending_operation.is_none());
        assert!(next.approval_invariant_holds());
    }

    #[test]
    fn lock_acquire_and_release_round_trip() {
        let state = WorkflowState::new("wf-1");
        let mut update = StateUpdate::new();
        update.acquire_lock = Some("deploy:prod".to_string());
        let state = reduce(state, update);
        assert!(state.locks_held.contains("deploy:prod"));

        let mut update = StateUpdate::new();
        update.release_lock = Some("deploy:prod".to_string());
        let state = reduce(state, update);
        assert!(!state.locks_held.contains("deploy:prod"));
    }

    #[test]
    fn captured_insights_preserve_emission_order_and_authorship() {
        let state = WorkflowState::new("wf-1");
        let mut update_a = StateUpdate::new();
        update_a.append_insight = Some(CapturedInsight {
            agent: "feature_dev".into(),
            content: "found root cause in login.py".into(),
            emitted_at: Utc::now(),
        });
        let state = reduce(state, update_a);

        let mut update_b = StateUpdate::new();
        update_b.append_insight = Some(CapturedInsight {
            agent: "code_review".into(),
            content: "confirmed fix covers the regression".into(),
            emitted_at: Utc::now(),
        });
        let state = reduce(state, update_b);

        assert_eq!(state.captured_insights.len(), 2);
        assert_eq!(state.captured_insights[0].agent, "feature_dev");
        assert_eq!(state.captured_insights[1].agent, "code_review");
    }
}

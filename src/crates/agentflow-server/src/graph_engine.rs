//! Workflow Graph Engine: schedules the supervisor/specialist-agent loop as
//! a compiled [`agentflow_core::StateGraph`], with an explicit node for
//! pausing on human approval.
//!
//! The graph's single channel carries a JSON-serialized [`WorkflowState`];
//! every node deserializes it, produces a [`StateUpdate`], applies
//! [`reduce`], and serializes the result back. This keeps the graph engine
//! itself free of orchestration logic - that lives in [`crate::router::Supervisor`]
//! and [`crate::agent_slot::AgentSlot`] - and lets the engine reuse
//! `agentflow-core`'s Pregel loop, checkpointing, and interrupt machinery
//! unmodified.

use crate::agent_slot::AgentSlot;
use crate::cancellation::CancellationRegistry;
use crate::events::{Event, EventBus, EventKind};
use crate::hitl::{assess_risk, HitlController, ResumeTicket};
use crate::locks::LockManager;
use crate::router::Supervisor;
use crate::state::{reduce, StateUpdate, WorkflowState, WorkflowStatus};
use crate::{OrchestratorError, Result};
use agentflow_core::error::GraphError;
use agentflow_core::send::ConditionalEdgeResult;
use agentflow_core::{CheckpointConfig, CompiledGraph, StateGraph};
use agentflow_checkpoint::CheckpointSaver;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long a specialist node waits for a contended resource lock before
/// failing with `LockContended` (spec §4.3 `wait_timeout`).
const NODE_LOCK_WAIT: Duration = Duration::from_secs(10);

/// Virtual node the graph interrupts before whenever a node sets
/// `requires_approval`; resuming re-enters at `pending_operation.resume_node`.
pub const AWAIT_APPROVAL_NODE: &str = "await_approval";

const SUPERVISOR_NODE: &str = "supervisor";

/// Direct conversational entry point (spec §4.8 entry routing table):
/// `QA`/`SIMPLE_TASK` turns land here straight from `START`, bypassing the
/// supervisor entirely, which is what keeps the supervisor's `NEXT_AGENT:`
/// planning text from leaking into a plain answer and avoids an extra LLM
/// round trip for turns that never needed routing.
pub const CONVERSATIONAL_NODE: &str = "conversational";

/// `WorkflowState.intent_hint` values the entry router recognizes; anything
/// else (including an absent hint, e.g. a workflow launched via `execute`
/// rather than `chat/stream`) falls back to the supervisor, preserving the
/// pre-fast-path behavior. Matches [`crate::intent::Intent::as_str`].
mod intent_hint {
    pub const QA: &str = "QA";
    pub const SIMPLE_TASK: &str = "SIMPLE_TASK";
}

fn to_value(state: &WorkflowState) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>> {
    serde_json::to_value(state).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
}

fn from_value(value: Value) -> std::result::Result<WorkflowState, Box<dyn std::error::Error + Send + Sync>> {
    serde_json::from_value(value).map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
}

/// Node execution protocol steps 2-6 (spec §4.8) for a single specialist
/// turn: acquire the node's declared resource lock (if any), invoke the
/// slot, release the lock on every exit path, and fold the result into a
/// reduced [`WorkflowState`]. Shared between the compiled graph's per-agent
/// node closures and [`WorkflowGraphEngine::resume`], which has to run the
/// approved specialist directly rather than through the Pregel loop (see
/// `resume`'s doc comment).
async fn run_specialist_node(
    slot: &AgentSlot,
    node_name: &str,
    events: &EventBus,
    lock_manager: &LockManager,
    cancellation: &CancellationRegistry,
    state: WorkflowState,
) -> std::result::Result<WorkflowState, Box<dyn std::error::Error + Send + Sync>> {
    events.publish(
        "workflow",
        Event::new(
            state.workflow_id.clone(),
            EventKind::NodeStart,
            serde_json::json!({"node": node_name}),
        ),
    );

    let lock = match slot.resource_lock() {
        Some(resource) => Some(
            lock_manager
                .acquire(resource, &state.workflow_id, None, NODE_LOCK_WAIT)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?,
        ),
        None => None,
    };

    let cancel_token = cancellation.token_for(&state.workflow_id);
    let turn = slot.run(&state, cancel_token.as_ref()).await;

    if let Some(lock) = &lock {
        lock_manager
            .release(lock)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    }
    let turn = turn.map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    let mut update = StateUpdate::new()
        .with_message(turn.message)
        .with_next_agent(None);
    update.current_agent = Some(node_name.to_string());
    if let Some(insight) = turn.captured_insight {
        update.append_insight = Some(insight);
    }
    if turn.exhausted {
        update.status = Some(WorkflowStatus::Failed);
    }

    let next_state = reduce(state, update);
    events.publish(
        "workflow",
        Event::new(
            next_state.workflow_id.clone(),
            EventKind::AgentComplete,
            serde_json::json!({"node": node_name}),
        ),
    );
    Ok(next_state)
}

/// Builds and runs the multi-agent portion of a workflow: supervisor routing,
/// specialist agent turns, and the approval gate.
pub struct WorkflowGraphEngine {
    compiled: CompiledGraph,
    lock_manager: Arc<LockManager>,
    cancellation: Arc<CancellationRegistry>,
    agents: HashMap<String, Arc<AgentSlot>>,
    events: Arc<EventBus>,
}

impl WorkflowGraphEngine {
    /// Compile the graph for a fixed roster of agent slots.
    ///
    /// `agents` maps agent name (as the supervisor will refer to it in
    /// `NEXT_AGENT:`) to its slot. `conversational` answers QA/simple-task
    /// turns routed directly from `START` (spec §4.8 entry routing table);
    /// pass `None` to disable the fast path and force every turn through the
    /// supervisor (the `enable_intent_routing=false` rollback switch from
    /// spec §6 — callers implement the switch by omitting this slot).
    pub fn build(
        supervisor: Arc<Supervisor>,
        agents: HashMap<String, Arc<AgentSlot>>,
        conversational: Option<Arc<AgentSlot>>,
        events: Arc<EventBus>,
        checkpointer: Option<Arc<dyn CheckpointSaver>>,
        hitl: Arc<HitlController>,
        lock_manager: Arc<LockManager>,
        cancellation: Arc<CancellationRegistry>,
    ) -> Result<Self> {
        let mut graph = StateGraph::new();

        let sup_events = events.clone();
        let sup = supervisor.clone();
        let sup_hitl = hitl.clone();
        graph.add_node(SUPERVISOR_NODE, move |value| {
            let sup = sup.clone();
            let events = sup_events.clone();
            let hitl = sup_hitl.clone();
            Box::pin(async move {
                let state = from_value(value)?;
                events.publish(
                    "workflow",
                    Event::new(
                        state.workflow_id.clone(),
                        EventKind::NodeStart,
                        serde_json::json!({"node": SUPERVISOR_NODE}),
                    ),
                );

                let decision = sup
                    .route(&state.messages)
                    .await
                    .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

                let mut update = StateUpdate::new();
                if decision.next_agent == crate::router::supervisor::CONVERSATIONAL {
                    // Malformed supervisor output or an unrecognized agent
                    // name (spec §4.7): surface only the `REASONING` extract
                    // to the user rather than completing silently.
                    let surfaced = Supervisor::filter_routing_lines(&decision.reasoning);
                    let surfaced = if surfaced.is_empty() {
                        decision.reasoning.clone()
                    } else {
                        surfaced
                    };
                    update = update.with_message(agentflow_core::messages::Message::ai(surfaced));
                    update = update.with_status(WorkflowStatus::Completed);
                    update = update.with_next_agent(None);
                } else {
                    update = update.with_next_agent(Some(decision.next_agent.clone()));
                    if decision.requires_approval {
                        let risk = assess_risk(&decision.next_agent);
                        let approval_handle = hitl
                            .request_approval(&state.workflow_id, &decision.next_agent)
                            .await
                            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
                        update.set_pending_operation = Some(Some(crate::state::PendingOperation {
                            operation: decision.next_agent.clone(),
                            risk_level: risk.as_str().to_string(),
                            approver_role: risk.required_approver_role().to_string(),
                            payload: serde_json::json!({"reasoning": decision.reasoning}),
                            approval_handle,
                            resume_node: decision.next_agent.clone(),
                        }));
                    }
                }

                let next_state = reduce(state, update);
                events.publish(
                    "workflow",
                    Event::new(
                        next_state.workflow_id.clone(),
                        EventKind::NodeEnd,
                        serde_json::json!({"node": SUPERVISOR_NODE}),
                    ),
                );
                to_value(&next_state)
            })
        });

        for (name, slot) in agents.iter() {
            let slot = slot.clone();
            let node_events = events.clone();
            let node_name = name.clone();
            let node_locks = lock_manager.clone();
            let node_cancel = cancellation.clone();
            graph.add_node(name.clone(), move |value| {
                let slot = slot.clone();
                let events = node_events.clone();
                let node_name = node_name.clone();
                let lock_manager = node_locks.clone();
                let cancellation = node_cancel.clone();
                Box::pin(async move {
                    let state = from_value(value)?;
                    let next_state =
                        run_specialist_node(&slot, &node_name, &events, &lock_manager, &cancellation, state).await?;
                    to_value(&next_state)
                })
            });
        }

        let has_conversational = conversational.is_some();
        if let Some(conv_slot) = conversational.clone() {
            let conv_events = events.clone();
            let conv_cancel = cancellation.clone();
            graph.add_node(CONVERSATIONAL_NODE, move |value| {
                let slot = conv_slot.clone();
                let events = conv_events.clone();
                let cancellation = conv_cancel.clone();
                Box::pin(async move {
                    let state = from_value(value)?;
                    events.publish(
                        "workflow",
                        Event::new(
                            state.workflow_id.clone(),
                            EventKind::NodeStart,
                            serde_json::json!({"node": CONVERSATIONAL_NODE}),
                        ),
                    );

                    let cancel_token = cancellation.token_for(&state.workflow_id);
                    let turn = slot
                        .run_streaming(&state, &events, cancel_token.as_ref())
                        .await
                        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

                    let mut update = StateUpdate::new()
                        .with_message(turn.message)
                        .with_next_agent(None)
                        .with_status(WorkflowStatus::Completed);
                    update.current_agent = Some(CONVERSATIONAL_NODE.to_string());
                    if let Some(insight) = turn.captured_insight {
                        update.append_insight = Some(insight);
                    }

                    let next_state = reduce(state, update);
                    events.publish(
                        "workflow",
                        Event::new(
                            next_state.workflow_id.clone(),
                            EventKind::AgentComplete,
                            serde_json::json!({"node": CONVERSATIONAL_NODE}),
                        ),
                    );
                    to_value(&next_state)
                })
            });
        }

        let hitl_events = events.clone();
        graph.add_node(AWAIT_APPROVAL_NODE, move |value| {
            let events = hitl_events.clone();
            Box::pin(async move {
                let state = from_value(value)?;
                events.publish(
                    "workflow",
                    Event::new(
                        state.workflow_id.clone(),
                        EventKind::ApprovalPending,
                        serde_json::json!({
                            "approval_id": state.pending_operation.as_ref().map(|p| p.approval_handle.clone()),
                        }),
                    ),
                );
                // The graph interrupts before this node runs. By the time
                // execution reaches here on resume, `WorkflowGraphEngine::resume`
                // has already cleared `pending_operation` via the reducer, so
                // this node is a pass-through that only exists to carry the
                // interrupt point and emit the approval-pending event.
                to_value(&state)
            })
        });

        // Entry routing (spec §4.8 table): QA/SIMPLE_TASK intents go straight
        // to the conversational handler when one was built; everything else
        // (MEDIUM/HIGH complexity, no intent hint at all, or intent routing
        // disabled because no conversational slot was supplied) enters at
        // the supervisor exactly as before the fast path existed.
        let mut entry_branches: HashMap<String, String> = HashMap::new();
        entry_branches.insert(SUPERVISOR_NODE.to_string(), SUPERVISOR_NODE.to_string());
        if has_conversational {
            entry_branches.insert(CONVERSATIONAL_NODE.to_string(), CONVERSATIONAL_NODE.to_string());
        }
        graph.add_conditional_edge(
            agentflow_core::graph::START,
            move |value: &Value| -> ConditionalEdgeResult {
                if !has_conversational {
                    return SUPERVISOR_NODE.to_string().into();
                }
                match value.get("intent_hint").and_then(|v| v.as_str()) {
                    Some(hint) if hint == intent_hint::QA || hint == intent_hint::SIMPLE_TASK => {
                        CONVERSATIONAL_NODE.to_string().into()
                    }
                    _ => SUPERVISOR_NODE.to_string().into(),
                }
            },
            entry_branches,
        );

        let mut branches: HashMap<String, String> = agents
            .keys()
            .map(|name| (name.clone(), name.clone()))
            .collect();
        branches.insert("__end__".to_string(), "__end__".to_string());
        branches.insert(AWAIT_APPROVAL_NODE.to_string(), AWAIT_APPROVAL_NODE.to_string());

        graph.add_conditional_edge(
            SUPERVISOR_NODE,
            |value: &Value| -> ConditionalEdgeResult {
                let requires_approval = value
                    .get("requires_approval")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if requires_approval {
                    return AWAIT_APPROVAL_NODE.to_string().into();
                }
                match value.get("next_agent").and_then(|v| v.as_str()) {
                    Some(agent) => agent.to_string().into(),
                    None => "__end__".to_string().into(),
                }
            },
            branches.clone(),
        );

        for name in agents.keys() {
            graph.add_edge(name.clone(), SUPERVISOR_NODE);
        }

        graph.add_edge(AWAIT_APPROVAL_NODE, SUPERVISOR_NODE);

        if has_conversational {
            graph.add_finish(CONVERSATIONAL_NODE);
        }

        let mut built = graph
            .compile()
            .map_err(|e| OrchestratorError::InternalInvariantViolation(e.to_string()))?;

        if let Some(saver) = checkpointer {
            built = built.with_checkpointer(saver);
        }
        built = built.with_interrupt_config(
            agentflow_core::InterruptConfig::new().with_interrupt_before(vec![AWAIT_APPROVAL_NODE.to_string()]),
        );

        Ok(Self { compiled: built, lock_manager, cancellation, agents, events })
    }

    /// Run a workflow thread to completion or its first interrupt.
    ///
    /// An `interrupt_before` hit at [`AWAIT_APPROVAL_NODE`] surfaces from
    /// `agentflow-core` as `Err(GraphError::Interrupted { .. })`, not a
    /// returned value - the checkpointed state has to be re-fetched with
    /// `get_state`. Callers only ever see the ordinary, paused `WorkflowState`
    /// (with `status: PausedForApproval`); they never need to know the
    /// interrupt travelled as an error underneath.
    pub async fn invoke(&self, state: WorkflowState) -> Result<WorkflowState> {
        let thread_id = state.thread_id.clone();
        info!(thread_id = %thread_id, "invoking workflow graph");
        let config = CheckpointConfig::new().with_thread_id(thread_id);
        let input = to_value(&state).map_err(|e| box_err_to_orchestrator(e))?;

        let result = self.compiled.invoke_with_config(input, Some(config.clone())).await;
        self.resolve_invoke_result(result, &config).await
    }

    /// Shared tail of `invoke`/`resume`: turns a raw graph result into a
    /// `WorkflowState`, recovering the paused state on an interrupt.
    async fn resolve_invoke_result(
        &self,
        result: std::result::Result<Value, GraphError>,
        config: &CheckpointConfig,
    ) -> Result<WorkflowState> {
        match result {
            Ok(output) => from_value(output).map_err(|e| box_err_to_orchestrator(e)),
            Err(GraphError::Interrupted { node, .. }) => {
                debug!(node = %node, "graph interrupted, recovering checkpointed state");
                let snapshot = self
                    .compiled
                    .get_state(config)
                    .await
                    .map_err(map_graph_error)?
                    .ok_or_else(|| {
                        OrchestratorError::InternalInvariantViolation(
                            "interrupted graph has no checkpointed state".to_string(),
                        )
                    })?;
                serde_json::from_value(snapshot.values).map_err(OrchestratorError::Serialization)
            }
            Err(err) => Err(map_graph_error(err)),
        }
    }

    /// Resume a workflow that was parked at [`AWAIT_APPROVAL_NODE`] once the
    /// HITL controller has resolved the outstanding approval.
    pub async fn resume(&self, thread_id: &str, ticket: ResumeTicket) -> Result<WorkflowState> {
        debug!(thread_id, approval_id = %ticket.approval_id, "resuming workflow after approval decision");
        let config = CheckpointConfig::new().with_thread_id(thread_id.to_string());

        let snapshot = self
            .compiled
            .get_state(&config)
            .await
            .map_err(map_graph_error)?
            .ok_or_else(|| OrchestratorError::TaskNotFound(thread_id.to_string()))?;

        let mut state: WorkflowState = serde_json::from_value(snapshot.values)
            .map_err(|e| OrchestratorError::Serialization(e))?;

        // Spec §5: a resource lock held across an approval interrupt is not
        // renewed; if it already lapsed before the decision arrived, the
        // workflow fails outright rather than resuming with a lock it no
        // longer actually holds.
        if let Some(expired_resource) = self.lock_manager.first_expired_for_holder(thread_id).await? {
            for resource in state.locks_held.iter() {
                let _ = self
                    .lock_manager
                    .release(&crate::locks::LockHandle {
                        resource_id: resource.clone(),
                        holder: thread_id.to_string(),
                    })
                    .await;
            }
            return Err(OrchestratorError::LockExpired {
                resource_id: expired_resource,
            });
        }

        let resume_node = state
            .pending_operation
            .as_ref()
            .map(|p| p.resume_node.clone())
            .ok_or_else(|| {
                OrchestratorError::InternalInvariantViolation(
                    "resume called on a checkpoint with no pending_operation".to_string(),
                )
            })?;

        let mut update = StateUpdate::new();
        update.set_pending_operation = Some(None);
        update = update.with_status(match ticket.decision {
            crate::hitl::ApprovalDecision::Approved => WorkflowStatus::Running,
            crate::hitl::ApprovalDecision::Rejected => WorkflowStatus::Cancelled,
        });
        state = reduce(state, update);

        if matches!(state.status, WorkflowStatus::Cancelled) {
            return Ok(state);
        }

        // `invoke_with_config` always rebuilds a fresh Pregel loop seeded on
        // the `START` channel (see `build_pregel_loop`) — there is no
        // `CompiledGraph`-level way to re-enter mid-graph at an arbitrary
        // node (`agentflow-core`'s own `#[ignore]`d
        // `test_resume_from_checkpoint_after_interrupt` notes this isn't
        // implemented). Feeding the resumed state straight into
        // `invoke_with_config` would therefore re-enter through the entry
        // router and land back on `SUPERVISOR_NODE`, re-running the
        // supervisor LLM call instead of entering directly at
        // `pending_operation.resume_node` as spec §4.8 requires. So the
        // approved node is run here first, via the same node-execution-
        // protocol helper the compiled graph's own node closures use, and
        // only its resulting state is handed to the graph, which then
        // re-enters at `SUPERVISOR_NODE` exactly as it would after any
        // other specialist turn, continuing the loop from there.
        let slot = self.agents.get(&resume_node).ok_or_else(|| {
            OrchestratorError::InternalInvariantViolation(format!(
                "pending_operation.resume_node {resume_node} names no known agent"
            ))
        })?;
        state = run_specialist_node(slot, &resume_node, &self.events, &self.lock_manager, &self.cancellation, state)
            .await
            .map_err(box_err_to_orchestrator)?;

        let input = to_value(&state).map_err(|e| box_err_to_orchestrator(e))?;
        let result = self.compiled.invoke_with_config(input, Some(config.clone())).await;
        self.resolve_invoke_result(result, &config).await
    }
}

/// A cancelled agent-slot turn surfaces from `agentflow-core`'s node
/// execution as a plain string, losing its [`OrchestratorError`] variant
/// along the way — the compiled graph's node closures return
/// `Box<dyn Error>`, not the orchestrator's own error enum. Recognizing the
/// message text is the only way left to tell a caller-cancelled run apart
/// from an ordinary node failure once it's crossed that boundary.
fn is_cancellation(message: &str) -> bool {
    message.contains("workflow cancelled by caller")
}

fn map_graph_error(err: GraphError) -> OrchestratorError {
    if is_cancellation(&err.to_string()) {
        return OrchestratorError::CancelledByCaller;
    }
    OrchestratorError::ExecutionFailed(err.to_string())
}

fn box_err_to_orchestrator(e: Box<dyn std::error::Error + Send + Sync>) -> OrchestratorError {
    let message = e.to_string();
    if is_cancellation(&message) {
        return OrchestratorError::CancelledByCaller;
    }
    OrchestratorError::ExecutionFailed(message)
}

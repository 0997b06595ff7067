//! Workflow Template Engine (spec §4.9): executes declarative step
//! sequences as an alternative front door to the graph engine (API:
//! `workflow/execute`).
//!
//! Generalizes the teacher's declarative step config (a single `pattern`
//! field per step) to the three step kinds this engine needs (`agent_call`,
//! `hitl_approval`, `deterministic_check`), and routes every step's effect
//! through [`reduce`] so a template run shares checkpointing and event
//! semantics with [`crate::graph_engine::WorkflowGraphEngine`] instead of
//! maintaining its own parallel state shape.

use crate::agent_slot::AgentSlot;
use crate::events::{Event, EventBus, EventKind};
use crate::hitl::{assess_risk, HitlController};
use crate::locks::LockManager;
use crate::state::{reduce, PendingOperation, StateUpdate, WorkflowState, WorkflowStatus};
use crate::{OrchestratorError, Result};
use agentflow_core::messages::Message;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// A declarative workflow template (spec §3 `WorkflowTemplate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub version: u32,
    pub steps: Vec<TemplateStep>,
}

impl WorkflowTemplate {
    pub fn step(&self, id: &str) -> Option<&TemplateStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn first_step(&self) -> Option<&TemplateStep> {
        self.steps.first()
    }
}

/// One step of a [`WorkflowTemplate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateStep {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_template: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_lock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_gate: Option<DecisionGate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    AgentCall,
    HitlApproval,
    DeterministicCheck,
}

/// A decision gate, evaluated after any step, that selects the next step id
/// via `on_success`/`on_failure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionGate {
    LlmAssessment,
    DeterministicCheck { expression: String },
}

fn template_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_.]+)\s*\}\}").unwrap())
}

/// Resolve a dotted path (`outputs.step1.success`) against a JSON value.
fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |v, key| match v {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Render `template` by substituting every `{{path}}` token with its
/// resolved value from `ctx` (stringified for non-string values). Unresolved
/// tokens are left as-is rather than failing the step, matching the
/// best-effort text rendering [`crate::router::supervisor::Supervisor`]
/// already does for malformed output.
fn render_template(template: &Value, ctx: &Value) -> Value {
    match template {
        Value::String(s) => {
            let rendered = template_token_regex().replace_all(s, |caps: &regex::Captures| {
                match resolve_path(ctx, &caps[1]) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => caps[0].to_string(),
                }
            });
            Value::String(rendered.into_owned())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| render_template(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_template(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Evaluate a sandboxed boolean expression of the form `path`, `!path`,
/// `path == literal`, or `path != literal` against a context value.
fn evaluate_condition(expr: &str, ctx: &Value) -> bool {
    let expr = expr.trim();

    if expr == "true" {
        return true;
    }
    if expr == "false" {
        return false;
    }

    if let Some(rest) = expr.strip_prefix('!') {
        return !evaluate_condition(rest.trim(), ctx);
    }

    for op in ["==", "!="] {
        if let Some((lhs, rhs)) = expr.split_once(op) {
            let lhs = lhs.trim();
            let rhs = rhs.trim().trim_matches('"').trim_matches('\'');
            let resolved = resolve_path(ctx, lhs);
            let matches = match resolved {
                Some(Value::String(s)) => s == rhs,
                Some(Value::Bool(b)) => b.to_string() == rhs,
                Some(Value::Number(n)) => n.to_string() == rhs,
                Some(Value::Null) | None => rhs == "null",
                Some(other) => other.to_string() == rhs,
            };
            return if op == "==" { matches } else { !matches };
        }
    }

    match resolve_path(ctx, expr) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(_) => true,
    }
}

/// Executes [`WorkflowTemplate`]s step by step, threading a
/// [`WorkflowState`] through each step via the shared reducer. Outputs are
/// accumulated in `state.task_result` as `{step_id: output}`; a
/// `hitl_approval` step pauses the run exactly like the graph engine's
/// `await_approval` node, by setting `pending_operation` and returning.
pub struct TemplateEngine {
    agents: HashMap<String, Arc<AgentSlot>>,
    lock_manager: Arc<LockManager>,
    events: Arc<EventBus>,
    hitl: Arc<HitlController>,
}

/// Runs that loop longer than this without reaching a terminal or paused
/// state are treated as misconfigured (e.g. an `on_success` cycle with no
/// exit) rather than left to spin.
const MAX_TEMPLATE_STEPS: usize = 200;

impl TemplateEngine {
    pub fn new(
        agents: HashMap<String, Arc<AgentSlot>>,
        lock_manager: Arc<LockManager>,
        events: Arc<EventBus>,
        hitl: Arc<HitlController>,
    ) -> Self {
        Self {
            agents,
            lock_manager,
            events,
            hitl,
        }
    }

    /// Run `template` to completion or its first HITL pause, starting from
    /// `state`'s first step.
    pub async fn run(&self, template: &WorkflowTemplate, state: WorkflowState) -> Result<WorkflowState> {
        let start = template
            .first_step()
            .ok_or_else(|| OrchestratorError::ExecutionFailed(format!("template {} has no steps", template.name)))?
            .id
            .clone();
        self.run_from(template, state, start).await
    }

    /// Resume a template run parked at a `hitl_approval` step once its
    /// approval has resolved.
    pub async fn resume(
        &self,
        template: &WorkflowTemplate,
        state: WorkflowState,
        approved: bool,
    ) -> Result<WorkflowState> {
        let pending = state
            .pending_operation
            .clone()
            .ok_or_else(|| OrchestratorError::ExecutionFailed("no pending approval to resume".to_string()))?;

        let mut update = StateUpdate::new();
        update.set_pending_operation = Some(None);
        update = update.with_status(WorkflowStatus::Running);
        let state = reduce(state, update);

        let step = template.step(&pending.resume_node).ok_or_else(|| {
            OrchestratorError::ExecutionFailed(format!("template step not found: {}", pending.resume_node))
        })?;

        match if approved { &step.on_success } else { &step.on_failure } {
            Some(next) => self.run_from(template, state, next.clone()).await,
            None => {
                let status = if approved { WorkflowStatus::Completed } else { WorkflowStatus::Cancelled };
                Ok(reduce(state, StateUpdate::new().with_status(status)))
            }
        }
    }

    async fn run_from(&self, template: &WorkflowTemplate, mut state: WorkflowState, start: String) -> Result<WorkflowState> {
        let mut next_id = Some(start);
        let mut steps_run = 0usize;

        while let Some(step_id) = next_id {
            steps_run += 1;
            if steps_run > MAX_TEMPLATE_STEPS {
                return Err(OrchestratorError::MaxIterationsExceeded);
            }

            let step = template
                .step(&step_id)
                .ok_or_else(|| OrchestratorError::ExecutionFailed(format!("template step not found: {step_id}")))?;

            self.events.publish(
                "workflow",
                Event::new(
                    state.workflow_id.clone(),
                    EventKind::NodeStart,
                    serde_json::json!({"template": template.name, "step": step_id}),
                ),
            );
            debug!(template = %template.name, step = %step_id, "executing template step");

            let (update, succeeded) = self.execute_step(&state, step).await?;
            state = reduce(state, update);

            self.events.publish(
                "workflow",
                Event::new(
                    state.workflow_id.clone(),
                    EventKind::NodeEnd,
                    serde_json::json!({"template": template.name, "step": step_id}),
                ),
            );

            if matches!(state.status, WorkflowStatus::PausedForApproval) {
                return Ok(state);
            }

            next_id = if succeeded {
                step.on_success.clone()
            } else {
                step.on_failure.clone()
            };
        }

        Ok(reduce(state, StateUpdate::new().with_status(WorkflowStatus::Completed)))
    }

    async fn execute_step(&self, state: &WorkflowState, step: &TemplateStep) -> Result<(StateUpdate, bool)> {
        match step.kind {
            StepKind::AgentCall => self.execute_agent_call(state, step).await,
            StepKind::HitlApproval => self.execute_hitl_approval(state, step).await,
            StepKind::DeterministicCheck => self.execute_deterministic_check(state, step),
        }
    }

    async fn execute_agent_call(&self, state: &WorkflowState, step: &TemplateStep) -> Result<(StateUpdate, bool)> {
        let agent_name = step
            .agent
            .as_deref()
            .ok_or_else(|| OrchestratorError::ExecutionFailed(format!("agent_call step {} missing agent", step.id)))?;
        let agent = self
            .agents
            .get(agent_name)
            .ok_or_else(|| OrchestratorError::ExecutionFailed(format!("unknown agent: {agent_name}")))?;

        let lock = match &step.resource_lock {
            Some(resource) => Some(
                self.lock_manager
                    .acquire(resource, &state.workflow_id, None, Duration::from_secs(10))
                    .await?,
            ),
            None => None,
        };

        let mut call_state = state.clone();
        if let Some(template) = &step.payload_template {
            let ctx = serde_json::json!({
                "context": state.project_context,
                "outputs": state.task_result,
            });
            let rendered = render_template(template, &ctx);
            let rendered_text = rendered.as_str().map(str::to_string).unwrap_or_else(|| rendered.to_string());
            call_state.messages.push(Message::human(rendered_text));
        }

        let turn = agent.run(&call_state, None).await;

        if let Some(lock) = lock {
            self.lock_manager.release(&lock).await?;
        }
        let turn = turn?;

        let mut outputs = state
            .task_result
            .as_ref()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        outputs.insert(
            step.id.clone(),
            serde_json::json!({"text": turn.message.text()}),
        );

        let mut update = StateUpdate::new().with_message(turn.message);
        update.current_agent = Some(agent_name.to_string());
        update.task_result = Some(Value::Object(outputs));
        if let Some(insight) = turn.captured_insight {
            update.append_insight = Some(insight);
        }
        if turn.exhausted {
            warn!(agent = %agent_name, step = %step.id, "agent call exhausted its tool-call budget");
        }
        Ok((update, !turn.exhausted))
    }

    async fn execute_hitl_approval(&self, state: &WorkflowState, step: &TemplateStep) -> Result<(StateUpdate, bool)> {
        let risk = assess_risk(&step.id);
        let mut reasoning = format!("step '{}' requires approval", step.id);

        if let Some(DecisionGate::LlmAssessment) = &step.decision_gate {
            if let Some(agent_name) = &step.agent {
                if let Some(agent) = self.agents.get(agent_name) {
                    if let Ok(turn) = agent.run(state, None).await {
                        if let Some(text) = turn.message.text() {
                            reasoning = text.to_string();
                        }
                    }
                }
            }
        }

        let approval_handle = self.hitl.request_approval(&state.workflow_id, &step.id).await?;

        let mut update = StateUpdate::new();
        update.set_pending_operation = Some(Some(PendingOperation {
            operation: step.id.clone(),
            risk_level: risk.as_str().to_string(),
            approver_role: risk.required_approver_role().to_string(),
            payload: serde_json::json!({"step": step.id, "reasoning": reasoning}),
            approval_handle,
            resume_node: step.id.clone(),
        }));
        Ok((update, true))
    }

    fn execute_deterministic_check(&self, state: &WorkflowState, step: &TemplateStep) -> Result<(StateUpdate, bool)> {
        let expression = match &step.decision_gate {
            Some(DecisionGate::DeterministicCheck { expression }) => expression,
            _ => {
                return Err(OrchestratorError::ExecutionFailed(format!(
                    "deterministic_check step {} missing expression",
                    step.id
                )))
            }
        };

        let ctx = serde_json::json!({
            "context": state.project_context,
            "outputs": state.task_result,
        });
        let passed = evaluate_condition(expression, &ctx);
        Ok((StateUpdate::new(), passed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Value {
        serde_json::json!({"outputs": {"step1": {"success": true, "count": 3}}})
    }

    #[test]
    fn resolves_truthy_bool_path() {
        assert!(evaluate_condition("outputs.step1.success", &ctx()));
    }

    #[test]
    fn negation_inverts_result() {
        assert!(!evaluate_condition("!outputs.step1.success", &ctx()));
    }

    #[test]
    fn equality_comparison_against_number() {
        assert!(evaluate_condition("outputs.step1.count == 3", &ctx()));
        assert!(!evaluate_condition("outputs.step1.count == 4", &ctx()));
    }

    #[test]
    fn missing_path_is_falsy() {
        assert!(!evaluate_condition("outputs.missing.field", &ctx()));
    }

    #[test]
    fn render_template_substitutes_known_tokens_and_leaves_unknown() {
        let template = serde_json::json!("run {{outputs.step1.count}} times, see {{unknown.path}}");
        let rendered = render_template(&template, &ctx());
        assert_eq!(rendered, Value::String("run 3 times, see {{unknown.path}}".to_string()));
    }

    fn template_with_gate(expression: &str) -> WorkflowTemplate {
        WorkflowTemplate {
            name: "t".to_string(),
            version: 1,
            steps: vec![
                TemplateStep {
                    id: "check".to_string(),
                    kind: StepKind::DeterministicCheck,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: Some(DecisionGate::DeterministicCheck {
                        expression: expression.to_string(),
                    }),
                    on_success: Some("pass".to_string()),
                    on_failure: Some("fail".to_string()),
                },
                TemplateStep {
                    id: "pass".to_string(),
                    kind: StepKind::DeterministicCheck,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: Some(DecisionGate::DeterministicCheck { expression: "true".to_string() }),
                    on_success: None,
                    on_failure: None,
                },
                TemplateStep {
                    id: "fail".to_string(),
                    kind: StepKind::DeterministicCheck,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: Some(DecisionGate::DeterministicCheck { expression: "false".to_string() }),
                    on_success: None,
                    on_failure: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn deterministic_check_template_routes_to_pass_step() {
        use crate::db::connection::DatabaseConnection;

        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE resource_locks (
                resource_id TEXT PRIMARY KEY NOT NULL,
                holder TEXT NOT NULL,
                acquired_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(conn.pool())
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE approvals (
                approval_id TEXT PRIMARY KEY NOT NULL,
                workflow_id TEXT NOT NULL,
                state TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                resolved_at TEXT
            )",
        )
        .execute(conn.pool())
        .await
        .unwrap();

        let engine = TemplateEngine::new(
            HashMap::new(),
            Arc::new(LockManager::new(conn.pool().clone(), 60)),
            Arc::new(EventBus::new()),
            Arc::new(crate::hitl::HitlController::new(conn.pool().clone(), 3_600)),
        );

        let template = template_with_gate("true");
        let state = WorkflowState::new("wf-template-1");
        let result = engine.run(&template, state).await.unwrap();

        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.current_agent, None);
    }

    /// Spec §8 scenario 3: a deploy template reaches an `approval_gate` step
    /// with `pending_operation` set, parks, and resumes to completion once
    /// the approval resolves — without ever invoking an agent (a bare
    /// `deterministic_check` stands in for `code_review`/`run_tests`/
    /// `deploy_staging` here; the HITL pause/resume plumbing under test is
    /// agent-agnostic).
    fn deploy_template() -> WorkflowTemplate {
        WorkflowTemplate {
            name: "pr-deployment".to_string(),
            version: 1,
            steps: vec![
                TemplateStep {
                    id: "run_tests".to_string(),
                    kind: StepKind::DeterministicCheck,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: Some(DecisionGate::DeterministicCheck { expression: "true".to_string() }),
                    on_success: Some("approval_gate".to_string()),
                    on_failure: None,
                },
                TemplateStep {
                    id: "approval_gate".to_string(),
                    kind: StepKind::HitlApproval,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: None,
                    on_success: Some("deploy_production".to_string()),
                    on_failure: None,
                },
                TemplateStep {
                    id: "deploy_production".to_string(),
                    kind: StepKind::DeterministicCheck,
                    agent: None,
                    payload_template: None,
                    resource_lock: None,
                    decision_gate: Some(DecisionGate::DeterministicCheck { expression: "true".to_string() }),
                    on_success: None,
                    on_failure: None,
                },
            ],
        }
    }

    async fn engine_with_memory_db() -> (TemplateEngine, crate::db::connection::DatabaseConnection) {
        use crate::db::connection::DatabaseConnection;

        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE resource_locks (
                resource_id TEXT PRIMARY KEY NOT NULL,
                holder TEXT NOT NULL,
                acquired_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(conn.pool())
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE approvals (
                approval_id TEXT PRIMARY KEY NOT NULL,
                workflow_id TEXT NOT NULL,
                state TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                resolved_at TEXT
            )",
        )
        .execute(conn.pool())
        .await
        .unwrap();

        let engine = TemplateEngine::new(
            HashMap::new(),
            Arc::new(LockManager::new(conn.pool().clone(), 60)),
            Arc::new(EventBus::new()),
            Arc::new(crate::hitl::HitlController::new(conn.pool().clone(), 3_600)),
        );
        (engine, conn)
    }

    #[tokio::test]
    async fn deploy_template_parks_at_approval_gate_then_resumes_to_completion() {
        let (engine, conn) = engine_with_memory_db().await;
        let template = deploy_template();

        let state = WorkflowState::new("wf-pr-deployment-123");
        let parked = engine.run(&template, state).await.unwrap();

        assert_eq!(parked.status, WorkflowStatus::PausedForApproval);
        let pending = parked.pending_operation.clone().expect("pending_operation must be set");
        assert!(parked.requires_approval);
        assert_eq!(pending.resume_node, "approval_gate");
        assert!(!pending.approval_handle.is_empty());

        let hitl = crate::hitl::HitlController::new(conn.pool().clone(), 3_600);
        hitl.resolve(&pending.approval_handle, crate::hitl::ApprovalDecision::Approved, "lead", None)
            .await
            .unwrap();

        let resumed = engine.resume(&template, parked, true).await.unwrap();
        assert_eq!(resumed.status, WorkflowStatus::Completed);
        assert!(resumed.pending_operation.is_none());
        assert!(!resumed.requires_approval);
    }
}

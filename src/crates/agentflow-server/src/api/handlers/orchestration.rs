//! Handlers for the public API surface (spec §4.12): `orchestrate`,
//! `execute/{task_id}`, `tasks/{task_id}`, `chat/stream`, `workflow/*`, and
//! `approvals/*`. Each handler is a thin translation layer onto the engines
//! and repositories built in earlier modules — no orchestration logic lives
//! here beyond request validation and response shaping.

use crate::api::error::ApiError;
use crate::api::models::*;
use crate::api::sse::{workflow_event_stream_with_cancel, CancelGuard};
use crate::api::state::{OrchestrationState, WorkflowKind};
use crate::db::repositories::TaskRepository;
use crate::events::{Event, EventKind};
use crate::hitl::ApprovalDecision;
use crate::state::{WorkflowState, WorkflowStatus};
use crate::OrchestratorError;
use agentflow_core::messages::Message;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::Json;
use futures_util::StreamExt;
use std::convert::Infallible;
use uuid::Uuid;

/// `POST orchestrate`: classify the incoming message and stage a task
/// without starting its workflow. Intent routing decides the subtask
/// breakdown; splitting a single message into more than one subtask is left
/// to the agent that executes it, so a freshly-orchestrated task always
/// carries exactly one subtask description (the message itself).
pub async fn orchestrate(
    State(state): State<OrchestrationState>,
    Json(req): Json<OrchestrateRequest>,
) -> Result<Json<OrchestrateResponse>, ApiError> {
    let classification = state.intent_classifier.classify(&req.message).await;
    let task_id = Uuid::new_v4().to_string();
    let thread_id = task_id.clone();
    let subtasks = vec![req.message.clone()];
    let subtasks_json = serde_json::to_string(&subtasks)?;
    let project_context_json = req
        .project_context
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let risk_level = if matches!(classification.intent, crate::intent::Intent::HighComplexity) {
        Some(crate::hitl::RiskLevel::High.as_str().to_string())
    } else {
        None
    };

    TaskRepository::create(
        &state.db,
        &task_id,
        &thread_id,
        project_context_json.as_deref(),
        &subtasks_json,
        risk_level.as_deref(),
        None,
    )
    .await?;

    Ok(Json(OrchestrateResponse {
        task_id,
        subtasks,
        risk_level,
        approval_request_id: None,
    }))
}

/// `POST execute/{task_id}`: launch the staged task's workflow on the graph
/// engine in the background, returning immediately with a `workflow_id` the
/// caller can poll via `tasks/{task_id}` or stream via `chat/stream`.
pub async fn execute_task(
    State(state): State<OrchestrationState>,
    Path(task_id): Path<String>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let task = TaskRepository::get(&state.db, &task_id)
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.clone()))?;

    let subtasks: Vec<String> = serde_json::from_str(&task.subtasks)?;
    let workflow_id = task.thread_id.clone();

    let mut workflow_state = WorkflowState::new(workflow_id.clone());
    for subtask in &subtasks {
        workflow_state.messages.push(Message::human(subtask.clone()));
    }
    if let Some(ctx) = task.project_context.as_ref() {
        workflow_state.project_context = Some(serde_json::from_str(ctx)?);
    }

    state.mark_workflow(workflow_id.clone(), WorkflowKind::Graph);
    TaskRepository::set_status(&state.db, &task_id, "running").await?;

    let graph_engine = state.graph_engine.clone();
    let db = state.db.clone();
    let events = state.events.clone();
    let task_id_bg = task_id.clone();
    tokio::spawn(async move {
        let result = graph_engine.invoke(workflow_state).await;
        let final_status = match &result {
            Ok(s) if matches!(s.status, WorkflowStatus::Completed) => "completed",
            Ok(s) if matches!(s.status, WorkflowStatus::Cancelled) => "cancelled",
            Ok(s) if matches!(s.status, WorkflowStatus::PausedForApproval) => "paused_for_approval",
            Ok(_) => "running",
            Err(_) => "failed",
        };
        if let Err(e) = TaskRepository::set_status(&db, &task_id_bg, final_status).await {
            tracing::warn!(error = %e, task_id = %task_id_bg, "failed to persist terminal task status");
        }
        if let Err(e) = &result {
            events.publish(
                "workflow",
                Event::new(
                    task_id_bg.clone(),
                    EventKind::Error,
                    serde_json::json!({"error": e.to_string()}),
                ),
            );
        }
        events.publish(
            "workflow",
            Event::new(task_id_bg, EventKind::Done, serde_json::Value::Null),
        );
    });

    Ok(Json(ExecuteResponse {
        task_id,
        workflow_id,
        status: "running".to_string(),
    }))
}

/// `GET tasks/{task_id}`.
pub async fn get_task(
    State(state): State<OrchestrationState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    let task = TaskRepository::get(&state.db, &task_id)
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.clone()))?;
    let subtasks: Vec<String> = serde_json::from_str(&task.subtasks)?;

    Ok(Json(TaskStatusResponse {
        task_id: task.task_id,
        thread_id: task.thread_id,
        status: task.status,
        subtasks,
        risk_level: task.risk_level,
        approval_request_id: task.approval_request_id,
    }))
}

/// `POST chat/stream`: conversational entry point. Appends the message to
/// session history, classifies intent, and either answers inline (Q&A /
/// conversational routes) or launches a workflow and streams its events as
/// SSE frames until `done`.
///
/// `EXPLICIT_COMMAND` messages (leading `/`) are not run here at all (spec
/// §4.8 entry routing table: "redirect caller to the `/execute` API path");
/// the stream opens only to emit a single `error` event naming the redirect
/// and then `done`, rather than silently treating the command text as a
/// conversational turn.
type ChatStream = std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<SseEvent, Infallible>> + Send + 'static>>;

pub async fn chat_stream(
    State(state): State<OrchestrationState>,
    Json(req): Json<ChatStreamRequest>,
) -> Sse<ChatStream> {
    let session_id = req
        .session_id
        .unwrap_or_else(crate::session::SessionManager::allocate_session_id);
    let workflow_id = session_id.clone();

    let classification = if state.config.enable_intent_routing {
        Some(state.intent_classifier.classify(&req.message).await)
    } else {
        None
    };

    if let Some(c) = &classification {
        if matches!(c.intent, crate::intent::Intent::ExplicitCommand) {
            let stream = futures_util::stream::iter(vec![
                Ok(SseEvent::default().event("error").json_data(serde_json::json!({
                    "error": "explicit commands are not executed over chat/stream",
                    "redirect": "POST /orchestrate then POST /execute/{task_id}",
                })).unwrap_or_else(|_| SseEvent::default())),
                Ok(SseEvent::default().event("done").data("true")),
            ])
            .chain(futures_util::stream::once(async {
                Ok(SseEvent::default().data("[DONE]"))
            }));
            return Sse::new(Box::pin(stream) as ChatStream);
        }
    }

    let mut history = state.sessions.recall(&session_id).await.unwrap_or_default();
    history.push(Message::human(req.message.clone()));
    if let Err(e) = state.sessions.append(&session_id, &[Message::human(req.message.clone())]).await {
        tracing::warn!(error = %e, "failed to persist chat turn to session history");
    }

    // Subscribe before spawning so no early event is missed.
    let rx = state.events.subscribe_workflow(&workflow_id);
    // Registered before spawning too, so a disconnect during the brief
    // window before the background task starts still has a token to cancel.
    state.cancellation.register(&workflow_id);

    let mut workflow_state = WorkflowState::new(workflow_id.clone());
    workflow_state.messages = history;
    if let Some(c) = &classification {
        workflow_state.intent_hint = Some(c.intent.as_str().to_string());
    }
    if let Some(ctx) = req.project_context {
        workflow_state.project_context = Some(ctx);
    }

    state.mark_workflow(workflow_id.clone(), WorkflowKind::Graph);
    let keepalive = crate::events::KeepaliveTicker::spawn(
        (*state.events).clone(),
        workflow_id.clone(),
        std::time::Duration::from_millis(state.config.keepalive_interval_ms),
    );

    let graph_engine = state.graph_engine.clone();
    let events = state.events.clone();
    let sessions = state.sessions.clone();
    let session_id_bg = session_id.clone();
    let workflow_id_bg = workflow_id.clone();
    let cancellation_bg = state.cancellation.clone();
    tokio::spawn(async move {
        let _keepalive = keepalive;
        match graph_engine.invoke(workflow_state).await {
            Ok(final_state) => {
                if let Some(last) = final_state.messages.last() {
                    let _ = sessions.append(&session_id_bg, std::slice::from_ref(last)).await;
                }
            }
            Err(OrchestratorError::CancelledByCaller) => {
                events.publish(
                    "workflow",
                    Event::new(
                        workflow_id_bg.clone(),
                        EventKind::Error,
                        serde_json::json!({"error": "workflow cancelled by caller"}),
                    ),
                );
            }
            Err(e) => {
                events.publish(
                    "workflow",
                    Event::new(
                        workflow_id_bg.clone(),
                        EventKind::Error,
                        serde_json::json!({"error": e.to_string()}),
                    ),
                );
            }
        }
        events.publish(
            "workflow",
            Event::new(workflow_id_bg.clone(), EventKind::Done, serde_json::Value::Null),
        );
        cancellation_bg.unregister(&workflow_id_bg);
    });

    let guard = CancelGuard::new(state.cancellation.clone(), workflow_id.clone());
    let stream = workflow_event_stream_with_cancel(rx, guard)
        .chain(futures_util::stream::once(async {
            Ok(SseEvent::default().data("[DONE]"))
        }));

    Sse::new(Box::pin(stream) as ChatStream)
}

/// `POST workflow/execute`: launch a named declarative template.
/// Persists `state` as the next checkpoint for `workflow_id`. The template
/// engine (unlike the graph engine) has no `CheckpointSaver` of its own, so
/// the handler that drives it owns this responsibility directly.
async fn persist_template_checkpoint(
    db: &crate::db::connection::DatabasePool,
    workflow_id: &str,
    state: &WorkflowState,
) -> crate::Result<()> {
    let expected_version = crate::db::repositories::CheckpointRepository::load_latest(db, workflow_id)
        .await?
        .map(|c| c.version)
        .unwrap_or(0);
    let snapshot = serde_json::to_string(state)?;
    crate::db::repositories::CheckpointRepository::save(db, workflow_id, expected_version, &snapshot).await?;
    Ok(())
}

pub async fn workflow_execute(
    State(state): State<OrchestrationState>,
    Json(req): Json<WorkflowExecuteRequest>,
) -> Result<Json<WorkflowExecuteResponse>, ApiError> {
    let workflow_id = Uuid::new_v4().to_string();
    let mut workflow_state = WorkflowState::new(workflow_id.clone());
    workflow_state.project_context = Some(req.input);

    state.mark_workflow(workflow_id.clone(), WorkflowKind::Template { name: req.name.clone() });

    let template_engine = state.template_engine.clone();
    let events = state.events.clone();
    let workflow_id_bg = workflow_id.clone();

    // Template definitions are looked up once, here, rather than re-fetched
    // on every status/resume call: the engine only needs the static steps,
    // never the stored row after launch.
    let template = crate::db::repositories::WorkflowRepository::find_by_name(&state.db, &req.name)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?
        .ok_or_else(|| OrchestratorError::TaskNotFound(req.name.clone()))?;
    let parsed: crate::template_engine::WorkflowTemplate = serde_json::from_str(&template.definition)?;

    let db_bg = state.db.clone();
    tokio::spawn(async move {
        let result = template_engine.run(&parsed, workflow_state).await;
        match &result {
            Ok(final_state) => {
                if let Err(e) = persist_template_checkpoint(&db_bg, &workflow_id_bg, final_state).await {
                    tracing::warn!(error = %e, workflow_id = %workflow_id_bg, "failed to persist template checkpoint");
                }
            }
            Err(e) => {
                events.publish(
                    "workflow",
                    Event::new(
                        workflow_id_bg.clone(),
                        EventKind::Error,
                        serde_json::json!({"error": e.to_string()}),
                    ),
                );
            }
        }
        events.publish(
            "workflow",
            Event::new(workflow_id_bg, EventKind::Done, serde_json::Value::Null),
        );
    });

    Ok(Json(WorkflowExecuteResponse { workflow_id }))
}

/// `GET workflow/status/{id}`.
pub async fn workflow_status(
    State(state): State<OrchestrationState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowStatusResponse>, ApiError> {
    let checkpoint = crate::db::repositories::CheckpointRepository::load_latest(&state.db, &workflow_id)
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(workflow_id.clone()))?;
    let snapshot: WorkflowState = serde_json::from_str(&checkpoint.snapshot)?;

    let pending_approval = match &snapshot.pending_operation {
        Some(op) => Some(PendingApprovalView {
            approval_id: op.approval_handle.clone(),
            risk_level: op.risk_level.clone(),
            operation: op.operation.clone(),
        }),
        None => None,
    };

    let status = match snapshot.status {
        WorkflowStatus::Running => "running",
        WorkflowStatus::PausedForApproval => "paused_for_approval",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Cancelled => "cancelled",
    };

    Ok(Json(WorkflowStatusResponse {
        workflow_id,
        status: status.to_string(),
        current_step: snapshot.current_agent,
        pending_approval,
    }))
}

/// `POST workflow/resume/{id}`: resume a workflow parked on a HITL
/// approval, dispatching to the graph engine or the template engine
/// depending on which one launched it.
pub async fn workflow_resume(
    State(state): State<OrchestrationState>,
    Path(workflow_id): Path<String>,
    Json(req): Json<WorkflowResumeRequest>,
) -> Result<Json<WorkflowStatusResponse>, ApiError> {
    let decision = if req.approved {
        ApprovalDecision::Approved
    } else {
        ApprovalDecision::Rejected
    };
    let actor = req.actor.as_deref().unwrap_or("unknown");

    let ticket = state
        .hitl
        .resolve(&req.approval_id, decision, actor, None)
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(req.approval_id.clone()))?;

    let kind = state.workflow_kind(&workflow_id);
    let final_state = match kind {
        Some(WorkflowKind::Template { name }) => {
            let template_row = crate::db::repositories::WorkflowRepository::find_by_name(&state.db, &name)
                .await
                .map_err(|e| OrchestratorError::General(e.to_string()))?
                .ok_or_else(|| OrchestratorError::TaskNotFound(name.clone()))?;
            let parsed: crate::template_engine::WorkflowTemplate =
                serde_json::from_str(&template_row.definition)?;
            let checkpoint =
                crate::db::repositories::CheckpointRepository::load_latest(&state.db, &workflow_id)
                    .await?
                    .ok_or_else(|| OrchestratorError::TaskNotFound(workflow_id.clone()))?;
            let snapshot: WorkflowState = serde_json::from_str(&checkpoint.snapshot)?;
            let resumed = state
                .template_engine
                .resume(&parsed, snapshot, req.approved)
                .await?;
            persist_template_checkpoint(&state.db, &workflow_id, &resumed).await?;
            resumed
        }
        _ => state.graph_engine.resume(&workflow_id, ticket).await?,
    };

    let status = match final_state.status {
        WorkflowStatus::Running => "running",
        WorkflowStatus::PausedForApproval => "paused_for_approval",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Cancelled => "cancelled",
    };

    let pending_approval = final_state.pending_operation.as_ref().map(|op| PendingApprovalView {
        approval_id: op.approval_handle.clone(),
        risk_level: op.risk_level.clone(),
        operation: op.operation.clone(),
    });

    Ok(Json(WorkflowStatusResponse {
        workflow_id,
        status: status.to_string(),
        current_step: final_state.current_agent,
        pending_approval,
    }))
}

/// `POST approvals/{id}/approve` and `POST approvals/{id}/reject`.
async fn resolve_approval(
    state: OrchestrationState,
    approval_id: String,
    decision: ApprovalDecision,
    req: ApprovalDecisionRequest,
) -> Result<Json<ApprovalDecisionResponse>, ApiError> {
    let actor = req.actor.as_deref().unwrap_or("unknown");
    let ticket = state
        .hitl
        .resolve(&approval_id, decision, actor, req.reason.as_deref())
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(approval_id.clone()))?;

    let workflow_id = ticket.workflow_id.clone();
    let decision_str = match decision {
        ApprovalDecision::Approved => "approved",
        ApprovalDecision::Rejected => "rejected",
    };

    let state_bg = state.clone();
    let workflow_id_bg = workflow_id.clone();
    tokio::spawn(async move {
        let kind = state_bg.workflow_kind(&workflow_id_bg);
        let result = match kind {
            Some(WorkflowKind::Template { name }) => {
                resume_template_workflow(&state_bg, &name, &workflow_id_bg, matches!(decision, ApprovalDecision::Approved)).await
            }
            _ => state_bg.graph_engine.resume(&workflow_id_bg, ticket).await.map(|_| ()),
        };
        if let Err(e) = result {
            state_bg.events.publish(
                "workflow",
                Event::new(
                    workflow_id_bg.clone(),
                    EventKind::Error,
                    serde_json::json!({"error": e.to_string()}),
                ),
            );
        }
        state_bg.events.publish(
            "workflow",
            Event::new(workflow_id_bg, EventKind::Done, serde_json::Value::Null),
        );
    });

    Ok(Json(ApprovalDecisionResponse {
        approval_id,
        workflow_id,
        decision: decision_str.to_string(),
    }))
}

async fn resume_template_workflow(
    state: &OrchestrationState,
    name: &str,
    workflow_id: &str,
    approved: bool,
) -> crate::Result<()> {
    let template_row = crate::db::repositories::WorkflowRepository::find_by_name(&state.db, name)
        .await
        .map_err(|e| OrchestratorError::General(e.to_string()))?
        .ok_or_else(|| OrchestratorError::TaskNotFound(name.to_string()))?;
    let parsed: crate::template_engine::WorkflowTemplate = serde_json::from_str(&template_row.definition)?;
    let checkpoint = crate::db::repositories::CheckpointRepository::load_latest(&state.db, workflow_id)
        .await?
        .ok_or_else(|| OrchestratorError::TaskNotFound(workflow_id.to_string()))?;
    let snapshot: WorkflowState = serde_json::from_str(&checkpoint.snapshot)?;
    let resumed = state.template_engine.resume(&parsed, snapshot, approved).await?;
    persist_template_checkpoint(&state.db, workflow_id, &resumed).await?;
    Ok(())
}

pub async fn approve(
    State(state): State<OrchestrationState>,
    Path(approval_id): Path<String>,
    Json(req): Json<ApprovalDecisionRequest>,
) -> Result<Json<ApprovalDecisionResponse>, ApiError> {
    resolve_approval(state, approval_id, ApprovalDecision::Approved, req).await
}

pub async fn reject(
    State(state): State<OrchestrationState>,
    Path(approval_id): Path<String>,
    Json(req): Json<ApprovalDecisionRequest>,
) -> Result<Json<ApprovalDecisionResponse>, ApiError> {
    resolve_approval(state, approval_id, ApprovalDecision::Rejected, req).await
}

//! Agent Slot: a single specialist agent's tool-calling turn.
//!
//! An agent slot wraps one [`ChatModel`] behind a fixed identity (name,
//! system prompt, bound tools) and drives the chat/tool-call loop to
//! completion: call the model, and if it asks for tools, invoke them through
//! the [`ToolGateway`] boundary and feed the results back, up to
//! [`MAX_TOOL_ITERATIONS`].

use crate::events::{Event, EventBus, EventKind};
use crate::state::{CapturedInsight, WorkflowState};
use crate::tool_binder::{DisclosureStrategy, ToolBinder};
use crate::{OrchestratorError, Result};
use agentflow_core::llm::{ChatModel, ChatRequest};
use agentflow_core::messages::{Message, MessageRole};
use agentflow_tooling::runtime::{ToolRequest, ToolResponse};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// An agent slot's tool-call loop gives up after this many round trips with
/// the model, folding the last response back as a final message rather than
/// failing the node (see [`OrchestratorError::MaxIterationsExceeded`]).
pub const MAX_TOOL_ITERATIONS: usize = 8;

/// Boundary to the external tool gateway. The orchestrator never executes
/// tools itself; it only knows how to ask this trait to run one.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn invoke(&self, request: ToolRequest) -> Result<ToolResponse>;
}

/// Outcome of a completed agent slot turn: the final assistant message, any
/// insight worth surfacing to later agents, and whether the loop exhausted
/// its tool-call budget instead of reaching a natural stop.
#[derive(Debug, Clone)]
pub struct AgentTurnResult {
    pub message: Message,
    pub captured_insight: Option<CapturedInsight>,
    pub exhausted: bool,
}

/// A single named specialist agent: model, system prompt, and the subset of
/// tools it's allowed to see via the [`ToolBinder`].
pub struct AgentSlot {
    name: String,
    chat_model: Arc<dyn ChatModel>,
    tool_gateway: Arc<dyn ToolGateway>,
    tool_binder: Arc<ToolBinder>,
    system_prompt: String,
    disclosure: DisclosureStrategy,
    max_tool_iterations: usize,
    resource_lock: Option<String>,
}

impl AgentSlot {
    pub fn new(
        name: impl Into<String>,
        chat_model: Arc<dyn ChatModel>,
        tool_gateway: Arc<dyn ToolGateway>,
        tool_binder: Arc<ToolBinder>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            chat_model,
            tool_gateway,
            tool_binder,
            system_prompt: system_prompt.into(),
            disclosure: DisclosureStrategy::Progressive,
            max_tool_iterations: MAX_TOOL_ITERATIONS,
            resource_lock: None,
        }
    }

    pub fn with_disclosure(mut self, strategy: DisclosureStrategy) -> Self {
        self.disclosure = strategy;
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    /// Declares a resource this agent's node must hold for the duration of
    /// its turn (spec §4.8 node execution protocol steps 2/6). The graph
    /// engine acquires it before invoking the slot and releases it on every
    /// exit path.
    pub fn with_resource_lock(mut self, resource: impl Into<String>) -> Self {
        self.resource_lock = Some(resource.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_lock(&self) -> Option<&str> {
        self.resource_lock.as_deref()
    }

    /// Run this agent's turn to completion against the given workflow
    /// history, looping on tool calls until the model produces a plain
    /// message or the iteration budget is exhausted.
    ///
    /// `cancel`, if given, is polled at the top of every tool-call iteration
    /// (spec §5 suspension point and cancellation check): a cancelled token
    /// aborts the turn with [`OrchestratorError::CancelledByCaller`] instead
    /// of starting another round trip with the model.
    pub async fn run(&self, state: &WorkflowState, cancel: Option<&CancellationToken>) -> Result<AgentTurnResult> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(state.messages.iter().cloned());

        for iteration in 0..self.max_tool_iterations {
            if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                return Err(OrchestratorError::CancelledByCaller);
            }
            let tools = self.tool_binder.tools_for(&self.name, self.disclosure, iteration);
            let mut request = ChatRequest::new(messages.clone());
            if !tools.is_empty() {
                request = request.with_tools(tools);
            }

            // Transient provider errors (429/503/network) are retried with
            // exponential backoff up to 3 attempts before the turn fails
            // (spec §4.5); anything else propagates immediately.
            let policy = agentflow_tooling::async_utils::retry::RetryPolicy::new(3);
            let response = agentflow_tooling::async_utils::retry::with_retry(&policy, || {
                self.chat_model.chat(request.clone())
            })
            .await
            .map_err(|e| {
                OrchestratorError::TransientProviderError(format!(
                    "agent {} chat call failed after retries: {e}",
                    self.name
                ))
            })?;

            let Some(tool_calls) = response.message.tool_calls.clone() else {
                debug!(agent = %self.name, iteration, "agent slot reached a final message");
                let insight = response.message.text().map(|text| CapturedInsight {
                    agent: self.name.clone(),
                    content: text.to_string(),
                    emitted_at: Utc::now(),
                });
                return Ok(AgentTurnResult {
                    message: response.message,
                    captured_insight: insight,
                    exhausted: false,
                });
            };

            messages.push(response.message.clone());

            for call in tool_calls {
                let tool_request = ToolRequest::new(call.name.clone())
                    .with_session_id(state.thread_id.clone());
                let tool_request = match &call.arguments {
                    serde_json::Value::Object(map) => map.iter().fold(
                        tool_request,
                        |req, (k, v)| req.with_arg(k.clone(), v.clone()),
                    ),
                    _ => tool_request,
                };

                let tool_response = match self.tool_gateway.invoke(tool_request).await {
                    Ok(resp) => resp,
                    Err(e) if e.is_agent_recoverable() => {
                        warn!(agent = %self.name, tool = %call.name, error = %e, "tool call failed, folding error back to agent");
                        ToolResponse::error(call.name.clone(), e.to_string())
                    }
                    Err(e) => return Err(e),
                };

                let content = tool_response
                    .result
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| tool_response.error.unwrap_or_default());
                messages.push(Message::tool(content, call.id));
            }
        }

        warn!(agent = %self.name, "agent slot exhausted tool-call budget");
        let last = messages
            .last()
            .cloned()
            .unwrap_or_else(|| Message::assistant(""));
        Ok(AgentTurnResult {
            message: Message::assistant(
                last.text()
                    .unwrap_or("I wasn't able to complete this within the allotted tool calls.")
                    .to_string(),
            ),
            captured_insight: None,
            exhausted: true,
        })
    }

    /// Run this agent's turn as a single streamed completion, publishing a
    /// `content_token` event per chunk as it arrives (spec §4.5 step iv,
    /// §4.8's `CONVERSATIONAL_HANDLER`). Used by the fast-path entry route,
    /// which answers QA/simple turns directly without the supervisor's
    /// tool-calling, multi-turn machinery — so unlike [`Self::run`] this does
    /// not loop on tool calls; `ChatModel::stream` never reports them (the
    /// trait only surfaces tool calls from `chat`), and a direct
    /// conversational answer is plain text by definition.
    pub async fn run_streaming(
        &self,
        state: &WorkflowState,
        events: &EventBus,
        cancel: Option<&CancellationToken>,
    ) -> Result<AgentTurnResult> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(state.messages.iter().cloned());

        let request = ChatRequest::new(messages);
        let stream_response = self.chat_model.stream(request).await.map_err(|e| {
            OrchestratorError::TransientProviderError(format!(
                "agent {} stream call failed: {e}",
                self.name
            ))
        })?;

        let mut content = String::new();
        let mut stream = stream_response.stream;
        while let Some(chunk) = stream.next().await {
            if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                return Err(OrchestratorError::CancelledByCaller);
            }
            if chunk.content.is_empty() {
                continue;
            }
            content.push_str(&chunk.content);
            events.publish(
                "workflow",
                Event::new(
                    state.workflow_id.clone(),
                    EventKind::ContentToken,
                    serde_json::json!({"agent": self.name, "content": chunk.content}),
                ),
            );
        }

        let insight = if content.is_empty() {
            None
        } else {
            Some(CapturedInsight {
                agent: self.name.clone(),
                content: content.clone(),
                emitted_at: Utc::now(),
            })
        };

        Ok(AgentTurnResult {
            message: Message::ai(content),
            captured_insight: insight,
            exhausted: false,
        })
    }
}

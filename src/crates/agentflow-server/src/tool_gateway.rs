//! HTTP-backed [`ToolGateway`](crate::agent_slot::ToolGateway): the
//! production implementation of the tool gateway contract (spec §6):
//! `GET /tools` lists descriptors, `POST /tools/{server}/{tool}` invokes one.
//!
//! Non-2xx responses and transport failures are both folded into an
//! [`OrchestratorError::ToolInvocationError`], which `AgentSlot::run` treats
//! as agent-recoverable (spec §7 propagation policy) rather than failing the
//! node outright.

use crate::agent_slot::ToolGateway;
use crate::{OrchestratorError, Result};
use agentflow_tooling::runtime::{ToolRequest, ToolResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A tool descriptor as listed by `GET /tools`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub server: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
struct GatewayInvokeResponse {
    success: bool,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

/// Talks to an external tool gateway over HTTP. The orchestrator itself
/// never executes a tool; this is the one boundary that turns a model's
/// tool-call request into a side effect.
pub struct HttpToolGateway {
    base_url: String,
    client: Client,
}

impl HttpToolGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build tool gateway HTTP client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// List every tool descriptor the gateway currently exposes.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let url = format!("{}/tools", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OrchestratorError::ToolInvocationError(format!("GET /tools failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OrchestratorError::ToolInvocationError(format!(
                "GET /tools returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OrchestratorError::ToolInvocationError(format!("malformed tool list: {e}")))
    }
}

/// A tool name is addressed to the gateway as `server/tool`; when the model
/// only supplies a bare tool name, it's dispatched against this default
/// server.
const DEFAULT_SERVER: &str = "default";

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn invoke(&self, request: ToolRequest) -> Result<ToolResponse> {
        let (server, tool) = request
            .tool
            .split_once('/')
            .unwrap_or((DEFAULT_SERVER, request.tool.as_str()));

        let url = format!(
            "{}/tools/{}/{}",
            self.base_url.trim_end_matches('/'),
            server,
            tool
        );

        let body = serde_json::Value::Object(
            request
                .args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let sent = self.client.post(&url).json(&body).send().await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                return Err(OrchestratorError::ToolInvocationError(format!(
                    "tool gateway request for {} failed: {e}",
                    request.tool
                )))
            }
        };

        let status = response.status();
        let parsed: std::result::Result<GatewayInvokeResponse, _> = response.json().await;

        match parsed {
            Ok(body) if status.is_success() && body.success => {
                Ok(ToolResponse::success(request.tool, body.result.unwrap_or(serde_json::Value::Null)))
            }
            Ok(body) => Ok(ToolResponse::error(
                request.tool,
                body.error.unwrap_or_else(|| format!("tool gateway returned {status}")),
            )),
            Err(_) if !status.is_success() => Ok(ToolResponse::error(
                request.tool,
                format!("tool gateway returned {status}"),
            )),
            Err(e) => Ok(ToolResponse::error(
                request.tool,
                format!("malformed tool gateway response: {e}"),
            )),
        }
    }
}

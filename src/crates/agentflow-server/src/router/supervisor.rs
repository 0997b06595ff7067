//! Supervisor (spec §4.7): an agent slot whose sole responsibility is
//! deciding which agent runs next. Its prompt constrains output to a fixed
//! text format; this module parses that format and falls back to treating
//! the turn as conversational when the model drifts into free text — the
//! observed failure mode the spec calls out.

use agentflow_core::llm::{ChatModel, ChatRequest};
use agentflow_core::messages::Message;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Sentinel `next_agent` values alongside concrete agent names.
pub const END: &str = "END";
pub const CONVERSATIONAL: &str = "conversational";

/// Detects a well-formed supervisor response: the first non-blank line
/// must open with `NEXT_AGENT:` followed by a non-whitespace token. This is
/// the implementation-chosen regex the spec leaves open (§9 open questions).
fn well_formed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^NEXT_AGENT:\s*\S+").unwrap())
}

#[derive(Debug, Clone)]
pub struct SupervisorDecision {
    pub next_agent: String,
    pub requires_approval: bool,
    pub reasoning: String,
    /// `true` if the model's output didn't match the fixed format and the
    /// graph should treat this turn as conversational instead of routing.
    pub malformed: bool,
}

const SUPERVISOR_SYSTEM_PROMPT: &str = r#"You are the supervisor of a multi-agent software engineering team. Given the conversation so far, decide which specialist agent should act next.

Respond in exactly this format, one field per line:
NEXT_AGENT: <agent name, END, or conversational>
REQUIRES_APPROVAL: <true or false>
REASONING: <one sentence>
"#;

pub struct Supervisor {
    llm: Arc<dyn ChatModel>,
    known_agents: Vec<String>,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn ChatModel>, known_agents: Vec<String>) -> Self {
        Self { llm, known_agents }
    }

    /// Render a decision for the current conversation history.
    pub async fn route(&self, messages: &[Message]) -> crate::Result<SupervisorDecision> {
        let mut prompt_messages = vec![Message::system(SUPERVISOR_SYSTEM_PROMPT)];
        prompt_messages.extend(messages.iter().cloned());

        let request = ChatRequest::new(prompt_messages).with_temperature(0.0);
        let response = self.llm.chat(request).await.map_err(|e| {
            crate::OrchestratorError::General(format!("supervisor LLM call failed: {e}"))
        })?;

        let text = response.message.text().unwrap_or_default();
        Ok(self.parse_decision(text))
    }

    /// Parse the fixed-format decision text, falling back to a
    /// conversational decision when the format isn't matched.
    fn parse_decision(&self, text: &str) -> SupervisorDecision {
        let first_non_blank = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");

        if !well_formed_regex().is_match(first_non_blank) {
            warn!("supervisor emitted malformed output, reclassifying as conversational");
            return SupervisorDecision {
                next_agent: CONVERSATIONAL.to_string(),
                requires_approval: false,
                reasoning: Self::extract_reasoning(text),
                malformed: true,
            };
        }

        let mut next_agent = CONVERSATIONAL.to_string();
        let mut requires_approval = false;
        let mut reasoning = String::new();

        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("NEXT_AGENT:") {
                next_agent = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("REQUIRES_APPROVAL:") {
                requires_approval = rest.trim().eq_ignore_ascii_case("true");
            } else if let Some(rest) = line.strip_prefix("REASONING:") {
                reasoning = rest.trim().to_string();
            }
        }

        if next_agent != END
            && next_agent != CONVERSATIONAL
            && !self.known_agents.iter().any(|a| a == &next_agent)
        {
            warn!(agent = %next_agent, "supervisor named an unknown agent, routing to conversational");
            return SupervisorDecision {
                next_agent: CONVERSATIONAL.to_string(),
                requires_approval: false,
                reasoning,
                malformed: true,
            };
        }

        SupervisorDecision {
            next_agent,
            requires_approval,
            reasoning,
            malformed: false,
        }
    }

    /// Best-effort extraction of a `REASONING:` line from otherwise
    /// free-form text, so the user still sees something explanatory when
    /// the supervisor drifts off-format.
    fn extract_reasoning(text: &str) -> String {
        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("REASONING:") {
                return rest.trim().to_string();
            }
        }
        text.trim().to_string()
    }

    /// Strip `NEXT_AGENT:`/`REQUIRES_APPROVAL:` lines from text destined for
    /// the user-facing stream, leaving only the reasoning (spec §4.7, §4.8).
    pub fn filter_routing_lines(text: &str) -> String {
        text.lines()
            .filter(|line| {
                let trimmed = line.trim();
                !trimmed.starts_with("NEXT_AGENT:") && !trimmed.starts_with("REQUIRES_APPROVAL:")
            })
            .map(|line| line.trim_start_matches("REASONING:").trim())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::error::{GraphError, Result as GraphResult};
    use agentflow_core::llm::{self, ChatResponse};
    use async_trait::async_trait;

    #[derive(Clone)]
    struct StubModel {
        response: String,
    }

    #[async_trait]
    impl ChatModel for StubModel {
        async fn chat(&self, _request: ChatRequest) -> GraphResult<ChatResponse> {
            Ok(ChatResponse {
                message: Message::ai(self.response.clone()),
                reasoning: None,
                usage: None,
                metadata: Default::default(),
            })
        }

        async fn stream(&self, _request: ChatRequest) -> GraphResult<llm::ChatStreamResponse> {
            Err(GraphError::Validation("not implemented".to_string()))
        }

        fn clone_box(&self) -> Box<dyn ChatModel> {
            Box::new(self.clone())
        }
    }

    fn supervisor(response: &str) -> Supervisor {
        Supervisor::new(
            Arc::new(StubModel {
                response: response.to_string(),
            }),
            vec!["feature_dev".to_string(), "code_review".to_string()],
        )
    }

    #[tokio::test]
    async fn well_formed_decision_parses() {
        let sup = supervisor(
            "NEXT_AGENT: feature_dev\nREQUIRES_APPROVAL: false\nREASONING: needs a code change",
        );
        let decision = sup.route(&[Message::human("fix the bug")]).await.unwrap();
        assert_eq!(decision.next_agent, "feature_dev");
        assert!(!decision.requires_approval);
        assert!(!decision.malformed);
    }

    #[tokio::test]
    async fn malformed_output_falls_back_to_conversational() {
        let sup = supervisor("Sure, I can help you with that! Let me think about this.");
        let decision = sup.route(&[Message::human("what's up")]).await.unwrap();
        assert_eq!(decision.next_agent, CONVERSATIONAL);
        assert!(decision.malformed);
    }

    #[tokio::test]
    async fn unknown_agent_name_falls_back() {
        let sup =
            supervisor("NEXT_AGENT: nonexistent_agent\nREQUIRES_APPROVAL: false\nREASONING: x");
        let decision = sup.route(&[Message::human("do a thing")]).await.unwrap();
        assert_eq!(decision.next_agent, CONVERSATIONAL);
        assert!(decision.malformed);
    }

    #[test]
    fn filter_routing_lines_keeps_only_reasoning() {
        let text = "NEXT_AGENT: feature_dev\nREQUIRES_APPROVAL: false\nREASONING: doing the fix";
        assert_eq!(Supervisor::filter_routing_lines(text), "doing the fix");
    }
}

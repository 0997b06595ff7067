//! Intent Classifier (spec §4.6): maps a user message to one of a closed set
//! of entry routes. Heuristics run first and are fast enough to stay on the
//! hot path (budget 30 ms); an optional LLM fallback only fires when
//! heuristic confidence is too low to trust (budget 1 s total).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

/// Below this confidence, the heuristic result is not trusted on its own.
pub const LLM_FALLBACK_CONFIDENCE_THRESHOLD: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Qa,
    SimpleTask,
    MediumComplexity,
    HighComplexity,
    ExplicitCommand,
}

impl Intent {
    /// Stable string form stored in `WorkflowState.intent_hint` and matched
    /// by the graph engine's entry router (spec §4.8 entry routing table).
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Qa => "QA",
            Intent::SimpleTask => "SIMPLE_TASK",
            Intent::MediumComplexity => "MEDIUM_COMPLEXITY",
            Intent::HighComplexity => "HIGH_COMPLEXITY",
            Intent::ExplicitCommand => "EXPLICIT_COMMAND",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    pub reason: String,
}

fn question_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(what|how|why|explain|tell me|describe)\b").unwrap()
    })
}

const SIMPLE_VERBS: &[&str] = &["show", "list", "find", "search", "read", "get", "check"];
const MEDIUM_VERBS: &[&str] = &["implement", "fix", "add", "update", "write", "create"];
const HIGH_VERBS: &[&str] = &["deploy", "refactor", "migrate", "redesign", "architect"];

/// Trait boundary for the optional LLM fallback (spec §6: LLM provider is an
/// external collaborator referenced only through its contract).
#[async_trait::async_trait]
pub trait IntentLlmFallback: Send + Sync {
    async fn classify(&self, message: &str) -> crate::Result<Classification>;
}

pub struct IntentClassifier {
    llm_fallback: Option<Box<dyn IntentLlmFallback>>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self { llm_fallback: None }
    }

    pub fn with_llm_fallback(mut self, fallback: Box<dyn IntentLlmFallback>) -> Self {
        self.llm_fallback = Some(fallback);
        self
    }

    /// Classify `message`, running the heuristic pass first and falling
    /// back to an LLM call only if heuristic confidence is below threshold
    /// and a fallback is configured.
    pub async fn classify(&self, message: &str) -> Classification {
        let started = Instant::now();
        let heuristic = Self::classify_heuristic(message);
        debug!(elapsed_us = started.elapsed().as_micros(), "heuristic classification");

        if heuristic.confidence >= LLM_FALLBACK_CONFIDENCE_THRESHOLD {
            return heuristic;
        }

        if let Some(fallback) = &self.llm_fallback {
            match fallback.classify(message).await {
                Ok(refined) => return refined,
                Err(e) => {
                    debug!(error = %e, "LLM intent fallback failed, using heuristic result");
                }
            }
        }

        heuristic
    }

    /// Pure heuristic classification: prefix checks, question regex, and
    /// action-verb keyword sets. No I/O, no async — runs in microseconds.
    pub fn classify_heuristic(message: &str) -> Classification {
        let trimmed = message.trim();

        if trimmed.starts_with('/') {
            return Classification {
                intent: Intent::ExplicitCommand,
                confidence: 1.0,
                reason: "message starts with '/'".to_string(),
            };
        }

        if question_regex().is_match(trimmed) {
            return Classification {
                intent: Intent::Qa,
                confidence: 0.9,
                reason: "matches question prefix pattern".to_string(),
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        let first_word = lower.split_whitespace().next().unwrap_or("");

        if HIGH_VERBS.iter().any(|v| first_word == *v || lower.contains(v)) {
            return Classification {
                intent: Intent::HighComplexity,
                confidence: 0.85,
                reason: format!("matched high-complexity verb in \"{first_word}\""),
            };
        }

        if MEDIUM_VERBS.iter().any(|v| first_word == *v || lower.contains(v)) {
            return Classification {
                intent: Intent::MediumComplexity,
                confidence: 0.85,
                reason: format!("matched medium-complexity verb in \"{first_word}\""),
            };
        }

        if SIMPLE_VERBS.iter().any(|v| first_word == *v) {
            return Classification {
                intent: Intent::SimpleTask,
                confidence: 0.8,
                reason: format!("matched simple-task verb \"{first_word}\""),
            };
        }

        if trimmed.ends_with('?') {
            return Classification {
                intent: Intent::Qa,
                confidence: 0.7,
                reason: "ends with '?' but no recognized question prefix".to_string(),
            };
        }

        Classification {
            intent: Intent::MediumComplexity,
            confidence: 0.4,
            reason: "no heuristic matched; defaulting to medium complexity".to_string(),
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_command_detected() {
        let c = IntentClassifier::classify_heuristic("/execute deploy-checklist");
        assert_eq!(c.intent, Intent::ExplicitCommand);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn question_prefix_is_qa() {
        let c = IntentClassifier::classify_heuristic("What can you do?");
        assert_eq!(c.intent, Intent::Qa);
        assert!(c.confidence >= LLM_FALLBACK_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn fix_bug_is_medium_complexity() {
        let c = IntentClassifier::classify_heuristic("Fix bug in login.py");
        assert_eq!(c.intent, Intent::MediumComplexity);
    }

    #[test]
    fn deploy_is_high_complexity() {
        let c = IntentClassifier::classify_heuristic("deploy the new service to prod");
        assert_eq!(c.intent, Intent::HighComplexity);
    }

    #[test]
    fn show_status_is_simple_task() {
        let c = IntentClassifier::classify_heuristic("show me the current status");
        assert_eq!(c.intent, Intent::SimpleTask);
    }

    #[tokio::test]
    async fn low_confidence_falls_back_to_llm_when_configured() {
        struct StubFallback;
        #[async_trait::async_trait]
        impl IntentLlmFallback for StubFallback {
            async fn classify(&self, _message: &str) -> crate::Result<Classification> {
                Ok(Classification {
                    intent: Intent::Qa,
                    confidence: 0.95,
                    reason: "llm refined".to_string(),
                })
            }
        }

        let classifier = IntentClassifier::new().with_llm_fallback(Box::new(StubFallback));
        let result = classifier.classify("blah blah ambiguous input").await;
        assert_eq!(result.intent, Intent::Qa);
        assert_eq!(result.reason, "llm refined");
    }
}

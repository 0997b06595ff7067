//! Response types returned from `ChatModel::chat()` and `ChatModel::stream()`.

use crate::llm_stream::MessageChunkStream;
use crate::Message;
use serde_json::Value;
use std::collections::HashMap;

/// Token usage statistics for a single chat completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageMetadata {
    /// Tokens consumed by the prompt (messages, system prompt, tool definitions).
    pub input_tokens: usize,

    /// Tokens generated in the response, excluding any separated reasoning tokens.
    pub output_tokens: usize,

    /// Tokens spent on internal reasoning/thinking, for models that report it
    /// separately (OpenAI o1, DeepSeek R1). `None` when the provider doesn't
    /// break this out.
    pub reasoning_tokens: Option<usize>,

    /// Total tokens billed for the request.
    pub total_tokens: usize,
}

impl UsageMetadata {
    /// Build usage from prompt/completion token counts; `total_tokens` is their sum.
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens: None,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Build usage including a separately-reported reasoning token count.
    ///
    /// `total_tokens` sums input, output, and reasoning tokens.
    pub fn with_reasoning(input_tokens: usize, output_tokens: usize, reasoning_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens: Some(reasoning_tokens),
            total_tokens: input_tokens + output_tokens + reasoning_tokens,
        }
    }
}

/// Extended reasoning/thinking content extracted from a thinking model's response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningContent {
    /// The model's internal reasoning text, separated from the final answer.
    pub content: String,
}

impl ReasoningContent {
    /// Wrap raw reasoning text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// A complete response from a chat model.
///
/// Returned by `ChatModel::chat()`. Carries the assistant's message, token
/// usage, optional reasoning content, and any provider-specific metadata
/// (model name, finish reason, etc.) the implementation chooses to surface.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's response message.
    pub message: Message,

    /// Token usage for this request, when the provider reports it.
    pub usage: Option<UsageMetadata>,

    /// Separated reasoning content, for thinking models using
    /// `ReasoningMode::Separated` or `ReasoningMode::Extended`.
    pub reasoning: Option<ReasoningContent>,

    /// Provider-specific metadata (`model`, `stop_reason`, `finish_reason`, ...).
    pub metadata: HashMap<String, Value>,
}

/// A streaming response from a chat model.
///
/// Returned by `ChatModel::stream()`. The `stream` field yields message
/// chunks as they arrive; `usage` and `reasoning` are only known once the
/// stream has been fully drained, so implementations populate them lazily
/// (typically via an `Arc<Mutex<..>>` or a final chunk's metadata) rather
/// than up front.
pub struct ChatStreamResponse {
    /// The underlying token/message chunk stream.
    pub stream: MessageChunkStream,

    /// Reasoning content, if the provider streams it separately and the
    /// implementation chooses to buffer and expose it here rather than
    /// inline in chunk metadata.
    pub reasoning: Option<ReasoningContent>,

    /// Usage statistics, populated once available (often only after the
    /// stream completes, since most providers report usage in a final frame).
    pub usage: Option<UsageMetadata>,
}

impl std::fmt::Debug for ChatStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStreamResponse")
            .field("reasoning", &self.reasoning)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_new_sums_total() {
        let usage = UsageMetadata::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.reasoning_tokens, None);
    }

    #[test]
    fn usage_with_reasoning_sums_all_three() {
        let usage = UsageMetadata::with_reasoning(10, 5, 20);
        assert_eq!(usage.total_tokens, 35);
        assert_eq!(usage.reasoning_tokens, Some(20));
    }

    #[test]
    fn reasoning_content_wraps_text() {
        let reasoning = ReasoningContent::new("thinking...");
        assert_eq!(reasoning.content, "thinking...");
    }
}

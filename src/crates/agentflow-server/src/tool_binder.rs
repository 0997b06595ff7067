//! Tool Binder: progressive disclosure of tool descriptors to an agent slot.
//!
//! Rather than handing every bound tool to the model on every turn (which
//! burns context and increases the chance of an irrelevant tool call), the
//! binder exposes a small "core" set up front and widens the set as a turn's
//! iteration count grows, per the configured [`DisclosureStrategy`]. Tool
//! descriptors themselves are plain [`ToolDefinition`]s, the same type
//! `agentflow-llm` providers already bind onto a `ChatRequest`.

use agentflow_core::llm::ToolDefinition;

/// How aggressively the binder discloses tools to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureStrategy {
    /// Only the agent's declared "core" tools are ever shown.
    Minimal,
    /// Core tools are shown first; the full set opens up once the agent's
    /// tool-call iteration count crosses [`ToolBinder::PROGRESSIVE_WIDEN_AT`].
    Progressive,
    /// Every bound tool is shown on every turn.
    Full,
}

/// A tool descriptor plus the disclosure tier it belongs to.
#[derive(Debug, Clone)]
pub struct BoundTool {
    pub definition: ToolDefinition,
    /// Core tools are always visible; non-core tools only appear once a
    /// turn's iteration crosses the widen threshold (or under `Full`).
    pub core: bool,
}

impl BoundTool {
    pub fn core(definition: ToolDefinition) -> Self {
        Self {
            definition,
            core: true,
        }
    }

    pub fn extended(definition: ToolDefinition) -> Self {
        Self {
            definition,
            core: false,
        }
    }
}

/// Holds the full catalogue of tools available to the orchestrator and
/// decides, per agent turn, which subset to disclose.
pub struct ToolBinder {
    tools: Vec<BoundTool>,
}

impl ToolBinder {
    /// Tool-call iteration at which `Progressive` disclosure widens from
    /// core-only to the full catalogue.
    pub const PROGRESSIVE_WIDEN_AT: usize = 2;

    /// Spec §4.4: `minimal` caps at 10 tools.
    const MINIMAL_CAP: usize = 10;
    /// Spec §4.4: `progressive` caps at 30 tools.
    const PROGRESSIVE_CAP: usize = 30;
    /// Spec §4.4: progressive disclosure targets roughly 3K tokens of tool
    /// descriptions. Token counts aren't available without the LLM's own
    /// tokenizer, so descriptions are estimated at ~4 characters per token,
    /// the conservative heuristic `agentflow-llm` providers already use for
    /// context-budget checks.
    const PROGRESSIVE_TOKEN_BUDGET: usize = 3_000;

    pub fn new(tools: Vec<BoundTool>) -> Self {
        Self { tools }
    }

    /// Register an additional tool at runtime (e.g. a dynamically loaded
    /// MCP tool).
    pub fn register(&mut self, tool: BoundTool) {
        self.tools.push(tool);
    }

    fn estimate_tokens(def: &ToolDefinition) -> usize {
        (def.name.len() + def.description.len()) / 4 + 1
    }

    /// The tool descriptors visible to `agent_name` at the given iteration
    /// of its current turn, per `strategy`.
    ///
    /// `agent_name` is accepted for future per-agent allow-listing but is
    /// not yet used to filter the catalogue; every agent currently shares
    /// the same tool set.
    pub fn tools_for(
        &self,
        _agent_name: &str,
        strategy: DisclosureStrategy,
        iteration: usize,
    ) -> Vec<ToolDefinition> {
        match strategy {
            DisclosureStrategy::Minimal => self
                .tools
                .iter()
                .filter(|t| t.core)
                .map(|t| t.definition.clone())
                .take(Self::MINIMAL_CAP)
                .collect(),
            DisclosureStrategy::Full => {
                self.tools.iter().map(|t| t.definition.clone()).collect()
            }
            DisclosureStrategy::Progressive => {
                if iteration >= Self::PROGRESSIVE_WIDEN_AT {
                    let mut budget = Self::PROGRESSIVE_TOKEN_BUDGET;
                    let mut widened = Vec::new();
                    // Core tools come first so the agent never loses one it
                    // already had visible, then extended tools fill the rest
                    // of the token budget before the count cap kicks in.
                    for tool in self.tools.iter().filter(|t| t.core).chain(self.tools.iter().filter(|t| !t.core)) {
                        if widened.len() >= Self::PROGRESSIVE_CAP {
                            break;
                        }
                        let cost = Self::estimate_tokens(&tool.definition);
                        if !widened.is_empty() && cost > budget {
                            break;
                        }
                        budget = budget.saturating_sub(cost);
                        widened.push(tool.definition.clone());
                    }
                    widened
                } else {
                    self.tools
                        .iter()
                        .filter(|t| t.core)
                        .map(|t| t.definition.clone())
                        .take(Self::MINIMAL_CAP)
                        .collect()
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> ToolBinder {
        ToolBinder::new(vec![
            BoundTool::core(ToolDefinition::new("read_file", "Read a file")),
            BoundTool::extended(ToolDefinition::new("run_tests", "Run the test suite")),
        ])
    }

    #[test]
    fn minimal_only_shows_core_tools() {
        let binder = binder();
        let tools = binder.tools_for("feature_dev", DisclosureStrategy::Minimal, 5);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "read_file");
    }

    #[test]
    fn progressive_widens_after_threshold() {
        let binder = binder();
        let early = binder.tools_for("feature_dev", DisclosureStrategy::Progressive, 0);
        assert_eq!(early.len(), 1);

        let late = binder.tools_for(
            "feature_dev",
            DisclosureStrategy::Progressive,
            ToolBinder::PROGRESSIVE_WIDEN_AT,
        );
        assert_eq!(late.len(), 2);
    }

    #[test]
    fn full_always_shows_everything() {
        let binder = binder();
        let tools = binder.tools_for("feature_dev", DisclosureStrategy::Full, 0);
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn minimal_caps_at_ten_tools() {
        let core_tools: Vec<BoundTool> = (0..15)
            .map(|i| BoundTool::core(ToolDefinition::new(format!("tool_{i}"), "does a thing")))
            .collect();
        let binder = ToolBinder::new(core_tools);
        let tools = binder.tools_for("feature_dev", DisclosureStrategy::Minimal, 0);
        assert_eq!(tools.len(), ToolBinder::MINIMAL_CAP);
    }

    #[test]
    fn progressive_caps_at_thirty_tools_once_widened() {
        let mut tools = vec![BoundTool::core(ToolDefinition::new("core_tool", "a core tool"))];
        tools.extend(
            (0..50).map(|i| BoundTool::extended(ToolDefinition::new(format!("extended_{i}"), "an extended tool"))),
        );
        let binder = ToolBinder::new(tools);
        let widened = binder.tools_for(
            "feature_dev",
            DisclosureStrategy::Progressive,
            ToolBinder::PROGRESSIVE_WIDEN_AT,
        );
        assert!(widened.len() <= ToolBinder::PROGRESSIVE_CAP);
        assert_eq!(widened[0].name, "core_tool");
    }
}

//! Shared state injected into every public API handler (spec §4.12, §6).
//!
//! Bundles the components the handlers dispatch into: the checkpointed
//! graph engine (supervisor-routed multi-agent loop), the declarative
//! template engine (`workflow/execute`), the HITL controller, session
//! recall, and the lock manager. Built once in the binary's `main` and
//! cloned into the router — every field is an `Arc` (or an already-`Clone`
//! connection pool), so cloning is cheap.

use crate::cancellation::CancellationRegistry;
use crate::db::connection::DatabasePool;
use crate::events::EventBus;
use crate::graph_engine::WorkflowGraphEngine;
use crate::hitl::HitlController;
use crate::intent::IntentClassifier;
use crate::locks::LockManager;
use crate::router::Supervisor;
use crate::session::SessionManager;
use crate::template_engine::TemplateEngine;
use crate::tool_binder::DisclosureStrategy;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Runtime-tunable knobs from the external config surface (spec §6).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub model_per_agent: HashMap<String, String>,
    pub tool_binder_strategy: DisclosureStrategy,
    pub max_tool_iterations: usize,
    pub llm_timeout_ms: u64,
    pub tool_timeout_ms: u64,
    pub keepalive_interval_ms: u64,
    pub intent_llm_fallback: bool,
    pub approval_expiry_s: i64,
    pub lock_default_ttl_s: i64,
    pub enable_intent_routing: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_per_agent: HashMap::new(),
            tool_binder_strategy: DisclosureStrategy::Progressive,
            max_tool_iterations: 8,
            llm_timeout_ms: 30_000,
            tool_timeout_ms: 15_000,
            keepalive_interval_ms: 15_000,
            intent_llm_fallback: true,
            approval_expiry_s: 3_600,
            lock_default_ttl_s: 300,
            enable_intent_routing: true,
        }
    }
}

/// Which engine owns a given `workflow_id`, so `workflow/status` and
/// `workflow/resume` know whether to ask the graph engine or replay a named
/// template.
#[derive(Debug, Clone)]
pub enum WorkflowKind {
    Graph,
    Template { name: String },
}

#[derive(Clone)]
pub struct OrchestrationState {
    pub db: DatabasePool,
    pub events: Arc<EventBus>,
    pub intent_classifier: Arc<IntentClassifier>,
    pub supervisor: Arc<Supervisor>,
    pub graph_engine: Arc<WorkflowGraphEngine>,
    pub template_engine: Arc<TemplateEngine>,
    pub lock_manager: Arc<LockManager>,
    pub hitl: Arc<HitlController>,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<RuntimeConfig>,
    /// Per-workflow cancellation tokens for caller-disconnect handling
    /// (spec §5, §8 scenario 6).
    pub cancellation: Arc<CancellationRegistry>,
    /// Tracks which engine is driving each in-flight `workflow_id`, so a
    /// resume/status request can be routed without guessing. Entries are
    /// added when a run starts and left in place after completion (status
    /// lookups on finished workflows still need to know where to look).
    workflow_kinds: Arc<DashMap<String, WorkflowKind>>,
}

impl OrchestrationState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: DatabasePool,
        events: Arc<EventBus>,
        intent_classifier: Arc<IntentClassifier>,
        supervisor: Arc<Supervisor>,
        graph_engine: Arc<WorkflowGraphEngine>,
        template_engine: Arc<TemplateEngine>,
        lock_manager: Arc<LockManager>,
        hitl: Arc<HitlController>,
        sessions: Arc<SessionManager>,
        config: RuntimeConfig,
        cancellation: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            db,
            events,
            intent_classifier,
            supervisor,
            graph_engine,
            template_engine,
            lock_manager,
            hitl,
            sessions,
            config: Arc::new(config),
            cancellation,
            workflow_kinds: Arc::new(DashMap::new()),
        }
    }

    pub fn mark_workflow(&self, workflow_id: impl Into<String>, kind: WorkflowKind) {
        self.workflow_kinds.insert(workflow_id.into(), kind);
    }

    pub fn workflow_kind(&self, workflow_id: &str) -> Option<WorkflowKind> {
        self.workflow_kinds.get(workflow_id).map(|r| r.value().clone())
    }

    pub async fn database_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.db).await.is_ok()
    }
}

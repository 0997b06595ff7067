//! Orchestrator server binary: wires the checkpoint store, event bus,
//! intent classifier, supervisor-routed graph engine, declarative template
//! engine, and HITL controller behind the public API surface (spec §4.12).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agentflow_checkpoint::CheckpointSaver;
use agentflow_llm::remote::ClaudeClient;
use agentflow_tooling::config::{get_env_bool, get_env_or, get_env_parse_or};
use agentflow_llm::RemoteLlmConfig;
use agentflow_server::agent_slot::{AgentSlot, ToolGateway};
use agentflow_server::api::routes::create_router;
use agentflow_server::api::state::{OrchestrationState, RuntimeConfig};
use agentflow_server::cancellation::CancellationRegistry;
use agentflow_server::db::checkpoint_saver::SqlCheckpointSaver;
use agentflow_server::db::connection::DatabaseConnection;
use agentflow_server::events::EventBus;
use agentflow_server::graph_engine::WorkflowGraphEngine;
use agentflow_server::hitl::HitlController;
use agentflow_server::intent::IntentClassifier;
use agentflow_server::locks::LockManager;
use agentflow_server::router::Supervisor;
use agentflow_server::session::SessionManager;
use agentflow_server::template_engine::TemplateEngine;
use agentflow_server::tool_binder::{BoundTool, DisclosureStrategy, ToolBinder};
use agentflow_server::tool_gateway::HttpToolGateway;

/// Specialist agent roster (spec overview §1): feature development, code
/// review, infrastructure, CI/CD, documentation.
const SPECIALIST_AGENTS: &[&str] = &[
    "feature_dev",
    "code_review",
    "infrastructure",
    "cicd",
    "documentation",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://orchestrator.db".to_string());
    tracing::info!(database_url = %database_url, "connecting to checkpoint store");
    let connection = DatabaseConnection::new(&database_url).await?;
    connection.run_migrations().await?;
    connection.health_check().await?;
    let pool = connection.pool().clone();

    let config = load_runtime_config();

    let tool_gateway_url =
        std::env::var("TOOL_GATEWAY_URL").unwrap_or_else(|_| "http://127.0.0.1:9090".to_string());
    let tool_gateway: Arc<dyn ToolGateway> = Arc::new(HttpToolGateway::new(
        tool_gateway_url,
        Duration::from_millis(config.tool_timeout_ms),
    ));

    let tool_binder = Arc::new(build_tool_binder(config.tool_timeout_ms).await);

    let anthropic_base_url = std::env::var("ANTHROPIC_BASE_URL")
        .unwrap_or_else(|_| "https://api.anthropic.com".to_string());

    let mut agents = HashMap::new();
    for &name in SPECIALIST_AGENTS {
        let model_id = config
            .model_per_agent
            .get(name)
            .cloned()
            .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string());
        let llm = build_claude_client(&anthropic_base_url, &model_id, config.llm_timeout_ms)?;
        let slot = AgentSlot::new(
            name,
            llm,
            tool_gateway.clone(),
            tool_binder.clone(),
            specialist_system_prompt(name),
        )
        .with_disclosure(config.tool_binder_strategy)
        .with_max_tool_iterations(config.max_tool_iterations);
        agents.insert(name.to_string(), Arc::new(slot));
    }

    let supervisor_model = config
        .model_per_agent
        .get("supervisor")
        .cloned()
        .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string());
    let supervisor_llm =
        build_claude_client(&anthropic_base_url, &supervisor_model, config.llm_timeout_ms)?;
    let supervisor = Arc::new(Supervisor::new(
        supervisor_llm,
        SPECIALIST_AGENTS.iter().map(|s| s.to_string()).collect(),
    ));

    // The conversational fast path (spec §4.8 entry routing table) gets its
    // own model/slot rather than reusing a specialist's, since it never sees
    // tools and answers QA/simple-task turns directly from `START`. Omitted
    // entirely when `enable_intent_routing=false`, which forces every turn
    // through the supervisor (the rollback switch from spec §6).
    let conversational = if config.enable_intent_routing {
        let conversational_model = config
            .model_per_agent
            .get("conversational")
            .cloned()
            .unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string());
        let conversational_llm = build_claude_client(
            &anthropic_base_url,
            &conversational_model,
            config.llm_timeout_ms,
        )?;
        Some(Arc::new(AgentSlot::new(
            "conversational",
            conversational_llm,
            tool_gateway.clone(),
            tool_binder.clone(),
            "You are a helpful assistant answering questions about this codebase and what you can do. \
             Answer directly and conversationally; you are not routing work to other agents.",
        )))
    } else {
        None
    };

    let events = Arc::new(EventBus::new());
    let checkpointer: Arc<dyn CheckpointSaver> = Arc::new(SqlCheckpointSaver::new(pool.clone()));
    let hitl = Arc::new(HitlController::new(pool.clone(), config.approval_expiry_s));
    HitlController::spawn_sweeper(pool.clone(), Duration::from_secs(60));

    let lock_manager = Arc::new(LockManager::new(pool.clone(), config.lock_default_ttl_s));
    LockManager::spawn_sweeper(pool.clone(), Duration::from_secs(60));

    let cancellation = Arc::new(CancellationRegistry::new());

    let graph_engine = Arc::new(WorkflowGraphEngine::build(
        supervisor.clone(),
        agents.clone(),
        conversational,
        events.clone(),
        Some(checkpointer),
        hitl.clone(),
        lock_manager.clone(),
        cancellation.clone(),
    )?);

    let template_engine = Arc::new(TemplateEngine::new(
        agents,
        lock_manager.clone(),
        events.clone(),
        hitl.clone(),
    ));
    let sessions = Arc::new(SessionManager::new(pool.clone()));
    let intent_classifier = Arc::new(IntentClassifier::new());

    let state = OrchestrationState::new(
        pool,
        events,
        intent_classifier,
        supervisor,
        graph_engine,
        template_engine,
        lock_manager,
        hitl,
        sessions,
        config,
        cancellation,
    );

    let app = create_router(state);

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16");
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!(%addr, "starting orchestrator server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("orchestrator server shut down gracefully");
    Ok(())
}

fn build_claude_client(
    base_url: &str,
    model: &str,
    timeout_ms: u64,
) -> Result<Arc<dyn agentflow_core::llm::ChatModel>, Box<dyn std::error::Error>> {
    let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", base_url, model)?
        .with_timeout(Duration::from_millis(timeout_ms));
    Ok(Arc::new(ClaudeClient::new(config)))
}

/// Loads the runtime config surface (spec §6) from the environment, via
/// `agentflow_tooling::config`'s `get_env_parse_or`/`get_env_bool` (the same
/// helpers `ConfigBuilder::from_env` implementors across the workspace use).
/// Values not set, or that fail to parse, fall back to
/// [`RuntimeConfig::default`], logging a warning in the latter case.
fn load_runtime_config() -> RuntimeConfig {
    let defaults = RuntimeConfig::default();

    let tool_binder_strategy = match get_env_or("TOOL_BINDER_STRATEGY", "progressive")
        .unwrap_or_else(|_| "progressive".to_string())
        .as_str()
    {
        "minimal" => DisclosureStrategy::Minimal,
        "full" => DisclosureStrategy::Full,
        _ => DisclosureStrategy::Progressive,
    };

    RuntimeConfig {
        model_per_agent: defaults.model_per_agent.clone(),
        tool_binder_strategy,
        max_tool_iterations: env_parse_or(
            "MAX_TOOL_ITERATIONS",
            defaults.max_tool_iterations,
        ),
        llm_timeout_ms: env_parse_or("LLM_TIMEOUT_MS", defaults.llm_timeout_ms),
        tool_timeout_ms: env_parse_or("TOOL_TIMEOUT_MS", defaults.tool_timeout_ms),
        keepalive_interval_ms: env_parse_or(
            "KEEPALIVE_INTERVAL_MS",
            defaults.keepalive_interval_ms,
        ),
        intent_llm_fallback: get_env_bool("INTENT_LLM_FALLBACK")
            .unwrap_or(None)
            .unwrap_or(defaults.intent_llm_fallback),
        approval_expiry_s: env_parse_or("APPROVAL_EXPIRY_S", defaults.approval_expiry_s),
        lock_default_ttl_s: env_parse_or("LOCK_DEFAULT_TTL_S", defaults.lock_default_ttl_s),
        enable_intent_routing: get_env_bool("ENABLE_INTENT_ROUTING")
            .unwrap_or(None)
            .unwrap_or(defaults.enable_intent_routing),
    }
}

/// `get_env_parse_or`, but a malformed value logs a warning and falls back
/// to `default` instead of surfacing a `ToolingError` to the caller.
fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Clone,
    T::Err: std::fmt::Display,
{
    match get_env_parse_or(key, default.clone()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "invalid config value, using default");
            default
        }
    }
}

/// Builds the shared tool catalogue from the external tool gateway's
/// `GET /tools` listing. Falls back to an empty binder (agents simply see
/// no tools) if the gateway isn't reachable yet at startup, rather than
/// failing the whole server.
async fn build_tool_binder(tool_timeout_ms: u64) -> ToolBinder {
    let gateway_url =
        std::env::var("TOOL_GATEWAY_URL").unwrap_or_else(|_| "http://127.0.0.1:9090".to_string());
    let gateway = HttpToolGateway::new(gateway_url, Duration::from_millis(tool_timeout_ms));

    match gateway.list_tools().await {
        Ok(descriptors) => {
            let tools = descriptors
                .into_iter()
                .map(|d| {
                    let definition =
                        agentflow_core::llm::ToolDefinition::new(d.name, d.description)
                            .with_parameters(d.parameters_schema);
                    BoundTool::core(definition)
                })
                .collect();
            ToolBinder::new(tools)
        }
        Err(e) => {
            tracing::warn!(error = %e, "tool gateway unreachable at startup, agents will see no tools");
            ToolBinder::new(Vec::new())
        }
    }
}

fn specialist_system_prompt(agent_name: &str) -> String {
    match agent_name {
        "feature_dev" => "You are the feature development agent. Implement the requested change, using tools to read and write code as needed.".to_string(),
        "code_review" => "You are the code review agent. Review the diff under discussion for correctness, style, and risk.".to_string(),
        "infrastructure" => "You are the infrastructure agent. Handle provisioning, configuration, and deployment topology changes.".to_string(),
        "cicd" => "You are the CI/CD agent. Manage build, test, and deployment pipeline changes.".to_string(),
        "documentation" => "You are the documentation agent. Keep docs in sync with the change under discussion.".to_string(),
        other => format!("You are the {other} agent."),
    }
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

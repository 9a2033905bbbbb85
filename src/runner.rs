use std::sync::Arc;

use adk_rust::prelude::*;
use adk_session::SessionService;
use anyhow::{Context, Result};
use serde_json::json;

use crate::agents::orchestrator::build_orchestrator_agent;
use crate::cli::Provider;
use crate::config::RuntimeConfig;
use crate::provider::resolve_model;
use crate::session::ensure_session_exists;
use crate::telemetry::{TelemetrySink, event};
use crate::tools::marketing::MarketingToolSettings;

/// Runner bound to the configured conversation session, created on first use.
pub async fn build_runner_with_session_service(
    agent: Arc<dyn Agent>,
    cfg: &RuntimeConfig,
    session_service: Arc<dyn SessionService>,
) -> Result<Runner> {
    ensure_session_exists(&session_service, cfg).await?;
    build_app_runner(agent, &cfg.app_name, session_service)
}

/// Runner with no session bookkeeping; callers create their own sessions.
pub fn build_app_runner(
    agent: Arc<dyn Agent>,
    app_name: &str,
    session_service: Arc<dyn SessionService>,
) -> Result<Runner> {
    let artifact_service = Arc::new(InMemoryArtifactService::new());

    Runner::new(RunnerConfig {
        app_name: app_name.to_string(),
        agent,
        session_service,
        artifact_service: Some(artifact_service),
        memory_service: None,
        plugin_manager: None,
        run_config: None,
        compaction_config: None,
        context_cache_config: None,
        cache_capable: None,
        request_context: None,
        cancellation_token: None,
    })
    .context("failed to build ADK runner")
}

pub fn resolve_model_with_telemetry(
    cfg: &RuntimeConfig,
    telemetry: &TelemetrySink,
    path: &str,
) -> Result<(Arc<dyn Llm>, Provider, String)> {
    let (model, provider, model_name) = resolve_model(cfg)?;
    telemetry.emit(
        event::MODEL_RESOLVED,
        json!({
            "provider": format!("{:?}", provider).to_ascii_lowercase(),
            "model": model_name.clone(),
            "path": path
        }),
    );
    tracing::info!(provider = ?provider, model = %model_name, path = path, "Using model");
    Ok((model, provider, model_name))
}

pub async fn build_orchestrator_runner(
    cfg: &RuntimeConfig,
    model: Arc<dyn Llm>,
    session_service: Arc<dyn SessionService>,
    telemetry: &TelemetrySink,
) -> Result<Runner> {
    let settings = MarketingToolSettings::from_config(cfg);
    let agent = build_orchestrator_agent(model, settings, telemetry.clone())?;
    build_runner_with_session_service(agent, cfg, session_service).await
}

//! Exposes the marketing pipeline to the orchestrator as a callable tool.
use std::sync::Arc;

use adk_rust::prelude::*;
use adk_session::{InMemorySessionService, SessionService};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::RuntimeConfig;
use crate::pipeline::{PipelineTarget, run_marketing};
use crate::schema::output_schema;
use crate::telemetry::TelemetrySink;

pub const MARKETING_TOOL_NAME: &str = "marketing_tool";
pub const MARKETING_TOOL_DESCRIPTION: &str = "A comprehensive tool for creating marketing content \
like video ad scripts, social media posts, and product stories.";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarketingToolArgs {
    /// The user's full, raw request describing the product and the content wanted.
    pub user_query: String,
}

#[derive(Debug, Clone)]
pub struct MarketingToolSettings {
    pub target: PipelineTarget,
    pub review_required: bool,
}

impl MarketingToolSettings {
    pub fn from_config(cfg: &RuntimeConfig) -> Self {
        Self {
            target: PipelineTarget {
                app_name: cfg.app_name.clone(),
                user_id: cfg.user_id.clone(),
                session_base: cfg.session_id.clone(),
            },
            review_required: cfg.review_required,
        }
    }
}

pub struct MarketingTool {
    model: Arc<dyn Llm>,
    settings: MarketingToolSettings,
    telemetry: TelemetrySink,
}

impl MarketingTool {
    pub fn new(model: Arc<dyn Llm>, settings: MarketingToolSettings, telemetry: TelemetrySink) -> Self {
        Self {
            model,
            settings,
            telemetry,
        }
    }

    /// Runs the pipeline in its own in-memory sessions; failures come back as `{"error": ...}`.
    pub async fn respond(&self, args: &Value) -> Value {
        let user_query = serde_json::from_value::<MarketingToolArgs>(args.clone())
            .map(|args| args.user_query)
            .unwrap_or_default();
        let user_query = user_query.trim();
        if user_query.is_empty() {
            return json!({"error": "user_query is required"});
        }

        let session_service: Arc<dyn SessionService> = Arc::new(InMemorySessionService::new());
        match run_marketing(
            self.model.clone(),
            session_service,
            &self.settings.target,
            user_query,
            self.settings.review_required,
            &self.telemetry,
        )
        .await
        {
            Ok(report) => report.to_json(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Marketing pipeline failed");
                json!({"error": format!("{err:#}")})
            }
        }
    }
}

#[async_trait]
impl Tool for MarketingTool {
    fn name(&self) -> &str {
        MARKETING_TOOL_NAME
    }

    fn description(&self) -> &str {
        MARKETING_TOOL_DESCRIPTION
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(output_schema::<MarketingToolArgs>())
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> adk_rust::Result<Value> {
        Ok(self.respond(&args).await)
    }
}


pub mod drug_interactions;
pub mod image;
pub mod marketing;

use std::sync::Arc;

use adk_rust::prelude::*;

use crate::telemetry::TelemetrySink;
use marketing::{MarketingTool, MarketingToolSettings};

/// Tools available to the artisan orchestrator.
pub fn build_orchestrator_tools(
    model: Arc<dyn Llm>,
    settings: MarketingToolSettings,
    telemetry: TelemetrySink,
) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(MarketingTool::new(model, settings, telemetry))]
}

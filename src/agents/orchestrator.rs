//! Orchestrator - Routes artisan requests to the specialised tools.
use std::sync::Arc;

use adk_rust::prelude::*;
use anyhow::Result;

use crate::telemetry::TelemetrySink;
use crate::tools::build_orchestrator_tools;
use crate::tools::marketing::{
    MARKETING_TOOL_DESCRIPTION, MARKETING_TOOL_NAME, MarketingToolSettings,
};

pub const ORCHESTRATOR_NAME: &str = "artisan_orchestrator_agent";

#[derive(Debug, Clone, Copy)]
pub struct ToolParam {
    pub name: &'static str,
    pub kind: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub when_to_use: &'static str,
    pub description: &'static str,
    pub params: &'static [ToolParam],
}

pub const MARKETING_TOOL_SPEC: ToolSpec = ToolSpec {
    name: MARKETING_TOOL_NAME,
    when_to_use: "Use this tool when the user asks to create any type of marketing content, such \
                  as a video ad, social media post, or product description.",
    description: MARKETING_TOOL_DESCRIPTION,
    params: &[ToolParam {
        name: "user_query",
        kind: "string",
        required: true,
        description: "The user's full, raw query describing their content creation need.",
    }],
};

pub fn render_tool_section(spec: &ToolSpec) -> String {
    let mut section = format!(
        "- **{}**: {}\n  * **Description**: {}\n  * **Parameters**:",
        spec.name, spec.when_to_use, spec.description
    );
    for param in spec.params {
        let requirement = if param.required { "required" } else { "optional" };
        section.push_str(&format!(
            "\n    * `{}` ({}, {}): {}",
            param.name, param.kind, requirement, param.description
        ));
    }
    section
}

pub fn orchestrator_instruction(tools: &[ToolSpec]) -> String {
    let tool_sections = tools
        .iter()
        .map(render_tool_section)
        .collect::<Vec<String>>()
        .join("\n\n");

    format!(
        "You are a helpful and efficient AI assistant for local artisans. Your primary role is to \
         understand the user's request and delegate it to the most suitable specialized tool.\n\n\
         {tool_sections}\n\n\
         **Instructions for Tool Use:**\n\
         * **Always call a tool if the intent is clear.** Do not try to perform the task \
         yourself.\n\
         * **Extract all required parameters** from the user's prompt for the chosen tool. Be \
         precise.\n\
         * If a required parameter is missing, **YOU MUST ASK A CLARIFYING QUESTION** to the \
         user. Do not call a tool with missing required parameters.\n\
         * If no tool fits the request, say which requests you can help with.\n\
         * After successfully calling a tool, **IMMEDIATELY present the tool's final output to \
         the user.**"
    )
}

pub fn build_orchestrator_agent(
    model: Arc<dyn Llm>,
    settings: MarketingToolSettings,
    telemetry: TelemetrySink,
) -> Result<Arc<dyn Agent>> {
    let mut builder = LlmAgentBuilder::new(ORCHESTRATOR_NAME)
        .description(
            "The central orchestration agent for the artisan platform. Routes user queries to \
             specialized agents for marketing and content creation.",
        )
        .instruction(orchestrator_instruction(&[MARKETING_TOOL_SPEC]))
        .model(model.clone());

    for tool in build_orchestrator_tools(model, settings, telemetry) {
        builder = builder.tool(tool);
    }

    Ok(Arc::new(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_lists_marketing_tool_and_required_param() {
        let instruction = orchestrator_instruction(&[MARKETING_TOOL_SPEC]);
        assert!(instruction.contains("**marketing_tool**"));
        assert!(instruction.contains("`user_query` (string, required)"));
        assert!(instruction.contains("ASK A CLARIFYING QUESTION"));
        assert!(!instruction.contains("business_analytics_dashboard"));
    }
}

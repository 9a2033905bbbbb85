use adk_rust::futures::StreamExt;
use adk_rust::prelude::*;
use adk_rust::{SessionId, UserId};
use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::config::RuntimeConfig;
use crate::telemetry::{TelemetrySink, event};

pub const NO_TEXTUAL_RESPONSE: &str = "No textual response produced by the agent.";

/// Tracks the answer the user should see from a stream of runner events.
///
/// Final snapshots win. Without one, partial chunks from the last author that
/// produced text are stitched together.
#[derive(Default, Debug)]
pub struct ResponseCollector {
    latest_final: Option<String>,
    partial_author: Option<String>,
    partial_text: String,
}

impl ResponseCollector {
    pub fn ingest(&mut self, author: &str, text: &str, partial: bool, is_final: bool) {
        if text.is_empty() {
            return;
        }

        if is_final && !text.trim().is_empty() {
            self.latest_final = Some(text.to_string());
            return;
        }

        if self.partial_author.as_deref() != Some(author) {
            self.partial_author = Some(author.to_string());
            self.partial_text.clear();
        }
        if partial {
            self.partial_text.push_str(text);
        } else {
            self.partial_text = text.to_string();
        }
    }

    pub fn resolve_text(&self) -> Option<String> {
        if let Some(text) = &self.latest_final {
            return Some(text.trim().to_string());
        }
        let trimmed = self.partial_text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

pub fn event_text(event: &Event) -> String {
    match event.content() {
        Some(content) => content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
        None => String::new(),
    }
}

/// Error text of a tool response, from an `error` field or a failed `status`.
pub fn extract_tool_failure_message(response: &Value) -> Option<String> {
    let text = |key: &str| response.get(key).and_then(Value::as_str);
    if let Some(message) = text("error") {
        return Some(message.to_string());
    }
    let failed = text("status")
        .is_some_and(|status| ["error", "failed"].iter().any(|s| status.eq_ignore_ascii_case(s)));
    failed.then(|| text("message").map(String::from)).flatten()
}

/// One tool call or tool result seen in a runner event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolActivity {
    Requested { tool: String },
    Succeeded { tool: String },
    Failed { tool: String, error: String },
}

impl ToolActivity {
    fn event_name(&self) -> &'static str {
        match self {
            ToolActivity::Requested { .. } => event::TOOL_REQUESTED,
            ToolActivity::Succeeded { .. } => event::TOOL_SUCCEEDED,
            ToolActivity::Failed { .. } => event::TOOL_FAILED,
        }
    }
}

pub fn tool_activity(content: &Content) -> Vec<ToolActivity> {
    content
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::FunctionCall { name, .. } => Some(ToolActivity::Requested { tool: name.clone() }),
            Part::FunctionResponse {
                function_response, ..
            } => {
                let tool = function_response.name.clone();
                Some(match extract_tool_failure_message(&function_response.response) {
                    Some(error) => ToolActivity::Failed { tool, error },
                    None => ToolActivity::Succeeded { tool },
                })
            }
            _ => None,
        })
        .collect()
}

pub fn emit_tool_lifecycle_events(event: &Event, telemetry: &TelemetrySink) {
    let Some(content) = event.content() else {
        return;
    };

    for activity in tool_activity(content) {
        let author = event.author.as_str();
        let payload = match &activity {
            ToolActivity::Requested { tool } => {
                tracing::info!(tool = %tool, author, "Tool call requested");
                json!({ "tool": tool, "author": author })
            }
            ToolActivity::Succeeded { tool } => {
                tracing::info!(tool = %tool, author, "Tool execution completed");
                json!({ "tool": tool, "author": author })
            }
            ToolActivity::Failed { tool, error } => {
                tracing::warn!(tool = %tool, author, error = %error, "Tool execution failed");
                json!({ "tool": tool, "author": author, "error": error })
            }
        };
        telemetry.emit(activity.event_name(), payload);
    }
}

/// Sends one message on the configured session and returns the agent's answer.
pub async fn run_prompt(
    runner: &Runner,
    cfg: &RuntimeConfig,
    prompt: &str,
    telemetry: &TelemetrySink,
) -> Result<String> {
    let mut stream = runner
        .run(
            UserId::new(cfg.user_id.clone())?,
            SessionId::new(cfg.session_id.clone())?,
            Content::new("user").with_text(prompt),
        )
        .await
        .context("failed to start runner stream")?;

    let mut collector = ResponseCollector::default();
    while let Some(event_result) = stream.next().await {
        let event = match event_result {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("Runner event error: {err:#}");
                continue;
            }
        };
        if event.author == "user" {
            continue;
        }

        let text = event_text(&event);
        tracing::debug!(
            author = %event.author,
            is_final = event.is_final_response(),
            partial = event.llm_response.partial,
            text_len = text.len(),
            "received runner event"
        );
        emit_tool_lifecycle_events(&event, telemetry);
        collector.ingest(
            &event.author,
            &text,
            event.llm_response.partial,
            event.is_final_response(),
        );
    }

    Ok(collector
        .resolve_text()
        .unwrap_or_else(|| NO_TEXTUAL_RESPONSE.to_string()))
}

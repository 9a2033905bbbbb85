use std::collections::HashMap;
use std::sync::Arc;

use adk_rust::futures::StreamExt;
use adk_rust::prelude::*;
use adk_rust::{SessionId, UserId};
use adk_session::SessionService;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};

use crate::agents::USER_QUERY_KEY;
use crate::agents::{marketing, symptom};
use crate::pii::{contains_pii, redact_pii};
use crate::runner::build_app_runner;
use crate::schema::{ProductData, SymptomData, structured_from_state};
use crate::session::{create_seeded_session, fold_state_deltas, pipeline_session_id};
use crate::streaming::emit_tool_lifecycle_events;
use crate::telemetry::{TelemetrySink, event};
use crate::triage::{EMERGENCY_FLAG_KEY, TriageSignal, triage_outcome};

pub const REVIEW_NOTICE: &str = "📝 **Content Ready for Review:** I've prepared a draft of your \
video ad script and visuals. Please review them. Are you happy with this content, or would you \
like to make changes?";

/// Where a pipeline run lives.
#[derive(Debug, Clone)]
pub struct PipelineTarget {
    pub app_name: String,
    pub user_id: String,
    pub session_base: String,
}

/// Runs `agent` once in a fresh session and returns the final state.
///
/// `query` is sent as the user message; `seeded_query` is what instructions
/// see through `{user_query}`.
pub async fn run_pipeline(
    agent: Arc<dyn Agent>,
    session_service: Arc<dyn SessionService>,
    target: &PipelineTarget,
    query: &str,
    seeded_query: &str,
    telemetry: &TelemetrySink,
) -> Result<HashMap<String, Value>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(anyhow::anyhow!("query cannot be empty"));
    }

    let pipeline_name = agent.name().to_string();
    let session_id = pipeline_session_id(&target.session_base, &pipeline_name);
    let mut initial = HashMap::new();
    initial.insert(USER_QUERY_KEY.to_string(), json!(seeded_query.trim()));
    create_seeded_session(
        &session_service,
        &target.app_name,
        &target.user_id,
        &session_id,
        initial.clone(),
    )
    .await?;

    let runner = build_app_runner(agent, &target.app_name, session_service)?;
    let mut stream = runner
        .run(
            UserId::new(target.user_id.clone())?,
            SessionId::new(session_id.clone())?,
            Content::new("user").with_text(query),
        )
        .await
        .with_context(|| format!("failed to start pipeline '{pipeline_name}'"))?;

    let mut events = Vec::new();
    while let Some(event_result) = stream.next().await {
        let event = event_result.with_context(|| format!("pipeline '{pipeline_name}' failed"))?;
        tracing::debug!(
            pipeline = %pipeline_name,
            author = %event.author,
            state_keys = event.actions.state_delta.len(),
            "received pipeline event"
        );
        emit_tool_lifecycle_events(&event, telemetry);
        events.push(event);
    }

    let state = fold_state_deltas(initial, &events);
    telemetry.emit(
        event::PIPELINE_COMPLETED,
        json!({
            "pipeline": pipeline_name,
            "session_id": session_id,
            "events": events.len(),
            "state_keys": state.len(),
        }),
    );
    Ok(state)
}

pub fn state_text(state: &HashMap<String, Value>, key: &str) -> Option<String> {
    let text = match state.get(key)? {
        Value::Null => return None,
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketingReport {
    pub product_data: Option<ProductData>,
    pub raw_product_data: Option<String>,
    pub video_ad_content: Option<String>,
    pub social_media_post: Option<String>,
    pub review_notice: Option<String>,
}

impl MarketingReport {
    pub fn from_state(state: &HashMap<String, Value>, review_required: bool) -> Self {
        let product_data = state.get(marketing::PRODUCT_DATA_KEY).and_then(|value| {
            structured_from_state::<ProductData>(value, "ProductData")
                .map_err(|err| tracing::warn!(error = %err, "Product data was not structured"))
                .ok()
        });
        Self {
            product_data,
            raw_product_data: state_text(state, marketing::PRODUCT_DATA_KEY),
            video_ad_content: state_text(state, marketing::VIDEO_AD_KEY),
            social_media_post: state_text(state, marketing::SOCIAL_POST_KEY),
            review_notice: review_required.then(|| REVIEW_NOTICE.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "product_data": self.product_data,
            "video_ad_content": self.video_ad_content,
            "social_media_post": self.social_media_post,
        });
        if self.product_data.is_none()
            && let Some(raw) = &self.raw_product_data
        {
            out["product_data_text"] = json!(raw);
        }
        if let Some(notice) = &self.review_notice {
            out["review_notice"] = json!(notice);
        }
        out
    }

    pub fn render(&self) -> String {
        let mut sections = Vec::new();
        match (&self.product_data, &self.raw_product_data) {
            (Some(product), _) => {
                let mut block = format!(
                    "## Product\n**{}** ({})",
                    product.product_name, product.craft_type
                );
                if let Some(tone) = &product.brand_tone {
                    block.push_str(&format!("\nBrand tone: {tone}"));
                }
                for point in &product.unique_selling_points {
                    block.push_str(&format!("\n- {point}"));
                }
                sections.push(block);
            }
            (None, Some(raw)) => sections.push(format!("## Product\n{raw}")),
            (None, None) => {}
        }
        if let Some(script) = &self.video_ad_content {
            sections.push(format!("## Video Ad\n{script}"));
        }
        if let Some(post) = &self.social_media_post {
            sections.push(format!("## Social Media Post\n{post}"));
        }
        if let Some(notice) = &self.review_notice {
            sections.push(notice.clone());
        }
        if sections.is_empty() {
            return crate::streaming::NO_TEXTUAL_RESPONSE.to_string();
        }
        sections.join("\n\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymptomReport {
    pub symptom_data: Option<SymptomData>,
    pub preliminary_diagnosis: Option<String>,
    pub drug_interaction_alert: Option<String>,
    pub final_response: String,
    pub emergency: bool,
}

impl SymptomReport {
    pub fn from_state(state: &HashMap<String, Value>) -> Self {
        let symptom_data = state.get(symptom::SYMPTOM_DATA_KEY).and_then(|value| {
            structured_from_state::<SymptomData>(value, "SymptomData")
                .map_err(|err| tracing::warn!(error = %err, "Symptom data was not structured"))
                .ok()
        });
        let preliminary_diagnosis = state_text(state, symptom::DIAGNOSIS_KEY);
        let drug_interaction_alert = state_text(state, symptom::DRUG_ALERT_KEY);

        if let Some(alert) = triage_outcome(state) {
            return Self {
                symptom_data,
                preliminary_diagnosis,
                drug_interaction_alert,
                final_response: alert.to_string(),
                emergency: true,
            };
        }

        let final_response = state_text(state, symptom::FINAL_RESPONSE_KEY)
            .or_else(|| preliminary_diagnosis.clone())
            .unwrap_or_else(|| crate::streaming::NO_TEXTUAL_RESPONSE.to_string());
        Self {
            symptom_data,
            preliminary_diagnosis,
            drug_interaction_alert,
            final_response,
            emergency: false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.final_response.clone();
        if let Some(data) = &self.symptom_data {
            out.push_str(&format!(
                "\n\n---\nSymptoms noted: {} (severity: {}, duration: {})",
                data.symptoms.join(", "),
                data.severity,
                data.duration.as_deref().unwrap_or("unknown")
            ));
        }
        out
    }
}

pub async fn run_marketing(
    model: Arc<dyn Llm>,
    session_service: Arc<dyn SessionService>,
    target: &PipelineTarget,
    query: &str,
    review_required: bool,
    telemetry: &TelemetrySink,
) -> Result<MarketingReport> {
    let agent = marketing::build_marketing_pipeline(model)?;
    let state = run_pipeline(agent, session_service, target, query, query, telemetry).await?;
    Ok(MarketingReport::from_state(&state, review_required))
}

pub async fn run_symptom_check(
    model: Arc<dyn Llm>,
    session_service: Arc<dyn SessionService>,
    target: &PipelineTarget,
    query: &str,
    pii_phrases: &[String],
    telemetry: &TelemetrySink,
) -> Result<SymptomReport> {
    // The drug-interaction agent reads `{user_query}` without the PII hook, so the seed is redacted.
    let redacted = redact_pii(query, pii_phrases);
    if contains_pii(query, pii_phrases) {
        telemetry.emit(
            event::PII_REDACTED,
            json!({
                "pipeline": symptom::PIPELINE_NAME,
                "removed_chars": query.len() - redacted.len(),
            }),
        );
    }

    let signal = TriageSignal::new();
    let agent =
        symptom::build_symptom_checker_pipeline(model, pii_phrases.to_vec(), signal.clone())?;
    let mut state =
        run_pipeline(agent, session_service, target, query, &redacted, telemetry).await?;
    if signal.fired() {
        state.insert(EMERGENCY_FLAG_KEY.to_string(), json!(true));
    }
    let report = SymptomReport::from_state(&state);
    if report.emergency {
        tracing::warn!(pipeline = symptom::PIPELINE_NAME, "Emergency triage triggered");
        telemetry.emit(
            event::TRIAGE_EMERGENCY,
            json!({ "pipeline": symptom::PIPELINE_NAME }),
        );
    }
    Ok(report)
}

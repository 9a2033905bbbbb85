use std::sync::Arc;

use adk_rust::prelude::*;
use anyhow::Result;

use crate::pii::with_pii_redaction;
use crate::schema::{SymptomData, output_schema};
use crate::tools::drug_interactions::build_drug_interaction_tools;
use crate::triage::{EMERGENCY_TRIGGER, TriageSignal, with_emergency_triage};

pub const PIPELINE_NAME: &str = "SymptomCheckerPipeline";
pub const SYMPTOM_DATA_KEY: &str = "extracted_symptom_data";
pub const DIAGNOSIS_KEY: &str = "preliminary_diagnosis_response";
pub const DRUG_ALERT_KEY: &str = "drug_interaction_alert";
pub const FINAL_RESPONSE_KEY: &str = "final_symptom_checker_response";

pub fn build_symptom_extractor(
    model: Arc<dyn Llm>,
    pii_phrases: Vec<String>,
) -> Result<Arc<dyn Agent>> {
    let builder = LlmAgentBuilder::new("SymptomExtractorAgent")
        .description("Extracts symptoms, severity, and duration from the user's initial query.")
        .instruction(
            "You are a symptom extraction expert. Your task is to analyze the user's query and \
             identify all symptoms, their severity (if mentioned), and the duration of the \
             condition.\n\
             Focus solely on extracting factual medical information.\n\n\
             User query: '{user_query}'\n\n\
             Output only in JSON. The JSON object must strictly use these keys:\n\
             - symptoms: list of symptom strings\n\
             - severity: e.g., 'mild', 'moderate', 'severe', 'unknown'\n\
             - duration: e.g., '2 days', 'a week', 'unknown'",
        )
        .model(model)
        .output_schema(output_schema::<SymptomData>())
        .output_key(SYMPTOM_DATA_KEY);
    Ok(Arc::new(with_pii_redaction(builder, pii_phrases).build()?))
}

pub fn diagnostics_instruction() -> String {
    format!(
        "You are a medical pre-diagnosis AI. Based on the extracted symptoms, your task is to:\n\
         1. Suggest a list of possible conditions.\n\
         2. Identify if any symptoms are severe or life-threatening.\n\
         3. If a critical condition is detected, set a flag for emergency triage.\n\n\
         Extracted Symptoms: {{extracted_symptom_data}}\n\n\
         *DO NOT provide a formal diagnosis. Use cautious language.*\n\n\
         Your response should be in a conversational and empathetic tone.\n\
         If symptoms are critical (e.g., chest pain, difficulty breathing, sudden loss of \
         consciousness), include the phrase \"{EMERGENCY_TRIGGER}\" at the end of your response."
    )
}

/// `signal` latches when this agent's streamed answer carries the trigger.
pub fn build_diagnostics_agent(
    model: Arc<dyn Llm>,
    signal: TriageSignal,
) -> Result<Arc<dyn Agent>> {
    let builder = LlmAgentBuilder::new("DiagnosticsAndTriageAgent")
        .description("Generates a preliminary diagnosis and flags critical conditions.")
        .instruction(diagnostics_instruction())
        .model(model)
        .output_key(DIAGNOSIS_KEY);
    Ok(Arc::new(with_emergency_triage(builder, signal).build()?))
}

pub fn build_drug_interaction_agent(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let mut builder = LlmAgentBuilder::new("DrugInteractionAgent")
        .description("Checks for potential drug interactions based on user-provided information.")
        .instruction(
            "You are a drug safety checker. Your task is to analyze user-provided medication \
             information and check for potential conflicts.\n\
             Only check interactions if the user mentions taking medications; otherwise reply \
             that no medications were mentioned.\n\n\
             User query: '{user_query}'\n\n\
             Use the following tools to perform checks:\n\
             - `get_allopathic_drug_interactions`\n\
             - `get_ayurvedic_allopathic_interactions`\n\n\
             Based on your findings, provide a clear, easy-to-understand alert to the user.",
        )
        .model(model)
        .output_key(DRUG_ALERT_KEY);
    for tool in build_drug_interaction_tools() {
        builder = builder.tool(tool);
    }
    Ok(Arc::new(builder.build()?))
}

pub fn build_response_formatter(model: Arc<dyn Llm>) -> Result<Arc<dyn Agent>> {
    let agent = LlmAgentBuilder::new("ResponseFormatterAgent")
        .description("Formats all outputs into a final, user-friendly response.")
        .instruction(
            "You are a kind and professional healthcare assistant. Your task is to combine the \
             preliminary diagnosis and any drug interaction alerts into a single, cohesive, and \
             empathetic message for the user.\n\n\
             Preliminary Diagnosis: {preliminary_diagnosis_response}\n\
             Drug Interaction Alert (if any): {drug_interaction_alert?}\n\n\
             Your response should:\n\
             1. Start with an empathetic greeting.\n\
             2. Present the preliminary diagnosis clearly, using cautious language.\n\
             3. Include any drug interaction alerts as a separate, clearly marked section.\n\
             4. End with a strong recommendation to consult a doctor.\n\n\
             Ensure the entire message is in a friendly, conversational tone.",
        )
        .model(model)
        .output_key(FINAL_RESPONSE_KEY)
        .build()?;
    Ok(Arc::new(agent))
}

pub fn build_symptom_checker_pipeline(
    model: Arc<dyn Llm>,
    pii_phrases: Vec<String>,
    signal: TriageSignal,
) -> Result<Arc<dyn Agent>> {
    let stages = vec![
        build_symptom_extractor(model.clone(), pii_phrases)?,
        build_diagnostics_agent(model.clone(), signal)?,
        build_drug_interaction_agent(model.clone())?,
        build_response_formatter(model)?,
    ];
    Ok(Arc::new(SequentialAgent::new(PIPELINE_NAME, stages)))
}

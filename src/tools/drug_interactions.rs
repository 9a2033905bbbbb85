use std::collections::BTreeSet;
use std::sync::Arc;

use adk_rust::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const ALLOPATHIC_TOOL_NAME: &str = "get_allopathic_drug_interactions";
pub const AYURVEDIC_TOOL_NAME: &str = "get_ayurvedic_allopathic_interactions";

pub const INTERACTION_DISCLAIMER: &str = "Reference table only. Absence of a match does not mean \
a combination is safe; confirm with a pharmacist or doctor.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSeverity {
    Minor,
    Moderate,
    Major,
    Contraindicated,
}

#[derive(Debug, Clone, Copy)]
pub struct InteractionRule {
    pub first: &'static str,
    pub second: &'static str,
    pub severity: InteractionSeverity,
    pub effect: &'static str,
    pub advice: &'static str,
}

const fn rule(
    first: &'static str,
    second: &'static str,
    severity: InteractionSeverity,
    effect: &'static str,
    advice: &'static str,
) -> InteractionRule {
    InteractionRule {
        first,
        second,
        severity,
        effect,
        advice,
    }
}

use InteractionSeverity::*;

pub const ALLOPATHIC_INTERACTIONS: &[InteractionRule] = &[
    rule("warfarin", "aspirin", Major, "increased bleeding risk", "avoid unless prescribed together; monitor INR"),
    rule("warfarin", "ibuprofen", Major, "increased bleeding risk", "prefer paracetamol for pain relief"),
    rule("lisinopril", "spironolactone", Major, "high potassium levels", "monitor potassium and kidney function"),
    rule("simvastatin", "clarithromycin", Major, "muscle damage (myopathy)", "pause the statin during the antibiotic course"),
    rule("sildenafil", "nitroglycerin", Contraindicated, "dangerous drop in blood pressure", "never combine"),
    rule("sertraline", "tramadol", Major, "serotonin syndrome and seizures", "seek an alternative analgesic"),
    rule("ciprofloxacin", "antacid", Moderate, "reduced antibiotic absorption", "take ciprofloxacin 2 hours before the antacid"),
    rule("levothyroxine", "calcium carbonate", Moderate, "reduced thyroid hormone absorption", "separate doses by 4 hours"),
    rule("clopidogrel", "omeprazole", Moderate, "reduced antiplatelet effect", "ask about pantoprazole instead"),
    rule("metformin", "prednisolone", Minor, "higher blood sugar", "monitor glucose more often"),
];

pub const AYURVEDIC_INTERACTIONS: &[InteractionRule] = &[
    rule("ashwagandha", "levothyroxine", Moderate, "raised thyroid hormone levels", "check thyroid levels before combining"),
    rule("ashwagandha", "alprazolam", Moderate, "additive sedation", "avoid driving; discuss dose with a doctor"),
    rule("turmeric", "warfarin", Moderate, "increased bleeding risk", "avoid concentrated curcumin supplements"),
    rule("guggul", "propranolol", Moderate, "reduced beta-blocker absorption", "separate doses and monitor blood pressure"),
    rule("karela", "metformin", Moderate, "low blood sugar", "monitor glucose closely"),
    rule("gymnema", "insulin", Moderate, "low blood sugar", "monitor glucose closely"),
    rule("yashtimadhu", "furosemide", Moderate, "low potassium levels", "limit licorice root and monitor potassium"),
    rule("garlic", "warfarin", Minor, "slightly increased bleeding risk", "keep dietary intake consistent"),
    rule("brahmi", "sertraline", Minor, "additive sedation", "take at bedtime and watch for drowsiness"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionMatch {
    pub drugs: [String; 2],
    pub severity: InteractionSeverity,
    pub effect: String,
    pub advice: String,
}

pub fn normalize_medication(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Declared arguments of both interaction tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MedicationArgs {
    /// Names of every medication, herb or supplement the user takes.
    pub medications: Vec<String>,
}

/// Accepts `medications` as a list of names or a comma-separated string.
pub fn medications_from_args(args: &Value) -> Vec<String> {
    let raw: Vec<String> = match args.get("medications") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(Value::String(list)) => list.split(',').map(String::from).collect(),
        _ => Vec::new(),
    };

    let mut seen = BTreeSet::new();
    raw.iter()
        .map(|name| normalize_medication(name))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Pairwise lookup; order of the medications does not matter.
pub fn find_interactions(medications: &[String], table: &[InteractionRule]) -> Vec<InteractionMatch> {
    let taking = |name: &str| medications.iter().any(|med| med == name);
    table
        .iter()
        .filter(|rule| taking(rule.first) && taking(rule.second))
        .map(|rule| InteractionMatch {
            drugs: [rule.first.to_string(), rule.second.to_string()],
            severity: rule.severity,
            effect: rule.effect.to_string(),
            advice: rule.advice.to_string(),
        })
        .collect()
}

pub fn interaction_tool_response(args: &Value, table: &[InteractionRule]) -> Value {
    let medications = medications_from_args(args);
    if medications.is_empty() {
        return json!({"error": "medications is required (list of medication names)"});
    }

    let interactions = find_interactions(&medications, table);
    json!({
        "checked": medications,
        "count": interactions.len(),
        "interactions": interactions,
        "disclaimer": INTERACTION_DISCLAIMER,
    })
}

pub fn build_drug_interaction_tools() -> Vec<Arc<dyn Tool>> {
    let allopathic = FunctionTool::new(
        ALLOPATHIC_TOOL_NAME,
        "Checks a list of allopathic (conventional) medications for known pairwise interactions.",
        |_ctx, args| async move { Ok(interaction_tool_response(&args, ALLOPATHIC_INTERACTIONS)) },
    )
    .with_parameters_schema::<MedicationArgs>();

    let ayurvedic = FunctionTool::new(
        AYURVEDIC_TOOL_NAME,
        "Checks ayurvedic herbs against allopathic medications for known interactions.",
        |_ctx, args| async move { Ok(interaction_tool_response(&args, AYURVEDIC_INTERACTIONS)) },
    )
    .with_parameters_schema::<MedicationArgs>();

    vec![Arc::new(allopathic), Arc::new(ayurvedic)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric_and_case_insensitive() {
        let forward = medications_from_args(&json!({"medications": ["Warfarin", "ASPIRIN"]}));
        let reverse = medications_from_args(&json!({"medications": ["aspirin", "warfarin"]}));
        let a = find_interactions(&forward, ALLOPATHIC_INTERACTIONS);
        let b = find_interactions(&reverse, ALLOPATHIC_INTERACTIONS);
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
        assert_eq!(a[0].severity, InteractionSeverity::Major);
    }

    #[test]
    fn comma_separated_medications_are_accepted() {
        let out = interaction_tool_response(
            &json!({"medications": "turmeric, warfarin , turmeric"}),
            AYURVEDIC_INTERACTIONS,
        );
        assert_eq!(out["checked"], json!(["turmeric", "warfarin"]));
        assert_eq!(out["count"], 1);
        assert_eq!(out["interactions"][0]["severity"], "moderate");
    }

    #[test]
    fn unrelated_medications_have_no_matches() {
        let out = interaction_tool_response(
            &json!({"medications": ["paracetamol", "cetirizine"]}),
            ALLOPATHIC_INTERACTIONS,
        );
        assert_eq!(out["count"], 0);
        assert!(out["disclaimer"].as_str().is_some());
    }

    #[test]
    fn missing_medications_returns_error_payload() {
        let out = interaction_tool_response(&json!({}), ALLOPATHIC_INTERACTIONS);
        assert!(out["error"].as_str().is_some());
    }

    #[test]
    fn tools_are_registered_under_expected_names() {
        let names = build_drug_interaction_tools()
            .iter()
            .map(|tool| tool.name().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![ALLOPATHIC_TOOL_NAME, AYURVEDIC_TOOL_NAME]);
    }

    #[test]
    fn both_tools_declare_a_required_medication_list() {
        for tool in build_drug_interaction_tools() {
            let schema = tool
                .parameters_schema()
                .expect("interaction tools declare parameters");
            assert_eq!(schema["required"], json!(["medications"]), "{}", tool.name());
            assert_eq!(schema["properties"]["medications"]["type"], "array");
        }
    }
}

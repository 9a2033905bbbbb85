//! Structured outputs of the extractor agents.
use anyhow::{Context, Result};
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Product details pulled out of an artisan's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProductData {
    /// Name of the artisan product.
    pub product_name: String,
    /// Type of craft (e.g., 'pottery', 'Kalamkari art', 'handloom saree').
    pub craft_type: String,
    /// List of unique features or benefits (e.g., 'handmade', 'sustainable materials', 'cultural heritage').
    pub unique_selling_points: Vec<String>,
    /// The desired brand tone (e.g., 'elegant', 'rustic', 'modern').
    pub brand_tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SymptomData {
    /// List of symptoms identified from the user query.
    pub symptoms: Vec<String>,
    /// Overall perceived severity (e.g., 'mild', 'moderate', 'severe').
    pub severity: String,
    /// Duration of symptoms, if provided.
    pub duration: Option<String>,
}

/// Provider-ready JSON schema for `T`, used for agent response schemas and
/// tool parameters.
///
/// Providers accept an OpenAPI subset: no `$schema`, no `$ref`, no type
/// arrays. Optional fields come out as `nullable`.
pub fn output_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::openapi3().with(|settings| {
        settings.inline_subschemas = true;
        settings.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut schema = serde_json::to_value(&root).unwrap_or(Value::Null);
    if let Some(object) = schema.as_object_mut() {
        object.remove("title");
    }
    schema
}

/// Strips a surrounding markdown code fence (with or without a language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_structured_output<T: DeserializeOwned>(text: &str, schema_name: &str) -> Result<T> {
    let body = strip_code_fence(text);
    serde_json::from_str::<T>(body)
        .with_context(|| format!("model output does not match the {schema_name} schema"))
}

/// Accepts either an already-structured state value or its JSON text form.
pub fn structured_from_state<T: DeserializeOwned>(value: &Value, schema_name: &str) -> Result<T> {
    match value {
        Value::String(text) => parse_structured_output(text, schema_name),
        other => serde_json::from_value::<T>(other.clone())
            .with_context(|| format!("state value does not match the {schema_name} schema")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_parses_into_product_data() {
        let text = "```json\n{\"product_name\":\"Indigo Vase\",\"craft_type\":\"pottery\",\
                    \"unique_selling_points\":[\"handmade\"],\"brand_tone\":\"rustic\"}\n```";
        let product: ProductData =
            parse_structured_output(text, "ProductData").expect("fenced json should parse");
        assert_eq!(product.product_name, "Indigo Vase");
        assert_eq!(product.brand_tone.as_deref(), Some("rustic"));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let symptoms: SymptomData =
            parse_structured_output(r#"{"symptoms":["cough"],"severity":"mild"}"#, "SymptomData")
                .expect("duration is optional");
        assert_eq!(symptoms.duration, None);
    }

    #[test]
    fn wrong_shape_is_rejected_with_schema_name() {
        let err = parse_structured_output::<SymptomData>(r#"{"symptoms":"cough"}"#, "SymptomData")
            .expect_err("string is not a list");
        assert!(format!("{err:#}").contains("SymptomData"));
    }

    #[test]
    fn schema_lists_required_product_fields() {
        let schema = output_schema::<ProductData>();
        let required = schema["required"]
            .as_array()
            .expect("schema should list required fields");
        assert!(required.iter().any(|v| v == "product_name"));
        assert!(required.iter().any(|v| v == "unique_selling_points"));
        assert!(!required.iter().any(|v| v == "brand_tone"));
    }

    fn assert_provider_ready(schema: &Value, path: &str) {
        match schema {
            Value::Object(map) => {
                for key in ["$schema", "$ref", "definitions", "default"] {
                    assert!(!map.contains_key(key), "{path} carries {key}");
                }
                if let Some(kind) = map.get("type") {
                    assert!(kind.is_string(), "{path} has type {kind}");
                }
                for (key, value) in map {
                    assert_provider_ready(value, &format!("{path}.{key}"));
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    assert_provider_ready(item, &format!("{path}[{index}]"));
                }
            }
            _ => {}
        }
    }

    #[test]
    fn response_schemas_use_the_provider_subset() {
        for schema in [output_schema::<ProductData>(), output_schema::<SymptomData>()] {
            assert!(schema.get("title").is_none());
            assert_eq!(schema["type"], "object");
            assert_provider_ready(&schema, "$");
        }

        let symptoms = output_schema::<SymptomData>();
        assert_eq!(symptoms["properties"]["duration"]["type"], "string");
        assert_eq!(symptoms["properties"]["duration"]["nullable"], true);
    }
}

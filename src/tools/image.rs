use std::sync::Arc;

use adk_rust::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const GENERATE_IMAGE_TOOL_NAME: &str = "generate_image";
const DEFAULT_STYLE: &str = "photorealistic";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageArgs {
    /// What the image should show.
    pub description: String,
    /// Visual style, e.g. 'elegant', 'rustic', 'modern'. Defaults to photorealistic.
    pub style: Option<String>,
}

/// Placeholder asset URL. A real deployment would call an image generation service here.
pub fn image_url_for(description: &str) -> String {
    format!("Image_URL_for_{}", description.replace(' ', "_"))
}

pub fn generate_image_tool_response(args: &Value) -> Value {
    let Ok(args) = serde_json::from_value::<ImageArgs>(args.clone()) else {
        return json!({"error": "description is required"});
    };
    let description = args.description.trim();
    if description.is_empty() {
        return json!({"error": "description is required"});
    }
    let style = args
        .style
        .as_deref()
        .map(str::trim)
        .filter(|style| !style.is_empty())
        .unwrap_or(DEFAULT_STYLE);

    tracing::info!(description = %description, style = %style, "Generating marketing image");
    json!({
        "image_url": image_url_for(description),
        "description": description,
        "style": style,
    })
}

pub fn build_image_tool() -> Arc<dyn Tool> {
    let tool = FunctionTool::new(
        GENERATE_IMAGE_TOOL_NAME,
        "Generates a high-quality marketing image from a text description.",
        |_ctx, args| async move { Ok(generate_image_tool_response(&args)) },
    )
    .with_parameters_schema::<ImageArgs>();
    Arc::new(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_replaces_spaces_with_underscores() {
        let out = generate_image_tool_response(
            &json!({"description": "potter at the wheel", "style": "rustic"}),
        );
        assert_eq!(out["image_url"], "Image_URL_for_potter_at_the_wheel");
        assert_eq!(out["style"], "rustic");
    }

    #[test]
    fn missing_description_is_reported() {
        let out = generate_image_tool_response(&json!({"style": "modern"}));
        assert_eq!(out["error"], "description is required");
        let out = generate_image_tool_response(&json!({"description": "  "}));
        assert_eq!(out["error"], "description is required");
    }

    #[test]
    fn style_defaults_when_absent() {
        let out = generate_image_tool_response(&json!({"description": "clay lamp"}));
        assert_eq!(out["style"], DEFAULT_STYLE);
    }

    #[test]
    fn declared_parameters_require_description_only() {
        let schema = build_image_tool()
            .parameters_schema()
            .expect("image tool declares parameters");
        let required = schema["required"]
            .as_array()
            .expect("required list should be present");
        assert!(required.iter().any(|name| name == "description"));
        assert!(!required.iter().any(|name| name == "style"));
        assert!(schema["properties"]["style"].is_object());
    }
}

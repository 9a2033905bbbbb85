use adk_rust::prelude::*;

/// Phrases stripped from every prompt before it reaches the symptom extractor.
pub const PII_KEYWORDS: &[&str] = &[
    "my name is",
    "my phone number is",
    "my address is",
    "I live at",
    "my birth date is",
    "my social security number is",
];

pub fn default_pii_phrases() -> Vec<String> {
    PII_KEYWORDS.iter().map(|phrase| phrase.to_string()).collect()
}

/// Literal, case-sensitive removal of each phrase.
pub fn redact_pii(text: &str, phrases: &[String]) -> String {
    let mut sanitized = text.to_string();
    for phrase in phrases {
        if phrase.is_empty() {
            continue;
        }
        sanitized = sanitized.replace(phrase.as_str(), "");
    }
    sanitized
}

pub fn contains_pii(text: &str, phrases: &[String]) -> bool {
    phrases
        .iter()
        .any(|phrase| !phrase.is_empty() && text.contains(phrase.as_str()))
}

/// Redacts every text part of the request in place. Returns true if anything was removed.
pub fn sanitize_request(request: &mut LlmRequest, phrases: &[String]) -> bool {
    let mut changed = false;
    for content in &mut request.contents {
        for part in &mut content.parts {
            if let Part::Text { text } = part {
                let sanitized = redact_pii(text, phrases);
                if sanitized != *text {
                    *text = sanitized;
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Installs the PII redaction hook as the agent's before-model callback.
pub fn with_pii_redaction(builder: LlmAgentBuilder, phrases: Vec<String>) -> LlmAgentBuilder {
    builder.before_model_callback(Box::new(move |_ctx, mut request| {
        let phrases = phrases.clone();
        Box::pin(async move {
            if sanitize_request(&mut request, &phrases) {
                tracing::info!(phrases = phrases.len(), "PII removed from user prompt");
            }
            Ok(BeforeModelResult::Continue(request))
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_phrase_is_removed() {
        let phrases = default_pii_phrases();
        for phrase in PII_KEYWORDS {
            let text = format!("{phrase} something and I cough at night");
            let out = redact_pii(&text, &phrases);
            assert!(!out.contains(phrase), "'{phrase}' survived redaction");
            assert!(out.contains("I cough at night"));
        }
    }

    #[test]
    fn text_without_phrases_is_unchanged() {
        let text = "Headache for three days, moderate.";
        assert_eq!(redact_pii(text, &default_pii_phrases()), text);
        assert!(!contains_pii(text, &default_pii_phrases()));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let text = "My name is Ravi and I live at Jaipur";
        let out = redact_pii(text, &default_pii_phrases());
        assert_eq!(out, "My name is Ravi and  Jaipur");
    }

    #[test]
    fn request_text_parts_are_sanitized_in_place() {
        let mut request = LlmRequest::new(
            "mock".to_string(),
            vec![Content::new("user").with_text("my phone number is 555-0100, I feel dizzy")],
        );
        assert!(sanitize_request(&mut request, &default_pii_phrases()));

        let Part::Text { text } = &request.contents[0].parts[0] else {
            panic!("expected a text part");
        };
        assert_eq!(text, " 555-0100, I feel dizzy");
        assert!(!sanitize_request(&mut request, &default_pii_phrases()));
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use adk_rust::prelude::*;
use serde_json::Value;

/// Phrase the diagnostics agent appends when symptoms look critical.
pub const EMERGENCY_TRIGGER: &str = "trigger_emergency_protocol";

/// Session-state key that forces the emergency alert when present.
pub const EMERGENCY_FLAG_KEY: &str = "emergency_protocol";

pub const EMERGENCY_ALERT: &str = "⚠️ **Emergency Alert:** Your symptoms indicate a critical \
condition. Please proceed to the nearest emergency room immediately. We have located the nearest \
hospital for you.";

pub fn requires_emergency(text: &str) -> bool {
    text.contains(EMERGENCY_TRIGGER)
}

pub fn response_text(response: &LlmResponse) -> String {
    response
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Emergency state of one diagnostics turn, shared across its streamed chunks.
///
/// Model output arrives in chunks and the after-model hook sees one chunk at
/// a time, so the trigger can be split over several of them. The signal keeps
/// the text seen so far and latches once the trigger shows up.
#[derive(Debug, Clone, Default)]
pub struct TriageSignal {
    fired: Arc<AtomicBool>,
    transcript: Arc<Mutex<String>>,
}

impl TriageSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Feeds one chunk and returns its replacement, if it needs one.
    ///
    /// The chunk that completes the trigger becomes the alert. After that,
    /// partial chunks are blanked and any closing aggregate is the alert too.
    pub fn observe(&self, response: LlmResponse) -> Option<LlmResponse> {
        if self.fired() {
            return Some(if response.partial {
                with_text(response, "")
            } else {
                with_text(response, EMERGENCY_ALERT)
            });
        }

        let mut transcript = self
            .transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        transcript.push_str(&response_text(&response));
        if !requires_emergency(&transcript) {
            return None;
        }

        self.fired.store(true, Ordering::SeqCst);
        Some(with_text(response, EMERGENCY_ALERT))
    }
}

fn with_text(mut response: LlmResponse, text: &str) -> LlmResponse {
    response.content = Some(Content::new("model").with_text(text));
    response
}

pub fn with_emergency_triage(builder: LlmAgentBuilder, signal: TriageSignal) -> LlmAgentBuilder {
    builder.after_model_callback(Box::new(move |_ctx, response| {
        let signal = signal.clone();
        Box::pin(async move {
            let already_fired = signal.fired();
            let replaced = signal.observe(response);
            if signal.fired() && !already_fired {
                tracing::warn!("Critical condition detected. Triggering emergency redirect.");
            }
            Ok(replaced)
        })
    }))
}

/// Alert text to show instead of the normal pipeline answer, if any.
pub fn triage_outcome(state: &HashMap<String, Value>) -> Option<&'static str> {
    if state.contains_key(EMERGENCY_FLAG_KEY) {
        return Some(EMERGENCY_ALERT);
    }
    let diagnosis = state
        .get(crate::agents::symptom::DIAGNOSIS_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default();
    if diagnosis.contains(EMERGENCY_ALERT) || requires_emergency(diagnosis) {
        return Some(EMERGENCY_ALERT);
    }
    None
}

//! Agent configurations.
//!
//! **Artisan assistant**:
//! - `orchestrator`: root agent that routes requests to tools
//! - `marketing`: product extraction -> video ad -> social media post
//!
//! **Symptom checker**:
//! - `symptom`: extraction (PII-redacted) -> diagnosis/triage -> drug interactions -> formatting
//!
//! Every stage writes its answer to a session-state key that later stages
//! read through `{key}` placeholders in their instructions.

pub mod marketing;
pub mod orchestrator;
pub mod symptom;

/// State key holding the raw user request for pipeline instructions.
pub const USER_QUERY_KEY: &str = "user_query";

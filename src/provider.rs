use std::sync::Arc;

use adk_rust::prelude::*;
use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::cli::Provider;
use crate::config::RuntimeConfig;

/// Model used by every agent when the provider is Gemini and nothing overrides it.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const OLLAMA_DEFAULT_HOST: &str = "http://localhost:11434";

/// Static facts about one concrete provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub provider: Provider,
    /// Credential variable, or the host variable for Ollama.
    pub env_key: &'static str,
    pub default_model: &'static str,
    /// Accepted model-name prefixes; empty means any non-blank name.
    pub model_prefixes: &'static [&'static str],
}

/// Auto-detection walks this table in order, so Gemini wins when several keys are set.
pub static PROVIDERS: [ProviderSpec; 6] = [
    ProviderSpec {
        provider: Provider::Gemini,
        env_key: "GOOGLE_API_KEY",
        default_model: DEFAULT_GEMINI_MODEL,
        model_prefixes: &["gemini"],
    },
    ProviderSpec {
        provider: Provider::Openai,
        env_key: "OPENAI_API_KEY",
        default_model: "gpt-4o-mini",
        model_prefixes: &["gpt-", "o1", "o3", "o4"],
    },
    ProviderSpec {
        provider: Provider::Anthropic,
        env_key: "ANTHROPIC_API_KEY",
        default_model: "claude-sonnet-4-20250514",
        model_prefixes: &["claude"],
    },
    ProviderSpec {
        provider: Provider::Deepseek,
        env_key: "DEEPSEEK_API_KEY",
        default_model: "deepseek-chat",
        model_prefixes: &["deepseek"],
    },
    ProviderSpec {
        provider: Provider::Groq,
        env_key: "GROQ_API_KEY",
        default_model: "llama-3.3-70b-versatile",
        model_prefixes: &[],
    },
    ProviderSpec {
        provider: Provider::Ollama,
        env_key: "OLLAMA_HOST",
        default_model: "llama3.2",
        model_prefixes: &[],
    },
];

/// `None` only for `Provider::Auto`.
pub fn provider_spec(provider: Provider) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.provider == provider)
}

pub fn validate_model_for_provider(provider: Provider, model_name: &str) -> Result<()> {
    let Some(spec) = provider_spec(provider) else {
        return Ok(());
    };
    let accepted = if spec.model_prefixes.is_empty() {
        !model_name.trim().is_empty()
    } else {
        spec.model_prefixes
            .iter()
            .any(|prefix| model_name.starts_with(prefix))
    };
    if accepted {
        return Ok(());
    }
    if spec.model_prefixes.is_empty() {
        return Err(anyhow::anyhow!(
            "model name for provider '{provider:?}' cannot be blank"
        ));
    }
    Err(anyhow::anyhow!(
        "model '{model_name}' is not compatible with provider '{provider:?}' \
         (expected a name starting with {})",
        spec.model_prefixes.join(" or ")
    ))
}

pub fn default_model_for(provider: Provider) -> &'static str {
    provider_spec(provider)
        .map(|spec| spec.default_model)
        .unwrap_or(DEFAULT_GEMINI_MODEL)
}

fn required_env(spec: &ProviderSpec) -> Result<String> {
    std::env::var(spec.env_key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| {
            format!(
                "{} is required for the {:?} provider",
                spec.env_key, spec.provider
            )
        })
}

pub fn resolve_model(cfg: &RuntimeConfig) -> Result<(Arc<dyn Llm>, Provider, String)> {
    let spec = match provider_spec(cfg.provider) {
        Some(spec) => spec,
        None => detect_provider().context(
            "no provider could be auto-detected. Set one of GOOGLE_API_KEY, OPENAI_API_KEY, \
             ANTHROPIC_API_KEY, DEEPSEEK_API_KEY, GROQ_API_KEY, or use --provider ollama",
        )?,
    };
    let provider = spec.provider;
    let model_name = cfg
        .model
        .clone()
        .unwrap_or_else(|| spec.default_model.to_string());
    validate_model_for_provider(provider, &model_name)?;

    let name = model_name.clone();
    let model: Arc<dyn Llm> = match provider {
        Provider::Gemini => Arc::new(GeminiModel::new(required_env(spec)?, name)?),
        Provider::Openai => Arc::new(OpenAIClient::new(OpenAIConfig::new(
            required_env(spec)?,
            name,
        ))?),
        Provider::Anthropic => Arc::new(AnthropicClient::new(AnthropicConfig::new(
            required_env(spec)?,
            name,
        ))?),
        Provider::Deepseek => Arc::new(DeepSeekClient::new(DeepSeekConfig::new(
            required_env(spec)?,
            name,
        ))?),
        Provider::Groq => Arc::new(GroqClient::new(GroqConfig::new(required_env(spec)?, name))?),
        Provider::Ollama | Provider::Auto => {
            let host = required_env(spec).unwrap_or_else(|_| OLLAMA_DEFAULT_HOST.to_string());
            Arc::new(OllamaModel::new(OllamaConfig::with_host(host, name))?)
        }
    };

    tracing::debug!(provider = ?provider, model = %model_name, "Resolved model client");
    Ok((model, provider, model_name))
}

pub fn detect_provider() -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| env_present(spec.env_key))
}

pub fn env_present(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

pub fn parse_provider_name(value: &str) -> Result<Provider> {
    Provider::from_str(value.trim(), true).map_err(|_| {
        let names = Provider::value_variants()
            .iter()
            .filter_map(|variant| variant.to_possible_value())
            .map(|value| value.get_name().to_string())
            .collect::<Vec<_>>();
        anyhow::anyhow!(
            "invalid provider '{value}'. Supported values: {}",
            names.join(", ")
        )
    })
}

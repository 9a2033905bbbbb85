use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::*;
use crate::pii::default_pii_phrases;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub profile: String,
    pub config_path: String,
    pub provider: Provider,
    pub model: Option<String>,
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub session_backend: SessionBackend,
    pub session_db_url: String,
    pub show_sensitive_config: bool,
    pub telemetry_enabled: bool,
    pub telemetry_path: String,
    pub pii_phrases: Vec<String>,
    pub review_required: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub app_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub session_backend: Option<SessionBackend>,
    pub session_db_url: Option<String>,
    pub telemetry_enabled: Option<bool>,
    pub telemetry_path: Option<String>,
    /// Appended to the built-in PII phrases, never replacing them.
    #[serde(default)]
    pub pii_phrases: Vec<String>,
    pub review_required: Option<bool>,
}

pub fn load_profiles(config_path: &str) -> Result<ProfilesFile> {
    let path = Path::new(config_path);
    if !path.exists() {
        return Ok(ProfilesFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile config file at '{}'", path.display()))?;
    toml::from_str::<ProfilesFile>(&content).with_context(|| {
        format!(
            "invalid profile configuration in '{}'. Check provider/session values and field names.",
            path.display()
        )
    })
}

pub const DEFAULT_APP_NAME: &str = "craftcare";
pub const DEFAULT_USER_ID: &str = "local-user";
pub const DEFAULT_SESSION_ID: &str = "default-session";
pub const DEFAULT_SESSION_DB_URL: &str = "sqlite://.craftcare/sessions.db";
pub const DEFAULT_TELEMETRY_PATH: &str = ".craftcare/telemetry/events.jsonl";

/// Trimmed, non-empty phrases in first-seen order.
fn merge_unique_phrases<'a>(phrases: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    phrases
        .into_iter()
        .map(|phrase| phrase.trim())
        .filter(|phrase| !phrase.is_empty() && seen.insert(*phrase))
        .map(str::to_string)
        .collect()
}

/// Flag value, then profile value, then the built-in default.
fn layered<T>(flag: Option<T>, profile: Option<T>, default: impl Into<T>) -> T {
    flag.or(profile).unwrap_or_else(|| default.into())
}

/// The named profile, or an empty one for an unconfigured `default`.
fn select_profile(profiles: &ProfilesFile, name: &str, config_path: &str) -> Result<ProfileConfig> {
    if let Some(profile) = profiles.profiles.get(name) {
        return Ok(profile.clone());
    }
    if name == "default" {
        return Ok(ProfileConfig::default());
    }

    let mut names = profiles.profiles.keys().map(String::as_str).collect::<Vec<_>>();
    names.sort_unstable();
    let known = if names.is_empty() {
        "No profiles are defined yet.".to_string()
    } else {
        format!("Available profiles: {}", names.join(", "))
    };
    Err(anyhow::anyhow!(
        "profile '{name}' not found in '{config_path}'. {known}"
    ))
}

pub fn resolve_runtime_config(cli: &Cli, profiles: &ProfilesFile) -> Result<RuntimeConfig> {
    let selected = cli.profile.trim();
    if selected.is_empty() {
        return Err(anyhow::anyhow!(
            "profile name cannot be empty. Set --profile <name>."
        ));
    }
    let profile = select_profile(profiles, selected, &cli.config_path)?;

    // `auto` on the command line defers to the profile.
    let provider = Some(cli.provider).filter(|provider| *provider != Provider::Auto);
    let default_phrases = default_pii_phrases();
    let pii_phrases = merge_unique_phrases(
        default_phrases
            .iter()
            .chain(&profile.pii_phrases)
            .chain(&cli.pii_phrase),
    );

    Ok(RuntimeConfig {
        profile: selected.to_string(),
        config_path: cli.config_path.clone(),
        provider: layered(provider, profile.provider, Provider::Auto),
        model: cli.model.clone().or(profile.model),
        app_name: layered(cli.app_name.clone(), profile.app_name, DEFAULT_APP_NAME),
        user_id: layered(cli.user_id.clone(), profile.user_id, DEFAULT_USER_ID),
        session_id: layered(cli.session_id.clone(), profile.session_id, DEFAULT_SESSION_ID),
        session_backend: layered(
            cli.session_backend,
            profile.session_backend,
            SessionBackend::Memory,
        ),
        session_db_url: layered(
            cli.session_db_url.clone(),
            profile.session_db_url,
            DEFAULT_SESSION_DB_URL,
        ),
        show_sensitive_config: cli.show_sensitive_config,
        telemetry_enabled: layered(cli.telemetry_enabled, profile.telemetry_enabled, true),
        telemetry_path: layered(
            cli.telemetry_path.clone(),
            profile.telemetry_path,
            DEFAULT_TELEMETRY_PATH,
        ),
        pii_phrases,
        review_required: layered(cli.review_required, profile.review_required, false),
    })
}

pub fn display_session_db_url(cfg: &RuntimeConfig) -> String {
    if cfg.show_sensitive_config {
        cfg.session_db_url.clone()
    } else {
        format!(
            "{} (set --show-sensitive-config to reveal)",
            crate::error::redact_sqlite_urls(&cfg.session_db_url)
        )
    }
}

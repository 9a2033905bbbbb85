use anyhow::Result;

use crate::config::{ProfileConfig, ProfilesFile, RuntimeConfig, display_session_db_url};
use crate::pii::PII_KEYWORDS;

/// One line of `profiles list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
    pub name: String,
    pub active: bool,
    pub configured: bool,
    pub summary: String,
}

fn summarize_profile(profile: &ProfileConfig) -> String {
    let provider = profile
        .provider
        .map(|provider| format!("{provider:?}").to_ascii_lowercase())
        .unwrap_or_else(|| "auto".to_string());
    let backend = profile
        .session_backend
        .map(|backend| format!("{backend:?}").to_ascii_lowercase())
        .unwrap_or_else(|| "memory".to_string());
    format!(
        "provider={provider} model={} sessions={backend} extra_pii={} review={}",
        profile.model.as_deref().unwrap_or("<provider-default>"),
        profile.pii_phrases.len(),
        profile.review_required.unwrap_or(false)
    )
}

/// Configured profiles plus the implicit `default`, sorted by name.
pub fn profile_rows(profiles: &ProfilesFile, active: &str) -> Vec<ProfileRow> {
    let mut rows = profiles
        .profiles
        .iter()
        .map(|(name, profile)| ProfileRow {
            name: name.clone(),
            active: name == active,
            configured: true,
            summary: summarize_profile(profile),
        })
        .collect::<Vec<_>>();
    if !profiles.profiles.contains_key("default") {
        rows.push(ProfileRow {
            name: "default".to_string(),
            active: active == "default",
            configured: false,
            summary: summarize_profile(&ProfileConfig::default()),
        });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

pub fn run_profiles_list(profiles: &ProfilesFile, cfg: &RuntimeConfig) -> Result<()> {
    println!("Profiles from {} (active: {}):", cfg.config_path, cfg.profile);
    for row in profile_rows(profiles, &cfg.profile) {
        let marker = if row.active { '*' } else { ' ' };
        let implicit = if row.configured { "" } else { " (implicit)" };
        println!("{marker} {}{implicit}  {}", row.name, row.summary);
    }
    Ok(())
}

/// Resolved settings of the active profile, grouped by concern.
pub fn render_resolved_profile(cfg: &RuntimeConfig) -> String {
    let mut lines = vec![
        format!("Profile '{}' ({})", cfg.profile, cfg.config_path),
        "[model]".to_string(),
        format!("  provider = {:?}", cfg.provider),
        format!(
            "  model = {}",
            cfg.model.as_deref().unwrap_or("<provider-default>")
        ),
        "[sessions]".to_string(),
        format!("  app = {}  user = {}", cfg.app_name, cfg.user_id),
        format!("  session id = {}", cfg.session_id),
        format!("  backend = {:?}", cfg.session_backend),
        format!("  db url = {}", display_session_db_url(cfg)),
        "[safety]".to_string(),
    ];
    for phrase in &cfg.pii_phrases {
        let origin = if PII_KEYWORDS.contains(&phrase.as_str()) {
            "built-in"
        } else {
            "profile/flag"
        };
        lines.push(format!("  pii phrase \"{phrase}\" ({origin})"));
    }
    lines.push(format!(
        "  marketing review notice = {}",
        cfg.review_required
    ));
    lines.push("[telemetry]".to_string());
    lines.push(format!(
        "  enabled = {}  path = {}",
        cfg.telemetry_enabled, cfg.telemetry_path
    ));
    lines.join("\n")
}

pub fn run_profiles_show(cfg: &RuntimeConfig) -> Result<()> {
    println!("{}", render_resolved_profile(cfg));
    Ok(())
}

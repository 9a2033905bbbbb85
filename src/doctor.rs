use anyhow::Result;

use crate::cli::SessionBackend;
use crate::config::{RuntimeConfig, display_session_db_url};
use crate::provider::{PROVIDERS, detect_provider, env_present};
use crate::session::open_sqlite_session_service;
use crate::tools::drug_interactions::{ALLOPATHIC_INTERACTIONS, AYURVEDIC_INTERACTIONS};

/// Everything `doctor` can report without touching the session store.
pub fn doctor_report(cfg: &RuntimeConfig) -> Vec<String> {
    let mut lines = vec![format!("Profile '{}' from {}", cfg.profile, cfg.config_path)];

    lines.push("Providers:".to_string());
    lines.extend(PROVIDERS.iter().map(|spec| {
        let state = if env_present(spec.env_key) { "set" } else { "missing" };
        format!(
            "  {:<10} {:<18} {state:<8} default {}",
            format!("{:?}", spec.provider).to_ascii_lowercase(),
            spec.env_key,
            spec.default_model
        )
    }));
    lines.push(match detect_provider() {
        Some(spec) => format!("  auto picks {:?}", spec.provider),
        None => "  auto picks nothing; export GOOGLE_API_KEY or pass --provider ollama".to_string(),
    });

    lines.push(format!(
        "Sessions: {:?} store, app '{}', user '{}', session '{}'",
        cfg.session_backend, cfg.app_name, cfg.user_id, cfg.session_id
    ));
    lines.push(format!(
        "Safety: {} PII phrases, marketing review notice {}",
        cfg.pii_phrases.len(),
        if cfg.review_required { "on" } else { "off" }
    ));
    lines.push(format!(
        "Interaction tables: {} allopathic, {} ayurvedic",
        ALLOPATHIC_INTERACTIONS.len(),
        AYURVEDIC_INTERACTIONS.len()
    ));
    lines.push(if cfg.telemetry_enabled {
        format!("Telemetry: writing to {}", cfg.telemetry_path)
    } else {
        "Telemetry: disabled".to_string()
    });
    lines
}

pub async fn run_doctor(cfg: &RuntimeConfig) -> Result<()> {
    for line in doctor_report(cfg) {
        println!("{line}");
    }
    if cfg.session_backend == SessionBackend::Sqlite {
        open_sqlite_session_service(&cfg.session_db_url).await?;
        println!("Session store reachable: {}", display_session_db_url(cfg));
    }
    Ok(())
}

pub async fn run_migrate(cfg: &RuntimeConfig) -> Result<()> {
    if cfg.session_backend == SessionBackend::Memory {
        println!("Nothing to migrate: sessions are kept in memory.");
        return Ok(());
    }
    // Opening the sqlite service applies pending migrations.
    open_sqlite_session_service(&cfg.session_db_url).await?;
    println!("Session schema is current: {}", display_session_db_url(cfg));
    Ok(())
}

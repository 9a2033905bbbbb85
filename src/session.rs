use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use adk_rust::prelude::*;
use adk_session::*;
use anyhow::{Context, Result};
use serde_json::Value;

use crate::agents::USER_QUERY_KEY;
use crate::cli::{PipelineKind, SessionBackend};
use crate::config::RuntimeConfig;
use crate::streaming::event_text;

pub async fn build_session_service(cfg: &RuntimeConfig) -> Result<Arc<dyn SessionService>> {
    match cfg.session_backend {
        SessionBackend::Memory => Ok(Arc::new(InMemorySessionService::new())),
        SessionBackend::Sqlite => {
            let service = open_sqlite_session_service(&cfg.session_db_url).await?;
            Ok(Arc::new(service))
        }
    }
}

pub async fn open_sqlite_session_service(db_url: &str) -> Result<DatabaseSessionService> {
    prepare_sqlite_file(db_url)?;
    let service = DatabaseSessionService::new(db_url)
        .await
        .context("failed to open sqlite session database")?;
    service
        .migrate()
        .await
        .context("failed to run sqlite session migrations")?;
    Ok(service)
}

/// Folds every event's state delta, in order, over the initial state.
pub fn fold_state_deltas(
    initial: HashMap<String, Value>,
    events: &[Event],
) -> HashMap<String, Value> {
    let mut state = initial;
    for event in events {
        for (key, value) in &event.actions.state_delta {
            state.insert(key.clone(), value.clone());
        }
    }
    state
}

/// Creates a fresh session seeded with `state`. Pipeline runs never reuse a session.
pub async fn create_seeded_session(
    session_service: &Arc<dyn SessionService>,
    app_name: &str,
    user_id: &str,
    session_id: &str,
    state: HashMap<String, Value>,
) -> Result<()> {
    session_service
        .create(CreateRequest {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: Some(session_id.to_string()),
            state,
        })
        .await
        .with_context(|| {
            format!("failed to create pipeline session '{session_id}' for app '{app_name}'")
        })?;
    Ok(())
}

static PIPELINE_RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// `{base}-{pipeline}-{unix_ms}-{seq}`; the per-process sequence keeps runs
/// started in the same millisecond apart.
pub fn pipeline_session_id(base: &str, pipeline: &str) -> String {
    format!(
        "{base}-{}-{}-{}",
        pipeline.to_ascii_lowercase(),
        crate::telemetry::unix_ms_now(),
        PIPELINE_RUN_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

pub async fn ensure_session_exists(
    session_service: &Arc<dyn SessionService>,
    cfg: &RuntimeConfig,
) -> Result<()> {
    let session = session_service
        .get(GetRequest {
            app_name: cfg.app_name.clone(),
            user_id: cfg.user_id.clone(),
            session_id: cfg.session_id.clone(),
            num_recent_events: None,
            after: None,
        })
        .await;

    if session.is_ok() {
        return Ok(());
    }

    session_service
        .create(CreateRequest {
            app_name: cfg.app_name.clone(),
            user_id: cfg.user_id.clone(),
            session_id: Some(cfg.session_id.clone()),
            state: HashMap::new(),
        })
        .await
        .with_context(|| {
            format!(
                "failed to create session '{}' for app '{}'",
                cfg.session_id, cfg.app_name
            )
        })?;

    Ok(())
}

/// Creates the database file (and its directory) so sqlx can open it read-write.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    let Some(db_path) = sqlite_path_from_url(db_url) else {
        return Ok(());
    };
    if db_path.exists() {
        return Ok(());
    }

    if let Some(dir) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create session store directory '{}'", dir.display()))?;
    }
    std::fs::File::create(&db_path)
        .map(drop)
        .with_context(|| format!("failed to create session store '{}'", db_path.display()))
}

/// File behind a `sqlite://` URL; `None` for in-memory or non-sqlite URLs.
pub fn sqlite_path_from_url(db_url: &str) -> Option<PathBuf> {
    let location = db_url.strip_prefix("sqlite://")?;
    let path = location.split('?').next().unwrap_or_default();
    (!path.is_empty() && path != ":memory:").then(|| PathBuf::from(path))
}

/// A pipeline-run session id split back into the parts `pipeline_session_id` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRunId {
    pub base: String,
    pub kind: PipelineKind,
    pub started_ms: u128,
    pub seq: u64,
}

pub fn parse_pipeline_session_id(id: &str) -> Option<PipelineRunId> {
    let mut parts = id.rsplitn(4, '-');
    let seq = parts.next()?.parse().ok()?;
    let started_ms = parts.next()?.parse().ok()?;
    let kind = PipelineKind::from_agent_name(parts.next()?)?;
    let base = parts.next().filter(|base| !base.is_empty())?;
    Some(PipelineRunId {
        base: base.to_string(),
        kind,
        started_ms,
        seq,
    })
}

/// What `sessions list` and `sessions prune` know about one stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub id: String,
    pub updated: String,
    pub run: Option<PipelineRunId>,
    pub user_query: Option<String>,
}

/// Loads every session of the configured app/user, newest first.
async fn load_session_entries(
    session_service: &Arc<dyn SessionService>,
    cfg: &RuntimeConfig,
) -> Result<Vec<SessionEntry>> {
    let mut sessions = session_service
        .list(ListRequest {
            app_name: cfg.app_name.clone(),
            user_id: cfg.user_id.clone(),
            limit: None,
            offset: None,
        })
        .await
        .with_context(|| {
            format!(
                "failed to list sessions for app '{}' and user '{}'",
                cfg.app_name, cfg.user_id
            )
        })?;
    sessions.sort_by_key(|session| std::cmp::Reverse(session.last_update_time()));

    Ok(sessions
        .iter()
        .map(|session| SessionEntry {
            id: session.id().to_string(),
            updated: session.last_update_time().to_rfc3339(),
            run: parse_pipeline_session_id(session.id()),
            user_query: session
                .state()
                .get(USER_QUERY_KEY)
                .and_then(|value| value.as_str().map(str::to_string)),
        })
        .collect())
}

fn preview(text: &str, limit: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut = flat.chars().take(limit).collect::<String>();
    format!("{cut}...")
}

/// Conversation sessions first, then each pipeline's runs, newest first within a group.
pub fn render_session_listing(entries: &[SessionEntry], only: Option<PipelineKind>) -> String {
    let mut blocks = Vec::new();

    if only.is_none() {
        let conversations = entries
            .iter()
            .filter(|entry| entry.run.is_none())
            .map(|entry| format!("- {} (updated: {})", entry.id, entry.updated))
            .collect::<Vec<_>>();
        if !conversations.is_empty() {
            blocks.push(format!(
                "Conversation sessions ({}):\n{}",
                conversations.len(),
                conversations.join("\n")
            ));
        }
    }

    for kind in PipelineKind::ALL {
        if only.is_some_and(|wanted| wanted != kind) {
            continue;
        }
        let runs = entries
            .iter()
            .filter(|entry| entry.run.as_ref().is_some_and(|run| run.kind == kind))
            .map(|entry| {
                let query = entry
                    .user_query
                    .as_deref()
                    .map(|query| format!(" query: \"{}\"", preview(query, 60)))
                    .unwrap_or_default();
                format!("- {} (updated: {}){query}", entry.id, entry.updated)
            })
            .collect::<Vec<_>>();
        if !runs.is_empty() {
            blocks.push(format!(
                "{} runs ({}):\n{}",
                kind.agent_name(),
                runs.len(),
                runs.join("\n")
            ));
        }
    }

    blocks.join("\n\n")
}

pub async fn run_sessions_list(cfg: &RuntimeConfig, only: Option<PipelineKind>) -> Result<()> {
    let session_service = build_session_service(cfg).await?;
    let entries = load_session_entries(&session_service, cfg).await?;
    let listing = render_session_listing(&entries, only);
    if listing.is_empty() {
        println!(
            "Nothing stored for app '{}' and user '{}'.",
            cfg.app_name, cfg.user_id
        );
    } else {
        println!("{listing}");
    }
    Ok(())
}

pub async fn run_sessions_show(
    cfg: &RuntimeConfig,
    session_id_override: Option<String>,
    recent: usize,
) -> Result<()> {
    let session_id = session_id_override.unwrap_or_else(|| cfg.session_id.clone());
    let session_service = build_session_service(cfg).await?;
    let session = session_service
        .get(GetRequest {
            app_name: cfg.app_name.clone(),
            user_id: cfg.user_id.clone(),
            session_id: session_id.clone(),
            num_recent_events: (recent > 0).then_some(recent),
            after: None,
        })
        .await
        .with_context(|| format!("no session '{session_id}' for app '{}'", cfg.app_name))?;

    println!(
        "Session '{}' (updated: {})",
        session.id(),
        session.last_update_time().to_rfc3339()
    );
    if let Some(run) = parse_pipeline_session_id(session.id()) {
        println!(
            "Pipeline: {} (run {} of base '{}')",
            run.kind.agent_name(),
            run.seq,
            run.base
        );
        let state = session.state();
        if let Some(Value::String(query)) = state.get(USER_QUERY_KEY) {
            println!("Seeded query: {query}");
        }
        for key in run.kind.output_keys() {
            match state.get(key) {
                Some(Value::String(text)) => println!("  {key}: {}", preview(&text, 120)),
                Some(Value::Null) | None => println!("  {key}: <not written>"),
                Some(other) => println!("  {key}: {}", preview(&other.to_string(), 120)),
            }
        }
    }

    let events = session.events().all();
    println!("Events ({}):", events.len());
    for event in &events {
        println!("{}", describe_event(event));
    }
    Ok(())
}

/// One line per event: time, author, a text preview and the state keys it wrote.
fn describe_event(event: &Event) -> String {
    let mut line = format!("  {} {}", event.timestamp.format("%Y-%m-%d %H:%M:%S"), event.author);
    if event.is_final_response() {
        line.push_str(" (final)");
    }
    let text = event_text(event);
    if !text.is_empty() {
        line.push_str(&format!(": {}", preview(&text, 80)));
    }
    if !event.actions.state_delta.is_empty() {
        let mut keys = event.actions.state_delta.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        line.push_str(&format!(" -> {}", keys.join(", ")));
    }
    line
}

async fn delete_session(
    session_service: &Arc<dyn SessionService>,
    cfg: &RuntimeConfig,
    session_id: &str,
) -> Result<()> {
    session_service
        .delete(DeleteRequest {
            app_name: cfg.app_name.clone(),
            user_id: cfg.user_id.clone(),
            session_id: session_id.to_string(),
        })
        .await
        .with_context(|| format!("failed to delete session '{session_id}'"))
}

pub async fn run_sessions_delete(
    cfg: &RuntimeConfig,
    session_id_override: Option<String>,
    force: bool,
) -> Result<()> {
    let session_id = session_id_override.unwrap_or_else(|| cfg.session_id.clone());
    if !force {
        return Err(anyhow::anyhow!(
            "refusing to delete session '{session_id}' without --force"
        ));
    }
    let session_service = build_session_service(cfg).await?;
    delete_session(&session_service, cfg, &session_id).await?;
    println!("Deleted session '{session_id}'.");
    Ok(())
}

/// Pipeline runs beyond the `keep` newest of each pipeline.
///
/// `entries` must be newest first. Conversation sessions are never selected.
pub fn select_prunable_runs(
    entries: &[SessionEntry],
    keep: usize,
    only: Option<PipelineKind>,
) -> Vec<String> {
    let mut seen = BTreeMap::<PipelineKind, usize>::new();
    entries
        .iter()
        .filter_map(|entry| {
            let kind = entry.run.as_ref()?.kind;
            if only.is_some_and(|wanted| wanted != kind) {
                return None;
            }
            let count = seen.entry(kind).or_default();
            *count += 1;
            (*count > keep).then(|| entry.id.clone())
        })
        .collect()
}

pub async fn run_sessions_prune(
    cfg: &RuntimeConfig,
    keep: usize,
    only: Option<PipelineKind>,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    let session_service = build_session_service(cfg).await?;
    let entries = load_session_entries(&session_service, cfg).await?;
    let prune_ids = select_prunable_runs(&entries, keep, only);

    if prune_ids.is_empty() {
        println!("No pipeline runs beyond the newest {keep} per pipeline.");
        return Ok(());
    }
    if dry_run {
        println!("Would delete {} pipeline run(s):", prune_ids.len());
        for id in &prune_ids {
            println!("- {id}");
        }
        return Ok(());
    }
    if !force {
        return Err(anyhow::anyhow!(
            "pruning would delete {} pipeline run(s); re-run with --force or preview with --dry-run",
            prune_ids.len()
        ));
    }

    for session_id in &prune_ids {
        delete_session(&session_service, cfg, session_id).await?;
    }
    tracing::info!(deleted = prune_ids.len(), keep, "Pruned pipeline runs");
    println!(
        "Deleted {} pipeline run(s), kept the newest {keep} per pipeline.",
        prune_ids.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_map_to_files_without_query_parameters() {
        assert_eq!(
            sqlite_path_from_url("sqlite://.craftcare/sessions.db?mode=rwc"),
            Some(PathBuf::from(".craftcare/sessions.db"))
        );
        assert_eq!(sqlite_path_from_url("sqlite://:memory:"), None);
        assert_eq!(sqlite_path_from_url("postgres://db/sessions"), None);
    }

    fn entry(id: &str) -> SessionEntry {
        SessionEntry {
            id: id.to_string(),
            updated: "2026-01-01T00:00:00+00:00".to_string(),
            run: parse_pipeline_session_id(id),
            user_query: None,
        }
    }

    #[test]
    fn run_ids_parse_back_even_when_the_base_has_dashes() {
        let run = parse_pipeline_session_id("chat-1-symptomcheckerpipeline-1760000000000-7")
            .expect("pipeline id should parse");
        assert_eq!(run.base, "chat-1");
        assert_eq!(run.kind, PipelineKind::Symptoms);
        assert_eq!(run.started_ms, 1_760_000_000_000);
        assert_eq!(run.seq, 7);

        assert!(parse_pipeline_session_id("default-session").is_none());
        assert!(parse_pipeline_session_id("a-unknownpipeline-1-2").is_none());
        assert!(parse_pipeline_session_id("-marketingagent-1-2").is_none());
    }

    #[test]
    fn prune_keeps_newest_runs_per_pipeline_and_skips_conversations() {
        let entries = [
            entry("s-marketingagent-30-2"),
            entry("s-symptomcheckerpipeline-25-1"),
            entry("default-session"),
            entry("s-marketingagent-20-1"),
            entry("s-marketingagent-10-0"),
        ];

        assert_eq!(
            select_prunable_runs(&entries, 1, None),
            vec!["s-marketingagent-20-1", "s-marketingagent-10-0"]
        );
        assert!(select_prunable_runs(&entries, 1, Some(PipelineKind::Symptoms)).is_empty());
        assert_eq!(select_prunable_runs(&entries, 0, Some(PipelineKind::Symptoms)).len(), 1);
    }

    #[test]
    fn listing_groups_runs_by_pipeline_with_their_query() {
        let mut run = entry("s-symptomcheckerpipeline-25-1");
        run.user_query = Some("Ravi and I cough".to_string());
        let entries = [entry("default-session"), run];

        let listing = render_session_listing(&entries, None);
        assert!(listing.starts_with("Conversation sessions (1):\n- default-session"));
        assert!(listing.contains("SymptomCheckerPipeline runs (1):"));
        assert!(listing.contains("query: \"Ravi and I cough\""));

        let filtered = render_session_listing(&entries, Some(PipelineKind::Marketing));
        assert!(filtered.is_empty());
    }
}

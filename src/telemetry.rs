use std::collections::{BTreeMap, BTreeSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

use crate::config::RuntimeConfig;

/// Event names written to the JSONL log.
pub mod event {
    pub const COMMAND_COMPLETED: &str = "command.completed";
    pub const COMMAND_FAILED: &str = "command.failed";
    pub const MODEL_RESOLVED: &str = "model.resolved";
    pub const TOOL_REQUESTED: &str = "tool.requested";
    pub const TOOL_SUCCEEDED: &str = "tool.succeeded";
    pub const TOOL_FAILED: &str = "tool.failed";
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    pub const PII_REDACTED: &str = "pii.redacted";
    pub const TRIAGE_EMERGENCY: &str = "triage.emergency";
    pub const CHAT_STARTED: &str = "chat.started";
    pub const CHAT_PROVIDER_SWITCHED: &str = "chat.provider_switched";
    pub const CHAT_MODEL_SWITCHED: &str = "chat.model_switched";
}

pub fn unix_ms_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

/// Append-only JSONL event log shared by every component of one CLI run.
///
/// Write failures are logged and swallowed; telemetry never fails a command.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    pub enabled: bool,
    pub path: PathBuf,
    pub run_id: String,
    pub command: String,
    pub session_id: String,
    write_lock: Arc<Mutex<()>>,
}

impl TelemetrySink {
    pub fn new(cfg: &RuntimeConfig, command: impl Into<String>) -> Self {
        Self {
            enabled: cfg.telemetry_enabled,
            path: PathBuf::from(&cfg.telemetry_path),
            run_id: format!("run-{}-{}", unix_ms_now(), std::process::id()),
            command: command.into(),
            session_id: cfg.session_id.clone(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Envelope fields first; `payload` keys are merged in and may not override them.
    fn record(&self, name: &str, payload: Value) -> Value {
        let mut record = Map::new();
        if let Value::Object(extra) = payload {
            record.extend(extra);
        }
        record.insert("ts_unix_ms".to_string(), json!(unix_ms_now()));
        record.insert("event".to_string(), json!(name));
        record.insert("run_id".to_string(), json!(self.run_id));
        record.insert("command".to_string(), json!(self.command));
        record.insert("session_id".to_string(), json!(self.session_id));
        Value::Object(record)
    }

    pub fn emit(&self, name: &str, payload: Value) {
        if !self.enabled {
            return;
        }
        let record = self.record(name, payload);
        if let Err(err) = self.append(&record) {
            tracing::warn!(
                event = name,
                path = %self.path.display(),
                error = %format!("{err:#}"),
                "Telemetry write failed"
            );
        }
    }

    fn append(&self, record: &Value) -> Result<()> {
        let mut line = serde_json::to_string(record).context("failed to encode telemetry event")?;
        line.push('\n');

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| {
                format!("failed to create telemetry directory '{}'", dir.display())
            })?;
        }
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed to append to telemetry log '{}'", self.path.display()))
    }
}

#[derive(Debug, Default)]
pub struct TelemetrySummary {
    pub total_lines: usize,
    pub parsed_events: usize,
    pub parse_errors: usize,
    pub unique_runs: BTreeSet<String>,
    pub command_counts: BTreeMap<String, usize>,
    pub command_completed: usize,
    pub command_failed: usize,
    pub tool_requested: usize,
    pub tool_succeeded: usize,
    pub tool_failed: usize,
    pub pipeline_runs: BTreeMap<String, usize>,
    pub pii_redactions: usize,
    pub emergencies: usize,
    pub last_event_ts_unix_ms: Option<u128>,
}

impl TelemetrySummary {
    fn record(&mut self, record: &Value) {
        self.parsed_events += 1;
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
        };

        if let Some(run_id) = text("run_id") {
            self.unique_runs.insert(run_id.to_string());
        }
        if let Some(command) = text("command") {
            *self.command_counts.entry(command.to_string()).or_default() += 1;
        }
        if let Some(ts) = record.get("ts_unix_ms").and_then(Value::as_u64) {
            self.last_event_ts_unix_ms = self.last_event_ts_unix_ms.max(Some(u128::from(ts)));
        }

        let counter = match text("event").unwrap_or_default() {
            event::COMMAND_COMPLETED => &mut self.command_completed,
            event::COMMAND_FAILED => &mut self.command_failed,
            event::TOOL_REQUESTED => &mut self.tool_requested,
            event::TOOL_SUCCEEDED => &mut self.tool_succeeded,
            event::TOOL_FAILED => &mut self.tool_failed,
            event::PII_REDACTED => &mut self.pii_redactions,
            event::TRIAGE_EMERGENCY => &mut self.emergencies,
            event::PIPELINE_COMPLETED => {
                let pipeline = text("pipeline").unwrap_or("unknown").to_string();
                self.pipeline_runs.entry(pipeline).or_default()
            }
            _ => return,
        };
        *counter += 1;
    }

    /// Human-readable report; commands are ranked by count, ties by name.
    pub fn render(&self, path: &Path) -> String {
        let mut lines = vec![
            format!("Telemetry report for {}", path.display()),
            format!(
                "Events: {} analyzed of {} lines ({} unreadable), {} runs",
                self.parsed_events,
                self.total_lines,
                self.parse_errors,
                self.unique_runs.len()
            ),
            format!(
                "Commands: completed={} failed={}",
                self.command_completed, self.command_failed
            ),
            format!(
                "Tools: requested={} succeeded={} failed={}",
                self.tool_requested, self.tool_succeeded, self.tool_failed
            ),
            format!(
                "Safety: pii_redactions={} emergencies={}",
                self.pii_redactions, self.emergencies
            ),
        ];
        for (pipeline, runs) in &self.pipeline_runs {
            lines.push(format!("Pipeline {pipeline}: {runs} run(s)"));
        }

        let mut commands = self.command_counts.iter().collect::<Vec<_>>();
        commands.sort_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        });
        for (name, count) in commands.into_iter().take(5) {
            lines.push(format!("Command {name}: {count}"));
        }
        if let Some(ts) = self.last_event_ts_unix_ms {
            lines.push(format!("Last event at unix ms {ts}"));
        }
        lines.join("\n")
    }
}

/// Summarizes the newest `limit` lines (at least one).
pub fn summarize_telemetry_lines(lines: Vec<String>, limit: usize) -> TelemetrySummary {
    let mut summary = TelemetrySummary {
        total_lines: lines.len(),
        ..TelemetrySummary::default()
    };

    let newest = lines
        .iter()
        .rev()
        .take(limit.max(1))
        .map(|line| line.trim())
        .filter(|line| !line.is_empty());
    for line in newest {
        match serde_json::from_str::<Value>(line) {
            Ok(record) => summary.record(&record),
            Err(_) => summary.parse_errors += 1,
        }
    }

    summary
}

pub fn run_telemetry_report(
    cfg: &RuntimeConfig,
    path_override: Option<String>,
    limit: usize,
) -> Result<()> {
    let path = PathBuf::from(path_override.unwrap_or_else(|| cfg.telemetry_path.clone()));
    if !path.exists() {
        println!("No telemetry recorded yet at '{}'.", path.display());
        return Ok(());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read telemetry file '{}'", path.display()))?;
    let lines = content.lines().map(str::to_string).collect();
    println!("{}", summarize_telemetry_lines(lines, limit).render(&path));
    Ok(())
}

use std::fmt;

/// Coarse failure classes shown to the user as `[CODE] message` plus a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Session,
    Pipeline,
    Input,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Provider => "PROVIDER",
            ErrorCategory::Session => "SESSION",
            ErrorCategory::Pipeline => "PIPELINE",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Provider => {
                "Export a provider key (GOOGLE_API_KEY, OPENAI_API_KEY, ...) or pass --provider ollama; `craftcare doctor` lists what it found."
            }
            ErrorCategory::Session => {
                "Check --session-backend and --session-db-url; sqlite stores need `craftcare migrate`."
            }
            ErrorCategory::Pipeline => {
                "An agent stage or tool failed. Re-run with RUST_LOG=craftcare=debug to see each pipeline event."
            }
            ErrorCategory::Input => {
                "Check the command arguments (`craftcare <command> --help`) and the active profile."
            }
            ErrorCategory::Internal => "Re-run with RUST_LOG=debug and keep the log if it repeats.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// First matching row wins, so input mistakes that mention a session or
/// profile are reported as input.
const CATEGORY_MARKERS: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::Provider, &["api_key", "provider"]),
    (
        ErrorCategory::Input,
        &[
            "--force",
            "query cannot be empty",
            "is required",
            "invalid value",
            "failed to read input",
            "profile",
        ],
    ),
    (ErrorCategory::Session, &["session", "sqlite", "migrat"]),
    (
        ErrorCategory::Pipeline,
        &["pipeline", "agent", "tool", "schema"],
    ),
];

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    let msg = format!("{err:#}").to_ascii_lowercase();
    CATEGORY_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| msg.contains(marker)))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Internal)
}

pub fn format_cli_error(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let category = categorize_error(err);
    format!(
        "[{category}] {}\nHint: {}",
        render_error_message(err, show_sensitive_config),
        category.hint()
    )
}

pub fn render_error_message(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let message = format!("{err:#}");
    if show_sensitive_config {
        return message;
    }
    redact_sqlite_urls(&message)
}

fn ends_url(ch: char) -> bool {
    ch.is_whitespace() || "\"'()[]{},;".contains(ch)
}

/// Replaces the location part of every `sqlite:` URL in `text`.
pub fn redact_sqlite_urls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("sqlite:") {
        let (before, url) = rest.split_at(start);
        out.push_str(before);
        let end = url.find(ends_url).unwrap_or(url.len());
        out.push_str(redacted_sqlite_url(&url[..end]));
        rest = &url[end..];
    }
    out.push_str(rest);
    out
}

fn redacted_sqlite_url(url: &str) -> &'static str {
    if url.starts_with("sqlite://") {
        "sqlite://[REDACTED]"
    } else {
        "sqlite:[REDACTED]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_stops_at_quotes_and_keeps_surrounding_text() {
        let text = "cannot open 'sqlite://data/s.db?mode=rwc', fallback sqlite::memory: failed";
        assert_eq!(
            redact_sqlite_urls(text),
            "cannot open 'sqlite://[REDACTED]', fallback sqlite:[REDACTED] failed"
        );
    }

    #[test]
    fn input_markers_win_over_session_markers() {
        let err = anyhow::anyhow!("session delete is destructive. Re-run with --force");
        assert_eq!(categorize_error(&err), ErrorCategory::Input);
    }

    #[test]
    fn unmatched_messages_are_internal() {
        let err = anyhow::anyhow!("something odd happened");
        assert_eq!(categorize_error(&err), ErrorCategory::Internal);
        assert!(format_cli_error(&err, false).starts_with("[INTERNAL] something odd happened"));
    }
}

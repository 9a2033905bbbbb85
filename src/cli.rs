use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Auto,
    Gemini,
    Openai,
    Anthropic,
    Deepseek,
    Groq,
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Sqlite,
}

/// Which agent configuration drives an interactive chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Assistant {
    Artisan,
    Symptoms,
}

impl Assistant {
    pub fn label(self) -> &'static str {
        match self {
            Assistant::Artisan => "artisan",
            Assistant::Symptoms => "symptoms",
        }
    }
}

/// Pipeline families whose runs are stored as sessions of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum PipelineKind {
    Marketing,
    Symptoms,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 2] = [PipelineKind::Marketing, PipelineKind::Symptoms];

    pub fn agent_name(self) -> &'static str {
        match self {
            PipelineKind::Marketing => crate::agents::marketing::PIPELINE_NAME,
            PipelineKind::Symptoms => crate::agents::symptom::PIPELINE_NAME,
        }
    }

    /// State keys the pipeline's stages write, in stage order.
    pub fn output_keys(self) -> &'static [&'static str] {
        use crate::agents::{marketing, symptom};
        match self {
            PipelineKind::Marketing => &[
                marketing::PRODUCT_DATA_KEY,
                marketing::VIDEO_AD_KEY,
                marketing::SOCIAL_POST_KEY,
            ],
            PipelineKind::Symptoms => &[
                symptom::SYMPTOM_DATA_KEY,
                symptom::DIAGNOSIS_KEY,
                symptom::DRUG_ALERT_KEY,
                symptom::FINAL_RESPONSE_KEY,
            ],
        }
    }

    pub fn from_agent_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.agent_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List configured profiles and highlight the active profile")]
    List,
    #[command(about = "Show the active profile's resolved runtime settings")]
    Show,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommands {
    #[command(about = "List conversation sessions and pipeline runs for the current app/user")]
    List {
        #[arg(long, value_enum)]
        pipeline: Option<PipelineKind>,
    },
    #[command(about = "Show a session: seeded query, stage outputs and recent events")]
    Show {
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, default_value_t = 20)]
        recent: usize,
    },
    #[command(about = "Delete a session (requires --force)")]
    Delete {
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    #[command(
        about = "Delete old pipeline runs, keeping N most recent per pipeline (requires --force unless --dry-run)"
    )]
    Prune {
        #[arg(long, default_value_t = 20)]
        keep: usize,
        #[arg(long, value_enum)]
        pipeline: Option<PipelineKind>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TelemetryCommands {
    #[command(about = "Summarize telemetry events from a JSONL stream")]
    Report {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 5000)]
        limit: usize,
    },
}

const CLI_EXAMPLES: &str = "Examples:\n\
  craftcare ask \"Write a video ad for my hand-painted Kalamkari dupatta\"\n\
  craftcare market \"My blue pottery vases are handmade with natural dyes, rustic tone\"\n\
  craftcare symptoms \"I have had a sore throat and mild fever for two days\"\n\
  craftcare --provider openai --model gpt-4.1 chat --assistant symptoms\n\
  craftcare --session-backend sqlite --session-db-url sqlite://.craftcare/sessions.db sessions list --pipeline symptoms\n\
  craftcare --session-backend sqlite sessions prune --keep 5 --dry-run\n\
  craftcare telemetry report --limit 2000\n\
\n\
Switching behavior:\n\
  - Use --profile <name> to load settings from .craftcare/config.toml.\n\
  - Use --provider/--model to switch runtime model selection per invocation.\n\
  - In chat, use /help for command discovery and /status, /exit.";

#[derive(Debug, Parser)]
#[command(name = "craftcare")]
#[command(about = "Artisan marketing assistant and symptom checker built on ADK-Rust")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(long, env = "CRAFTCARE_PROVIDER", value_enum, default_value_t = Provider::Auto)]
    pub provider: Provider,

    #[arg(long, env = "CRAFTCARE_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "CRAFTCARE_PROFILE", default_value = "default")]
    pub profile: String,

    #[arg(long, env = "CRAFTCARE_CONFIG", default_value = ".craftcare/config.toml")]
    pub config_path: String,

    #[arg(long, env = "CRAFTCARE_APP_NAME")]
    pub app_name: Option<String>,

    #[arg(long, env = "CRAFTCARE_USER_ID")]
    pub user_id: Option<String>,

    #[arg(long, env = "CRAFTCARE_SESSION_ID")]
    pub session_id: Option<String>,

    #[arg(long, env = "CRAFTCARE_SESSION_BACKEND", value_enum)]
    pub session_backend: Option<SessionBackend>,

    #[arg(long, env = "CRAFTCARE_SESSION_DB_URL")]
    pub session_db_url: Option<String>,

    #[arg(long, env = "CRAFTCARE_SHOW_SENSITIVE_CONFIG", default_value_t = false)]
    pub show_sensitive_config: bool,

    #[arg(long, env = "CRAFTCARE_TELEMETRY_ENABLED", action = clap::ArgAction::Set)]
    pub telemetry_enabled: Option<bool>,

    #[arg(long, env = "CRAFTCARE_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    #[arg(long, env = "CRAFTCARE_PII_PHRASE")]
    pub pii_phrase: Vec<String>,

    #[arg(long, env = "CRAFTCARE_REVIEW_REQUIRED", action = clap::ArgAction::Set)]
    pub review_required: Option<bool>,

    #[arg(long, env = "RUST_LOG", default_value = "error")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Ask the artisan orchestrator and print its final response")]
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },
    #[command(about = "Run the marketing pipeline (product data, video ad, social post)")]
    Market {
        #[arg(required = true)]
        query: Vec<String>,
    },
    #[command(about = "Run the symptom checker pipeline for a description of symptoms")]
    Symptoms {
        #[arg(required = true)]
        query: Vec<String>,
    },
    #[command(about = "Run interactive chat mode")]
    Chat {
        #[arg(long, value_enum, default_value_t = Assistant::Artisan)]
        assistant: Assistant,
    },
    #[command(about = "Validate provider environment and session backend configuration")]
    Doctor,
    #[command(about = "Run session backend migrations (sqlite only)")]
    Migrate,
    #[command(about = "Inspect profile configuration and active resolved profile state")]
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    #[command(about = "Manage session lifecycle (list/show/delete/prune)")]
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    #[command(about = "Telemetry utilities and reporting")]
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
}

pub fn command_label(command: &Commands) -> String {
    match command {
        Commands::Ask { .. } => "ask".to_string(),
        Commands::Market { .. } => "market".to_string(),
        Commands::Symptoms { .. } => "symptoms".to_string(),
        Commands::Chat { assistant } => format!("chat.{}", assistant.label()),
        Commands::Doctor => "doctor".to_string(),
        Commands::Migrate => "migrate".to_string(),
        Commands::Profiles { command } => match command {
            ProfileCommands::List => "profiles.list".to_string(),
            ProfileCommands::Show => "profiles.show".to_string(),
        },
        Commands::Sessions { command } => match command {
            SessionCommands::List { .. } => "sessions.list".to_string(),
            SessionCommands::Show { .. } => "sessions.show".to_string(),
            SessionCommands::Delete { .. } => "sessions.delete".to_string(),
            SessionCommands::Prune { .. } => "sessions.prune".to_string(),
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { .. } => "telemetry.report".to_string(),
        },
    }
}

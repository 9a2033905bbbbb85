use std::io::{self, Write};
use std::sync::Arc;

use adk_rust::prelude::*;
use adk_session::SessionService;
use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::{Assistant, Provider};
use crate::config::RuntimeConfig;
use crate::error::format_cli_error;
use crate::pipeline::{PipelineTarget, run_symptom_check};
use crate::provider::parse_provider_name;
use crate::runner::{build_orchestrator_runner, resolve_model_with_telemetry};
use crate::session::build_session_service;
use crate::streaming::run_prompt;
use crate::telemetry::{TelemetrySink, event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Exit,
    Status,
    Help,
    Provider(String),
    Model(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedChatCommand {
    NotACommand,
    Command(ChatCommand),
    MissingArgument { usage: &'static str },
    UnknownCommand(String),
}

const PROVIDER_USAGE: &str = "/provider <auto|gemini|openai|anthropic|deepseek|groq|ollama>";
const MODEL_USAGE: &str = "/model <model-id>";

/// Slash commands are case-insensitive; a bare `exit` also ends the chat.
pub fn parse_chat_command(input: &str) -> ParsedChatCommand {
    let line = input.trim();
    if line.eq_ignore_ascii_case("exit") {
        return ParsedChatCommand::Command(ChatCommand::Exit);
    }
    let Some(body) = line.strip_prefix('/') else {
        return ParsedChatCommand::NotACommand;
    };

    let (name, arg) = match body.trim_start_matches('/').split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (body.trim_start_matches('/'), ""),
    };
    let with_arg = |usage: &'static str, build: fn(String) -> ChatCommand| {
        if arg.is_empty() {
            ParsedChatCommand::MissingArgument { usage }
        } else {
            ParsedChatCommand::Command(build(arg.to_string()))
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ParsedChatCommand::Command(ChatCommand::Exit),
        "status" => ParsedChatCommand::Command(ChatCommand::Status),
        "help" => ParsedChatCommand::Command(ChatCommand::Help),
        "provider" => with_arg(PROVIDER_USAGE, ChatCommand::Provider),
        "model" => with_arg(MODEL_USAGE, ChatCommand::Model),
        other => ParsedChatCommand::UnknownCommand(format!("/{other}")),
    }
}

pub fn print_chat_help(assistant: Assistant) {
    println!("Chat commands:");
    for (usage, effect) in [
        ("/help", "this list"),
        ("/status", "profile, provider, model and session in use"),
        (PROVIDER_USAGE, "switch provider and rebuild the assistant"),
        (MODEL_USAGE, "switch model on the current provider"),
        ("/exit", "leave the chat (also /quit or exit)"),
    ] {
        println!("  {usage:<28} {effect}");
    }
    match assistant {
        Assistant::Artisan => {
            println!("Describe your craft product and ask for a video ad or social post.")
        }
        Assistant::Symptoms => println!(
            "Describe your symptoms, how long you have had them, and any medications you take."
        ),
    }
}

/// Live state of one interactive chat.
///
/// The artisan assistant keeps a runner on the configured session so the
/// orchestrator sees the whole conversation. The symptom assistant runs one
/// pipeline per turn, each in a fresh seeded session.
pub struct ChatState {
    pub cfg: RuntimeConfig,
    pub assistant: Assistant,
    pub model: Arc<dyn Llm>,
    pub provider: Provider,
    pub model_name: String,
    session_service: Arc<dyn SessionService>,
    runner: Option<Runner>,
}

impl ChatState {
    pub async fn start(
        cfg: RuntimeConfig,
        assistant: Assistant,
        session_service: Arc<dyn SessionService>,
        telemetry: &TelemetrySink,
    ) -> Result<Self> {
        let path = format!("chat.{}", assistant.label());
        let (model, provider, model_name) = resolve_model_with_telemetry(&cfg, telemetry, &path)?;
        let mut state = Self {
            cfg,
            assistant,
            model,
            provider,
            model_name,
            session_service,
            runner: None,
        };
        state.rebuild_runner(telemetry).await?;
        state.cfg.provider = state.provider;
        state.cfg.model = Some(state.model_name.clone());
        Ok(state)
    }

    async fn rebuild_runner(&mut self, telemetry: &TelemetrySink) -> Result<()> {
        self.runner = match self.assistant {
            Assistant::Artisan => Some(
                build_orchestrator_runner(
                    &self.cfg,
                    self.model.clone(),
                    self.session_service.clone(),
                    telemetry,
                )
                .await?,
            ),
            Assistant::Symptoms => None,
        };
        Ok(())
    }

    /// Re-resolves the model for `next`, keeping the old one if that fails.
    pub async fn switch_model(
        &mut self,
        next: RuntimeConfig,
        telemetry: &TelemetrySink,
        event_name: &str,
    ) -> Result<()> {
        let path = format!("chat.{}", self.assistant.label());
        let (model, provider, model_name) = resolve_model_with_telemetry(&next, telemetry, &path)?;
        let previous_cfg = std::mem::replace(&mut self.cfg, next);
        let previous_model = std::mem::replace(&mut self.model, model);
        if let Err(err) = self.rebuild_runner(telemetry).await {
            self.cfg = previous_cfg;
            self.model = previous_model;
            return Err(err);
        }
        self.provider = provider;
        self.model_name = model_name;
        self.cfg.provider = provider;
        self.cfg.model = Some(self.model_name.clone());
        telemetry.emit(
            event_name,
            json!({
                "provider": format!("{:?}", provider).to_ascii_lowercase(),
                "model": self.model_name.clone()
            }),
        );
        tracing::info!(provider = ?provider, model = %self.model_name, "Switched chat model");
        Ok(())
    }

    pub async fn respond(&self, input: &str, telemetry: &TelemetrySink) -> Result<String> {
        match &self.runner {
            Some(runner) => run_prompt(runner, &self.cfg, input, telemetry).await,
            None => {
                let target = PipelineTarget {
                    app_name: self.cfg.app_name.clone(),
                    user_id: self.cfg.user_id.clone(),
                    session_base: self.cfg.session_id.clone(),
                };
                let report = run_symptom_check(
                    self.model.clone(),
                    self.session_service.clone(),
                    &target,
                    input,
                    &self.cfg.pii_phrases,
                    telemetry,
                )
                .await?;
                Ok(report.render())
            }
        }
    }
}

pub enum ChatCommandAction {
    Continue,
    Exit,
}

pub async fn dispatch_chat_command(
    command: ChatCommand,
    state: &mut ChatState,
    telemetry: &TelemetrySink,
) -> Result<ChatCommandAction> {
    match command {
        ChatCommand::Exit => return Ok(ChatCommandAction::Exit),
        ChatCommand::Status => println!(
            "assistant={} profile={} provider={:?} model={} session_id={}",
            state.assistant.label(),
            state.cfg.profile,
            state.provider,
            state.model_name,
            state.cfg.session_id
        ),
        ChatCommand::Help => print_chat_help(state.assistant),
        ChatCommand::Provider(name) => {
            let mut next = state.cfg.clone();
            next.provider = parse_provider_name(&name)?;
            next.model = None;
            match state
                .switch_model(next, telemetry, event::CHAT_PROVIDER_SWITCHED)
                .await
            {
                Ok(()) => println!(
                    "Switched provider to {:?} (model={}).",
                    state.provider, state.model_name
                ),
                Err(err) => {
                    eprintln!("{}", format_cli_error(&err, state.cfg.show_sensitive_config));
                    println!(
                        "Provider remains {:?} (model={}).",
                        state.provider, state.model_name
                    );
                }
            }
        }
        ChatCommand::Model(model) => {
            let mut next = state.cfg.clone();
            next.model = Some(model);
            match state
                .switch_model(next, telemetry, event::CHAT_MODEL_SWITCHED)
                .await
            {
                Ok(()) => println!(
                    "Switched model to '{}' on provider {:?}.",
                    state.model_name, state.provider
                ),
                Err(err) => {
                    eprintln!("{}", format_cli_error(&err, state.cfg.show_sensitive_config));
                    println!(
                        "Model remains '{}' on provider {:?}.",
                        state.model_name, state.provider
                    );
                }
            }
        }
    }
    Ok(ChatCommandAction::Continue)
}

pub async fn run_chat(
    cfg: RuntimeConfig,
    assistant: Assistant,
    telemetry: &TelemetrySink,
) -> Result<()> {
    let session_service = build_session_service(&cfg).await?;
    let mut state = ChatState::start(cfg, assistant, session_service, telemetry).await?;

    telemetry.emit(
        event::CHAT_STARTED,
        json!({
            "assistant": assistant.label(),
            "provider": format!("{:?}", state.provider).to_ascii_lowercase(),
            "model": state.model_name.clone(),
            "profile": state.cfg.profile.clone()
        }),
    );
    println!(
        "Interactive {} mode started. Type /help for commands or /exit to quit.",
        assistant.label()
    );

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{}> ", assistant.label());
        io::stdout().flush().context("failed to flush stdout")?;
        line.clear();
        let read = stdin
            .read_line(&mut line)
            .context("failed to read input from stdin")?;
        if read == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse_chat_command(input) {
            ParsedChatCommand::NotACommand => {}
            ParsedChatCommand::MissingArgument { usage } => {
                println!("Usage: {usage}");
                continue;
            }
            ParsedChatCommand::UnknownCommand(command) => {
                println!("Unknown command '{command}'. Use /help.");
                continue;
            }
            ParsedChatCommand::Command(command) => {
                let action = dispatch_chat_command(command, &mut state, telemetry).await?;
                if matches!(action, ChatCommandAction::Exit) {
                    break;
                }
                continue;
            }
        }

        match state.respond(input, telemetry).await {
            Ok(answer) => println!("{answer}"),
            Err(err) => eprintln!("{}", format_cli_error(&err, state.cfg.show_sensitive_config)),
        }
    }

    Ok(())
}

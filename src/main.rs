use anyhow::Result;
use clap::{CommandFactory, Parser};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use craftcare::chat::run_chat;
use craftcare::cli::{
    Cli, Commands, ProfileCommands, SessionCommands, TelemetryCommands, command_label,
};
use craftcare::config::{ProfilesFile, RuntimeConfig, load_profiles, resolve_runtime_config};
use craftcare::doctor::{run_doctor, run_migrate};
use craftcare::error::{categorize_error, format_cli_error};
use craftcare::pipeline::{run_marketing, run_symptom_check};
use craftcare::profiles::{run_profiles_list, run_profiles_show};
use craftcare::runner::{build_orchestrator_runner, resolve_model_with_telemetry};
use craftcare::session::{
    build_session_service, run_sessions_delete, run_sessions_list, run_sessions_prune,
    run_sessions_show,
};
use craftcare::streaming::run_prompt;
use craftcare::telemetry::{TelemetrySink, event, run_telemetry_report};
use craftcare::tools::marketing::MarketingToolSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let show_sensitive = cli.show_sensitive_config;
    if let Err(err) = run_cli(cli).await {
        eprintln!("{}", format_cli_error(&err, show_sensitive));
        tracing::error!(category = %categorize_error(&err), error = %err, "command failed");
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(log_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

async fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_filter)?;
    let profiles = load_profiles(&cli.config_path)?;
    let cfg = resolve_runtime_config(&cli, &profiles)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let label = command_label(&command);
    let telemetry = TelemetrySink::new(&cfg, label.clone());
    let started = std::time::Instant::now();

    let result = dispatch(command, &cfg, &profiles, &telemetry).await;
    let elapsed_ms = started.elapsed().as_millis();
    match &result {
        Ok(()) => telemetry.emit(event::COMMAND_COMPLETED, json!({ "elapsed_ms": elapsed_ms })),
        Err(err) => telemetry.emit(
            event::COMMAND_FAILED,
            json!({
                "elapsed_ms": elapsed_ms,
                "category": categorize_error(err).code(),
                "error": format_cli_error(err, false),
            }),
        ),
    }
    result
}

async fn dispatch(
    command: Commands,
    cfg: &RuntimeConfig,
    profiles: &ProfilesFile,
    telemetry: &TelemetrySink,
) -> Result<()> {
    match command {
        Commands::Ask { query } => {
            let (model, _, _) = resolve_model_with_telemetry(cfg, telemetry, "ask")?;
            let session_service = build_session_service(cfg).await?;
            let runner = build_orchestrator_runner(cfg, model, session_service, telemetry).await?;
            let answer = run_prompt(&runner, cfg, &query.join(" "), telemetry).await?;
            println!("{answer}");
        }
        Commands::Market { query } => {
            let (model, _, _) = resolve_model_with_telemetry(cfg, telemetry, "market")?;
            let session_service = build_session_service(cfg).await?;
            let settings = MarketingToolSettings::from_config(cfg);
            let report = run_marketing(
                model,
                session_service,
                &settings.target,
                &query.join(" "),
                settings.review_required,
                telemetry,
            )
            .await?;
            println!("{}", report.render());
        }
        Commands::Symptoms { query } => {
            let (model, _, _) = resolve_model_with_telemetry(cfg, telemetry, "symptoms")?;
            let session_service = build_session_service(cfg).await?;
            let target = MarketingToolSettings::from_config(cfg).target;
            let report = run_symptom_check(
                model,
                session_service,
                &target,
                &query.join(" "),
                &cfg.pii_phrases,
                telemetry,
            )
            .await?;
            println!("{}", report.render());
        }
        Commands::Chat { assistant } => run_chat(cfg.clone(), assistant, telemetry).await?,
        Commands::Doctor => run_doctor(cfg).await?,
        Commands::Migrate => run_migrate(cfg).await?,
        Commands::Profiles { command } => match command {
            ProfileCommands::List => run_profiles_list(profiles, cfg)?,
            ProfileCommands::Show => run_profiles_show(cfg)?,
        },
        Commands::Sessions { command } => match command {
            SessionCommands::List { pipeline } => run_sessions_list(cfg, pipeline).await?,
            SessionCommands::Show { session_id, recent } => {
                run_sessions_show(cfg, session_id, recent).await?
            }
            SessionCommands::Delete { session_id, force } => {
                run_sessions_delete(cfg, session_id, force).await?
            }
            SessionCommands::Prune {
                keep,
                pipeline,
                dry_run,
                force,
            } => run_sessions_prune(cfg, keep, pipeline, dry_run, force).await?,
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { path, limit } => {
                run_telemetry_report(cfg, path, limit)?
            }
        },
    }

    Ok(())
}

//! cursor-extend - plan-and-execute codebase analysis
//!
//! A CLI tool that turns a question about a codebase into a plan, executes
//! the plan one step at a time with a tool-calling model, and replans after
//! every step until the model produces a final answer.
//!
//! Exit codes:
//!   0 - Success, or the analysis was interrupted by the user
//!   1 - Any other failure (credentials, config, model, tool, step ceiling)

mod agent;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
#[cfg(test)]
mod test_support;
mod workflow;

use agent::AgentContext;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, Credentials, CONFIG_FILE_NAME};
use error::AgentError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Phase, ReportMetadata, SessionReport};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::Cancellation;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("cursor-extend v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(()) => Ok(()),
        Err(e) if is_interrupt(&e) => {
            warn!("Analysis interrupted by user");
            eprintln!("\nAnalysis interrupted by user");
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cursor-extend.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, limits, search and workspace scanning.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AgentError>(), Some(AgentError::Cancelled))
}

/// Run one analysis session for the query on the command line.
async fn run_analysis(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    // Credentials are checked before any client is built
    let credentials = Credentials::from_env()?;

    let workspace = args
        .path
        .canonicalize()
        .with_context(|| format!("Failed to resolve workspace: {}", args.path.display()))?;

    let context = AgentContext::build(&config, &credentials, workspace.clone())?;

    if !args.quiet {
        println!("🤖 Starting analysis...");
        println!("   Model: {}", config.model.name);
        println!("   Workspace: {}", workspace.display());
        println!("   Max steps: {}\n", config.agent.max_steps);
    }

    let cancellation = Cancellation::new();
    spawn_interrupt_handler(cancellation.clone());

    let controller = context.controller(cancellation);
    let spinner = create_spinner(args.quiet);
    spinner.set_message(phase_message(Phase::Planning));

    let mut transitions = 0;
    let result = controller
        .run_with(args.query(), |event| {
            transitions = event.transition;
            if !args.quiet {
                spinner.suspend(|| println!("{}\n", event));
            }
            spinner.set_message(phase_message(event.update.next_phase()));
        })
        .await;
    spinner.finish_and_clear();

    let state = result?;
    let response = state
        .response
        .clone()
        .ok_or_else(|| AgentError::invalid_state("session ended without a response"))?;

    println!("{}", response);

    if let Some(ref output_path) = args.output {
        let report = SessionReport::new(
            ReportMetadata {
                objective: state.objective.clone(),
                workspace: workspace.display().to_string(),
                analysis_date: Utc::now(),
                model_used: context.model.model_name().to_string(),
                steps_executed: state.past_steps.len(),
                transitions,
                duration_seconds: start_time.elapsed().as_secs_f64(),
            },
            state,
        );

        let content = match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        };
        report::write_report(&content, output_path)?;

        info!("Report saved to {}", output_path.display());
    }

    Ok(())
}

/// Ctrl-C cancels the running session; a second Ctrl-C exits at once.
fn spawn_interrupt_handler(cancellation: Cancellation) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !request_cancel(&cancellation) {
                eprintln!("\nAnalysis interrupted by user");
                std::process::exit(0);
            }
        }
    });
}

/// Cancel the session. Returns `false` if it was already cancelled.
fn request_cancel(cancellation: &Cancellation) -> bool {
    if cancellation.is_cancelled() {
        return false;
    }

    warn!("Interrupt received, cancelling the analysis");
    cancellation.cancel();
    true
}

fn create_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::Planning => "Planning...",
        Phase::Executing => "Executing step...",
        Phase::Replanning => "Replanning...",
        Phase::Terminated => "Done",
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

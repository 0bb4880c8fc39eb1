//! Agri Advisor CLI
//!
//! Main entry point for the agri command-line tool.
//! Answers agriculture questions grounded in a local corpus and builds the
//! offline index the answers are retrieved from.

mod commands;

use agri_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppError, AppResult,
};
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IndexCommand};
use std::path::PathBuf;

/// Agri Advisor CLI - grounded answers for agriculture questions
#[derive(Parser, Debug)]
#[command(name = "agri")]
#[command(about = "Grounded answers for agriculture questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "AGRI_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "AGRI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log line format (pretty, json)
    #[arg(long, global = true, env = "AGRI_LOG_FORMAT")]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider for answer synthesis (ollama, gemini)
    #[arg(short, long, global = true, env = "AGRI_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "AGRI_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single question
    Ask(AskCommand),

    /// Interactive question-and-answer session
    Chat(ChatCommand),

    /// Build or inspect the offline index
    Index(IndexCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    let log_format = match config.log_format.as_deref() {
        Some(name) => LogFormat::parse(name)
            .ok_or_else(|| AppError::Config(format!("Unknown log format: {}", name)))?,
        None => LogFormat::default(),
    };

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Agri Advisor CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_agri_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Index(_) => "index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

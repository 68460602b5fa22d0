//! Connector Builder - chat assistant for declarative connector manifests
//!
//! CLI entry point for the interactive chat and the listing commands.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use connector_builder::cli::{Cli, Command, OutputFormat};
use connector_builder::config::Config;
use connector_builder::domain::{ProgressView, TaskList};
use connector_builder::repl;
use connector_builder::tools::ToolExecutor;

fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("connector-builder")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("connector-builder.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, backend = config.backend.enabled, "Connector builder loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command.unwrap_or_default() {
        Command::Chat { demo, autonomous } => {
            debug!(demo, autonomous, "main: matched Chat command");
            repl::run_interactive(&config, demo, autonomous).await
        }
        Command::Tasks { format } => {
            debug!(?format, "main: matched Tasks command");
            cmd_tasks(format)
        }
        Command::Tools => {
            debug!("main: matched Tools command");
            cmd_tools()
        }
    }
}

/// Print the task list a new session starts with
fn cmd_tasks(format: OutputFormat) -> Result<()> {
    let list = TaskList::new_connector_build();
    let view = ProgressView::from_task_list(Some(&list));
    match format {
        OutputFormat::Text => print!("{}", view),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

/// Print the built-in tool definitions
fn cmd_tools() -> Result<()> {
    let executor = ToolExecutor::builtins();
    for def in executor.definitions() {
        let summary = def.description.lines().next().unwrap_or_default();
        println!("  {:28} {}", def.name.yellow(), summary);
    }
    Ok(())
}

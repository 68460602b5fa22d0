//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Connector Builder - chat assistant for declarative connector manifests
#[derive(Debug, Parser)]
#[command(
    name = "cb",
    about = "Build declarative data connectors with an LLM assistant",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (default: chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Interactive chat session
    Chat {
        /// Start with the JSONPlaceholder demo request
        #[arg(long)]
        demo: bool,

        /// Keep taking turns until the agent reports completion or failure
        #[arg(long)]
        autonomous: bool,
    },

    /// Show the initial task list
    Tasks {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the built-in tools offered to the agent
    Tools,
}

impl Default for Command {
    fn default() -> Self {
        Self::Chat {
            demo: false,
            autonomous: false,
        }
    }
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Location of the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("connector-builder")
        .join("logs")
        .join("connector-builder.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_chat() {
        let cli = Cli::parse_from(["cb"]);
        assert!(cli.command.is_none());
        assert!(matches!(
            Command::default(),
            Command::Chat {
                demo: false,
                autonomous: false
            }
        ));
    }

    #[test]
    fn test_chat_flags() {
        let cli = Cli::parse_from(["cb", "--log-level", "debug", "chat", "--demo", "--autonomous"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Some(Command::Chat {
                demo: true,
                autonomous: true
            })
        ));
    }

    #[test]
    fn test_tasks_format() {
        let cli = Cli::parse_from(["cb", "tasks", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Some(Command::Tasks {
                format: OutputFormat::Json
            })
        ));
        assert!(Cli::try_parse_from(["cb", "tasks", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("connector-builder/logs/connector-builder.log"));
    }
}

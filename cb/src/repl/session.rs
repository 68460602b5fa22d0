//! REPL session management

use std::io::{self, Write};
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::agent::TurnEvent;
use crate::chat::{AutonomousStop, CONTINUE_PROMPT, ChatSession, TurnOutcome, WELCOME_MESSAGE};
use crate::domain::manifest;
use crate::session::FormField;

/// Result of handling a slash command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashResult {
    Continue,
    Quit,
}

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Pause,
    Tasks,
    Manifest,
    Field { field: FormField, value: String },
    /// `None` clears the session key and falls back to the environment
    Key(Option<String>),
    Reset,
    Continue,
}

impl SlashCommand {
    /// Parse a line starting with `/`; the error is the message to show
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.trim().splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or_default();
        let rest = parts.next().map(str::trim).unwrap_or_default();

        match cmd {
            "/help" | "/h" => Ok(Self::Help),
            "/quit" | "/q" | "/exit" => Ok(Self::Quit),
            "/pause" => Ok(Self::Pause),
            "/tasks" => Ok(Self::Tasks),
            "/manifest" => Ok(Self::Manifest),
            "/field" => {
                let mut args = rest.splitn(2, char::is_whitespace);
                let name = args.next().unwrap_or_default();
                if name.is_empty() {
                    return Err(format!("Usage: /field NAME VALUE (fields: {})", FormField::valid_names()));
                }
                let field = name
                    .parse::<FormField>()
                    .map_err(|_| format!("Unknown field '{}'. Valid fields: {}", name, FormField::valid_names()))?;
                let value = args.next().map(str::trim).unwrap_or_default().to_string();
                Ok(Self::Field { field, value })
            }
            "/key" => Ok(Self::Key((!rest.is_empty()).then(|| rest.to_string()))),
            "/reset" => Ok(Self::Reset),
            "/continue" | "/c" => Ok(Self::Continue),
            _ => Err(format!("Unknown command: {}", cmd)),
        }
    }
}

/// Interactive REPL over a chat session
pub struct ReplSession {
    chat: Arc<ChatSession>,
    autonomous: bool,
}

impl ReplSession {
    pub fn new(chat: Arc<ChatSession>, autonomous: bool) -> Self {
        Self { chat, autonomous }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial: Option<String>) -> Result<()> {
        self.print_welcome();

        if let Some(prompt) = initial {
            println!("{} {}", ">".bright_green(), prompt);
            self.process_user_input(&prompt).await;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            match rl.readline(&format!("{} ", ">".bright_green())) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Connector Builder".bright_cyan().bold());
        if self.autonomous {
            println!("{}", "Autonomous mode: the agent keeps going until it finishes or fails.".dimmed());
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
        println!("{}", WELCOME_MESSAGE.bright_blue());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let command = match SlashCommand::parse(input) {
            Ok(command) => command,
            Err(message) => {
                println!("{} {}", "?".yellow(), message);
                println!("Type {} for available commands", "/help".yellow());
                return SlashResult::Continue;
            }
        };
        debug!(?command, "ReplSession::handle_slash_command: called");

        match command {
            SlashCommand::Help => self.print_help(),
            SlashCommand::Quit => return SlashResult::Quit,
            SlashCommand::Pause => {
                println!("{}", "Nothing is running. Press Ctrl-C during a turn to pause it.".dimmed());
            }
            SlashCommand::Tasks => {
                println!();
                print!("{}", self.chat.progress_view().await);
                println!();
            }
            SlashCommand::Manifest => match manifest::read_lines(&self.chat.manifest().await, true, None, None) {
                Ok(text) => println!("{}", text),
                Err(e) => println!("{}", e.to_string().dimmed()),
            },
            SlashCommand::Field { field, value } => {
                self.chat.set_field(field, &value).await;
                println!("{}", format!("Set {} ({})", field.label(), field).dimmed());
            }
            SlashCommand::Key(key) => {
                let cleared = key.is_none();
                self.chat.set_api_key(key).await;
                if cleared {
                    println!("{}", "API key cleared; using the environment.".dimmed());
                } else {
                    println!("{}", "API key set for this session.".dimmed());
                }
            }
            SlashCommand::Reset => {
                self.chat.reset_manifest().await;
                println!("{}", "Manifest reset to the example connector.".dimmed());
            }
            SlashCommand::Continue => {
                let prompt = if self.autonomous { CONTINUE_PROMPT } else { "" };
                self.process_user_input(prompt).await;
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the REPL", "/quit".yellow());
        println!("  {:14} How to pause a running turn", "/pause".yellow());
        println!("  {:14} Show task progress", "/tasks".yellow());
        println!("  {:14} Show the manifest with line numbers", "/manifest".yellow());
        println!("  {:14} Set a form field", "/field N V".yellow());
        println!("  {:14} Use an API key for this session", "/key KEY".yellow());
        println!("  {:14} Load the example manifest", "/reset".yellow());
        println!("  {:14} Ask the agent to keep going", "/continue".yellow());
        println!();
        println!("{}", "Form fields:".bright_cyan());
        for field in FormField::ALL {
            println!("  {:24} {}", field.as_str().yellow(), field.label());
        }
        println!();
    }

    /// Run one turn, or an autonomous run, printing events as they arrive
    async fn process_user_input(&self, input: &str) {
        let (tx, rx) = mpsc::channel(256);
        let printer = tokio::spawn(print_events(rx));
        let interrupt = self.spawn_interrupt_listener();

        if self.autonomous {
            let run = self.chat.run_autonomous(input, Some(tx)).await;
            interrupt.abort();
            let _ = printer.await;
            print_outcome(&run.last);
            print_stop(run.stop, run.turns);
        } else {
            let outcome = self.chat.send_message(input, Some(tx)).await;
            interrupt.abort();
            let _ = printer.await;
            print_outcome(&outcome);
        }
    }

    /// Ctrl-C during a turn pauses it instead of killing the process
    fn spawn_interrupt_listener(&self) -> JoinHandle<()> {
        let chat = self.chat.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                chat.pause();
                eprintln!("\n{}", "[pausing...]".yellow());
            }
        })
    }
}

async fn print_events(mut rx: mpsc::Receiver<TurnEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            TurnEvent::StreamingText(text) => {
                print!("{}", text);
            }
            TurnEvent::ToolCallStarted { name, .. } => {
                print!("\n{} ", format!("[calling {}]", name).dimmed());
            }
            TurnEvent::ToolCallFinished { is_error, .. } => {
                if is_error {
                    println!("{}", "failed".red());
                } else {
                    println!("{}", "done".green());
                }
            }
            TurnEvent::FieldUpdated { field, value } => {
                println!("{}", format!("[{} = {}]", field.label(), value).dimmed());
            }
        }
        let _ = io::stdout().flush();
    }
}

fn print_outcome(outcome: &TurnOutcome) {
    println!();
    if let Some(error) = &outcome.error {
        debug!(%error, "print_outcome: turn failed");
        if let Some(reply) = &outcome.reply {
            println!("{}", reply.red());
        }
    }
    if outcome.paused {
        println!("{}", "[paused - /continue to resume]".yellow());
    }
    if !outcome.merged.is_empty() {
        println!("{}", format!("Updated: {}", outcome.merged.join(", ")).dimmed());
    }
    println!();
}

fn print_stop(stop: AutonomousStop, turns: u32) {
    let message = match stop {
        AutonomousStop::Completed => "Task completed".green(),
        AutonomousStop::Failed => "Task failed".red(),
        AutonomousStop::Paused => "Paused".yellow(),
        AutonomousStop::Error => "Stopped on error".red(),
        AutonomousStop::MaxTurns => "Turn limit reached".yellow(),
    };
    println!("{} {}", message, format!("after {} turn(s)", turns).dimmed());
    println!();
}

//! Interactive REPL for the connector builder
//!
//! Streams the agent's reply as it arrives, shows tool calls and form
//! updates inline, and offers slash commands for the session state.

mod session;

pub use session::{ReplSession, SlashCommand, SlashResult};

use std::sync::Arc;

use eyre::Result;

use crate::agent::DefaultAgentFactory;
use crate::chat::{ChatSession, DEMO_PROMPT};
use crate::config::Config;
use crate::prompts::PromptLoader;

/// Run the interactive REPL
///
/// This is the main entry point for `cb chat`.
pub async fn run_interactive(config: &Config, demo: bool, autonomous: bool) -> Result<()> {
    config.validate(None)?;

    let root = std::env::current_dir()?;
    let factory = Arc::new(DefaultAgentFactory::new(config.clone()));
    let chat = Arc::new(ChatSession::new(config.clone(), factory, PromptLoader::new(&root)));

    let initial = demo.then(|| DEMO_PROMPT.to_string());
    let mut session = ReplSession::new(chat.clone(), autonomous);
    let result = session.run(initial).await;
    chat.shutdown().await;
    result
}

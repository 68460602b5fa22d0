//! The tool-calling chat agent
//!
//! [`ChatAgent`] runs one turn: it streams LLM rounds, executes the requested
//! tools in order against the turn's [`ToolContext`](crate::tools::ToolContext)
//! and loops until the model stops asking for tools. [`AgentHandle`] caches a
//! started agent per credential.

use thiserror::Error;

use crate::backend::BackendError;
use crate::llm::LlmError;
use crate::session::FormField;
use crate::tools::ToolError;

mod chat_agent;
mod handle;

pub use chat_agent::{AgentRequest, AgentRunOutput, ChatAgent};
pub use handle::{AgentFactory, AgentHandle, DefaultAgentFactory};

/// Errors that end a turn
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Progress of a running turn, sent to whoever renders it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Newly streamed assistant text
    StreamingText(String),

    /// A tool call is about to run
    ToolCallStarted { id: String, name: String },

    /// A tool call returned
    ToolCallFinished { id: String, name: String, is_error: bool },

    /// A form field was set during the turn (merged into state when the turn ends)
    FieldUpdated { field: FormField, value: String },
}

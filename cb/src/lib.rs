//! Connector Builder - chat assistant for declarative connector manifests
//!
//! A user describes the API they want to pull data from; an LLM agent drafts
//! the connector manifest, tracks its work in a task list, fills in the
//! requirement form, and validates its drafts against an external tool
//! backend spoken to over MCP.
//!
//! # Core Concepts
//!
//! - **Snapshot and merge**: each turn works on a copy of the session state;
//!   whatever the agent changed is merged back when the turn ends, even if it
//!   was paused or failed
//! - **Line-addressed editing**: the agent edits the manifest by line number,
//!   never by rewriting the whole document
//! - **Cached agent**: the agent and its backend process live across turns
//!   until the credential changes or a turn fails
//!
//! # Modules
//!
//! - [`domain`] - Tasks, the task list, progress views and manifest editing
//! - [`session`] - Per-turn session state and the requirement form
//! - [`llm`] - LLM client trait and OpenAI implementation
//! - [`backend`] - MCP tool backend over a child process's stdio
//! - [`tools`] - Built-in and remote tools offered to the agent
//! - [`agent`] - Streaming tool loop and the cached agent handle
//! - [`chat`] - Turn orchestration and autonomous mode
//! - [`repl`] - Interactive terminal front end
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use agent::{AgentError, AgentFactory, AgentHandle, ChatAgent, DefaultAgentFactory, TurnEvent};
pub use backend::{BackendError, McpClient, RemoteCallResult, RemoteToolSpec, ToolBackend};
pub use chat::{AppState, AutonomousOutcome, AutonomousStop, ChatSession, TurnOutcome};
pub use config::{AgentConfig, BackendConfig, ChatConfig, Config, LlmConfig};
pub use domain::{ManifestEdit, ManifestError, ProgressView, Task, TaskCategory, TaskList, TaskStatus};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use prompts::{PromptContext, PromptLoader};
pub use session::{ConnectorFields, FormField, SessionDeps};
pub use tools::{Tool, ToolContext, ToolError, ToolExecutor, ToolResult};
